//! Device wire-protocol codecs
//!
//! Pure encoders and decoders shared by the device profiles: SysEx framing,
//! OLED bitmap packing, character displays, pad-grid note tables and colour
//! resolution.

pub mod bitmap;
pub mod color;
pub mod grid;
pub mod light;
pub mod sysex;
pub mod text;

pub use bitmap::{BitmapDisplay, BitmapFrame, TiledBitLayout};
pub use color::{ColorIndex, ColorRegistry, Palette, Rgb, SemanticColor};
pub use grid::{DeviceNote, GridLayout, GridTranslation, PadMatrix};
pub use light::LightInfo;
pub use sysex::{DeviceIdentity, SysexFormat, SysexMessage};
pub use text::{Charset, TextDisplay, TextLayout};
