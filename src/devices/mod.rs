//! Device profiles
//!
//! A [`DeviceProtocol`] describes one controller family: its controls, its
//! SysEx framing and how lights, values, text, bitmaps and pad colours are
//! put on the wire. Profiles are stateless; caching and change detection live
//! in the surface.

pub mod fire;
pub mod launchpad;
pub mod mcu;

use crate::control::pads::PadBatch;
use crate::control::{ControlId, ControlSpec};
use crate::error::CodecError;
use crate::protocol::sysex::parse_identity_reply;
use crate::protocol::{
    Charset, ColorRegistry, DeviceNote, GridLayout, GridTranslation, LightInfo, PadMatrix,
    SysexFormat, TextLayout, TiledBitLayout,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub trait DeviceProtocol: Send + Sync {
    /// Human-readable device family
    fn name(&self) -> &'static str;

    /// Case-insensitive substring used to find the MIDI ports
    fn port_pattern(&self) -> &'static str;

    fn controls(&self) -> Vec<ControlSpec>;

    fn sysex_format(&self) -> &SysexFormat;

    /// Semantic colour mapping for this device's LEDs
    fn colors(&self) -> ColorRegistry;

    /// Messages sent once after connecting
    fn init_messages(&self) -> Result<Vec<Vec<u8>>, CodecError> {
        Ok(Vec::new())
    }

    /// Whether LEDs blink by themselves; otherwise the surface alternates colours
    fn hardware_blink(&self) -> bool {
        true
    }

    fn pad_matrix(&self) -> Option<PadMatrix> {
        None
    }

    /// Device note of the pad at `row` (from the bottom), `column`
    fn pad_note(&self, _row: usize, _column: usize) -> Option<DeviceNote> {
        None
    }

    fn text_display(&self) -> Option<(TextLayout, Charset)> {
        None
    }

    fn bitmap_layout(&self) -> Option<TiledBitLayout> {
        None
    }

    /// None when the control has no LED
    fn encode_light(
        &self,
        id: ControlId,
        light: &LightInfo,
        colors: &ColorRegistry,
    ) -> Result<Option<Vec<u8>>, CodecError>;

    /// Wire value for a ring or motor fader; None when the control has no feedback
    fn value_to_wire(&self, _id: ControlId, _value: f64) -> Option<u16> {
        None
    }

    fn encode_value(&self, _id: ControlId, _wire: u16) -> Option<Vec<u8>> {
        None
    }

    /// One text cell, already converted to the device charset
    fn encode_text(
        &self,
        _layout: TextLayout,
        _line: usize,
        _cell: usize,
        _chars: &[u8],
    ) -> Result<Option<Vec<u8>>, CodecError> {
        Ok(None)
    }

    fn encode_bitmap(&self, _packed: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
        Ok(None)
    }

    /// Messages carrying a batch of pad colours
    fn encode_pads(
        &self,
        _batch: &PadBatch,
        _colors: &ColorRegistry,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        Ok(Vec::new())
    }

    /// Short description of a recognised SysEx message
    fn describe_sysex(&self, data: &[u8]) -> Option<String> {
        parse_identity_reply(data).map(|id| {
            format!(
                "Identity reply: family {:04X} model {:04X} version {:?}",
                id.family, id.model, id.version
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// Akai Fire
    Fire,
    /// Mackie Control protocol (MCU, X-Touch in MCU mode)
    #[default]
    Mcu,
    /// Novation Launchpad in programmer mode
    Launchpad,
}

impl DeviceKind {
    pub fn protocol(self) -> Arc<dyn DeviceProtocol> {
        match self {
            DeviceKind::Fire => Arc::new(fire::FireProtocol::new()),
            DeviceKind::Mcu => Arc::new(mcu::McuProtocol::new()),
            DeviceKind::Launchpad => Arc::new(launchpad::LaunchpadProtocol::new()),
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Fire => "fire",
            DeviceKind::Mcu => "mcu",
            DeviceKind::Launchpad => "launchpad",
        };
        f.write_str(name)
    }
}

/// Per-surface immutable context
///
/// Built once when the surface starts and shared by reference; nothing in it
/// changes afterwards.
pub struct SurfaceContext {
    pub protocol: Arc<dyn DeviceProtocol>,
    pub colors: ColorRegistry,
    grids: HashMap<GridLayout, GridTranslation>,
}

impl SurfaceContext {
    pub fn new(protocol: Arc<dyn DeviceProtocol>) -> Result<Arc<Self>, CodecError> {
        let colors = protocol.colors();
        Self::with_colors(protocol, colors)
    }

    pub fn with_colors(
        protocol: Arc<dyn DeviceProtocol>,
        colors: ColorRegistry,
    ) -> Result<Arc<Self>, CodecError> {
        let mut grids = HashMap::new();
        if let Some(matrix) = protocol.pad_matrix() {
            for layout in [GridLayout::Linear, GridLayout::InterleavedHalves, GridLayout::Quadrants] {
                let mut pairs = Vec::new();
                for index in 0..crate::protocol::grid::GRID_SIZE {
                    let (row, column) = layout.position(matrix, index);
                    if let Some(note) = protocol.pad_note(row, column) {
                        pairs.push((crate::protocol::grid::GRID_BASE + index as u8, note));
                    }
                }
                grids.insert(layout, GridTranslation::from_pairs(&pairs)?);
            }
        }
        Ok(Arc::new(Self {
            protocol,
            colors,
            grids,
        }))
    }

    pub fn grid(&self, layout: GridLayout) -> Option<&GridTranslation> {
        self.grids.get(&layout)
    }
}
