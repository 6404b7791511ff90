//! Colour resolution
//!
//! Bindings speak in semantic colours. The registry turns a semantic colour
//! and the control it is shown on into a device palette index; the palette
//! turns an index into RGB for devices with full-colour LEDs. Host colours
//! (track colours) are quantized into the reserved cube at indices 64..128.

use crate::control::{ControlId, ControlKind};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::trace;

/// Device palette index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct ColorIndex(pub u8);

impl ColorIndex {
    pub const OFF: ColorIndex = ColorIndex(0);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    /// Channels halved to fit SysEx data bytes
    pub fn to_7bit(self) -> [u8; 3] {
        [self.r >> 1, self.g >> 1, self.b >> 1]
    }

    pub fn scale(self, factor: f32) -> Self {
        let f = |c: u8| (c as f32 * factor.clamp(0.0, 1.0)).round() as u8;
        Rgb::new(f(self.r), f(self.g), f(self.b))
    }
}

/// What a light means, independent of how a device draws it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticColor {
    Off,
    On,
    Dim,
    Highlighted,
    Selected,
    Play,
    Record,
    Mute,
    Solo,
    Arm,
    Warning,
}

impl SemanticColor {
    pub const ALL: [SemanticColor; 11] = [
        SemanticColor::Off,
        SemanticColor::On,
        SemanticColor::Dim,
        SemanticColor::Highlighted,
        SemanticColor::Selected,
        SemanticColor::Play,
        SemanticColor::Record,
        SemanticColor::Mute,
        SemanticColor::Solo,
        SemanticColor::Arm,
        SemanticColor::Warning,
    ];
}

/// First index of the quantized RGB cube
pub const RGB_CUBE_BASE: u8 = 64;
const CUBE_LEVELS: [u8; 4] = [0, 85, 170, 255];

/// Palette index -> RGB
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [Rgb; 128],
}

impl Palette {
    /// Fixed colours at 0.., black up to 64, then the 4x4x4 cube
    pub fn new(fixed: &[Rgb]) -> Self {
        let mut entries = [Rgb::BLACK; 128];
        for (slot, rgb) in entries.iter_mut().zip(fixed.iter().take(RGB_CUBE_BASE as usize)) {
            *slot = *rgb;
        }
        for index in RGB_CUBE_BASE..128 {
            let i = (index - RGB_CUBE_BASE) as usize;
            entries[index as usize] = Rgb::new(
                CUBE_LEVELS[i / 16],
                CUBE_LEVELS[(i / 4) % 4],
                CUBE_LEVELS[i % 4],
            );
        }
        Self { entries }
    }

    /// General-purpose palette shared by the RGB devices
    pub fn standard() -> Self {
        Self::new(&[
            Rgb::BLACK,
            Rgb::new(255, 255, 255), // 1 white
            Rgb::new(48, 48, 48),    // 2 dim white
            Rgb::new(255, 0, 0),     // 3 red
            Rgb::new(64, 0, 0),      // 4 dim red
            Rgb::new(255, 96, 0),    // 5 orange
            Rgb::new(255, 200, 0),   // 6 amber
            Rgb::new(255, 255, 0),   // 7 yellow
            Rgb::new(0, 255, 0),     // 8 green
            Rgb::new(0, 64, 0),      // 9 dim green
            Rgb::new(0, 255, 255),   // 10 cyan
            Rgb::new(0, 96, 255),    // 11 blue
            Rgb::new(0, 0, 64),      // 12 dim blue
            Rgb::new(160, 0, 255),   // 13 purple
            Rgb::new(255, 0, 160),   // 14 pink
        ])
    }

    pub fn rgb(&self, index: ColorIndex) -> Rgb {
        self.entries[(index.0 & 0x7F) as usize]
    }

    /// Nearest cube entry for an arbitrary host colour
    pub fn quantize(rgb: Rgb) -> ColorIndex {
        let level = |c: u8| c / 64;
        ColorIndex(RGB_CUBE_BASE + level(rgb.r) * 16 + level(rgb.g) * 4 + level(rgb.b))
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::standard()
    }
}

/// Semantic colour + control -> palette index
///
/// Immutable once built; resolution is a pure function of its inputs.
#[derive(Debug, Clone, Default)]
pub struct ColorRegistry {
    defaults: HashMap<SemanticColor, ColorIndex>,
    per_kind: HashMap<(ControlKind, SemanticColor), ColorIndex>,
    per_control: HashMap<(ControlId, SemanticColor), ColorIndex>,
    palette: Palette,
}

impl ColorRegistry {
    pub fn new(palette: Palette) -> Self {
        Self {
            palette,
            ..Self::default()
        }
    }

    pub fn with_default(mut self, color: SemanticColor, index: ColorIndex) -> Self {
        self.defaults.insert(color, index);
        self
    }

    pub fn with_kind(mut self, kind: ControlKind, color: SemanticColor, index: ColorIndex) -> Self {
        self.per_kind.insert((kind, color), index);
        self
    }

    pub fn with_control(mut self, control: ControlId, color: SemanticColor, index: ColorIndex) -> Self {
        self.per_control.insert((control, color), index);
        self
    }

    /// Most specific mapping wins: control, then kind, then default
    pub fn resolve(&self, color: SemanticColor, control: ControlId) -> ColorIndex {
        if let Some(index) = self.per_control.get(&(control, color)) {
            return *index;
        }
        if let Some(index) = self.per_kind.get(&(control.kind, color)) {
            return *index;
        }
        match self.defaults.get(&color) {
            Some(index) => *index,
            None => {
                trace!("No colour registered for {:?}, using off", color);
                ColorIndex::OFF
            }
        }
    }

    pub fn rgb(&self, index: ColorIndex) -> Rgb {
        self.palette.rgb(index)
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Registered semantic colours
    pub fn semantic_colors(&self) -> impl Iterator<Item = SemanticColor> + '_ {
        self.defaults.keys().copied()
    }
}
