//! Novation Launchpad (Pro MK3) in programmer mode
//!
//! 8x8 RGB pads on notes `(row + 1) * 10 + column + 1`, a top row and a right
//! column of CC buttons. Every LED, pad or button, is set through the same
//! lighting SysEx, which supports palette, flashing, pulsing and RGB records.

use super::DeviceProtocol;
use crate::control::pads::PadBatch;
use crate::control::{ControlId, ControlKind, ControlSpec, MidiAddress, Trigger};
use crate::error::CodecError;
use crate::protocol::{
    ColorIndex, ColorRegistry, DeviceNote, GridLayout, LightInfo, PadMatrix, Palette,
    SemanticColor, SysexFormat, SysexMessage,
};

pub const NOVATION_HEADER: [u8; 4] = [0x00, 0x20, 0x29, 0x02];
pub const PRODUCT_ID: u8 = 0x0E;
pub const SUB_LIGHTING: u8 = 0x03;
pub const SUB_LAYOUT_MODE: u8 = 0x0E;
const PROGRAMMER_MODE: u8 = 0x01;

const SPEC_STATIC: u8 = 0;
const SPEC_FLASHING: u8 = 1;
const SPEC_PULSING: u8 = 2;
const SPEC_RGB: u8 = 3;

/// Nearest entry of the device's built-in palette for each entry of
/// [`Palette::standard`]; the lighting SysEx indexes the built-in one
const NATIVE_PALETTE: [u8; 15] = [
    0,  // off
    3,  // white
    1,  // dim white
    5,  // red
    7,  // dim red
    9,  // orange
    96, // amber
    13, // yellow
    21, // green
    23, // dim green
    37, // cyan
    45, // blue
    47, // dim blue
    49, // purple
    57, // pink
];

/// Built-in palette index for a registry colour, None when it must go out as RGB
pub fn native_color(color: ColorIndex) -> Option<u8> {
    NATIVE_PALETTE.get(color.0 as usize).copied()
}

/// Pad layout used by drum views
pub const DRUM_LAYOUT: GridLayout = GridLayout::Quadrants;

pub mod buttons {
    pub const UP: u8 = 91;
    pub const DOWN: u8 = 92;
    pub const LEFT: u8 = 93;
    pub const RIGHT: u8 = 94;
    pub const SESSION: u8 = 95;
    pub const NOTE: u8 = 96;
    pub const CHORD: u8 = 97;
    pub const CUSTOM: u8 = 98;
    pub const SHIFT: u8 = 90;
    /// Scene launch buttons, bottom (19) to top (89)
    pub const SCENE_1: u8 = 19;
}

pub struct LaunchpadProtocol {
    format: SysexFormat,
}

impl LaunchpadProtocol {
    pub fn new() -> Self {
        Self {
            format: SysexFormat::new(&NOVATION_HEADER),
        }
    }

    fn scene_buttons() -> impl Iterator<Item = u8> {
        (0..8).map(|i| buttons::SCENE_1 + i * 10)
    }

    /// One lighting record for LED `index`
    fn light_spec(index: u8, light: &LightInfo, colors: &ColorRegistry) -> Vec<u8> {
        match (light.blink, native_color(light.color)) {
            (Some(other), Some(color)) if light.fast => {
                vec![SPEC_FLASHING, index, native_color(other).unwrap_or(0), color]
            }
            (Some(_), Some(color)) => vec![SPEC_PULSING, index, color],
            (None, Some(color)) => vec![SPEC_STATIC, index, color],
            // Cube colours have no built-in entry; they cannot blink in hardware
            (_, None) => {
                let [r, g, b] = colors.rgb(light.color).to_7bit();
                vec![SPEC_RGB, index, r, g, b]
            }
        }
    }

    fn lighting(&self, specs: Vec<u8>) -> Result<Vec<u8>, CodecError> {
        self.format
            .serialize(&SysexMessage::new(PRODUCT_ID, SUB_LIGHTING, specs))
    }
}

impl Default for LaunchpadProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProtocol for LaunchpadProtocol {
    fn name(&self) -> &'static str {
        "Launchpad Pro MK3"
    }

    fn port_pattern(&self) -> &'static str {
        "LPProMK3 MIDI"
    }

    fn controls(&self) -> Vec<ControlSpec> {
        use buttons::*;

        let cc = |cc| MidiAddress::Cc { channel: 0, cc };
        let mut specs = Vec::new();
        for (button, trigger) in [
            (UP, Trigger::OnPress),
            (DOWN, Trigger::OnPress),
            (LEFT, Trigger::OnPress),
            (RIGHT, Trigger::OnPress),
            (SESSION, Trigger::OnPress),
            (NOTE, Trigger::OnPress),
            (CHORD, Trigger::OnPress),
            (CUSTOM, Trigger::LongPress),
            (SHIFT, Trigger::Momentary),
        ] {
            specs.push(ControlSpec::button(button, cc(button), trigger));
        }
        for button in Self::scene_buttons() {
            specs.push(ControlSpec::button(button, cc(button), Trigger::OnPress));
        }
        specs
    }

    fn sysex_format(&self) -> &SysexFormat {
        &self.format
    }

    fn colors(&self) -> ColorRegistry {
        ColorRegistry::new(Palette::standard())
            .with_default(SemanticColor::Off, ColorIndex(0))
            .with_default(SemanticColor::On, ColorIndex(1))
            .with_default(SemanticColor::Dim, ColorIndex(2))
            .with_default(SemanticColor::Highlighted, ColorIndex(7))
            .with_default(SemanticColor::Selected, ColorIndex(10))
            .with_default(SemanticColor::Play, ColorIndex(8))
            .with_default(SemanticColor::Record, ColorIndex(3))
            .with_default(SemanticColor::Mute, ColorIndex(6))
            .with_default(SemanticColor::Solo, ColorIndex(11))
            .with_default(SemanticColor::Arm, ColorIndex(4))
            .with_default(SemanticColor::Warning, ColorIndex(5))
            .with_kind(ControlKind::Button, SemanticColor::Dim, ColorIndex(12))
    }

    fn init_messages(&self) -> Result<Vec<Vec<u8>>, CodecError> {
        let mode = SysexMessage::new(PRODUCT_ID, SUB_LAYOUT_MODE, vec![PROGRAMMER_MODE]);
        Ok(vec![self.format.serialize(&mode)?])
    }

    fn pad_matrix(&self) -> Option<PadMatrix> {
        Some(PadMatrix::SQUARE_8X8)
    }

    fn pad_note(&self, row: usize, column: usize) -> Option<DeviceNote> {
        if row >= 8 || column >= 8 {
            return None;
        }
        Some(DeviceNote::new(0, ((row + 1) * 10 + column + 1) as u8))
    }

    fn encode_light(
        &self,
        id: ControlId,
        light: &LightInfo,
        colors: &ColorRegistry,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        if id.kind != ControlKind::Button {
            return Ok(None);
        }
        self.lighting(Self::light_spec(id.index, light, colors)).map(Some)
    }

    fn encode_pads(
        &self,
        batch: &PadBatch,
        colors: &ColorRegistry,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        let specs: Vec<u8> = batch
            .iter()
            .filter(|(pad, _)| pad.channel == 0)
            .flat_map(|(pad, light)| Self::light_spec(pad.note, light, colors))
            .collect();
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![self.lighting(specs)?])
    }
}
