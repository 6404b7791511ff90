//! Akai Fire
//!
//! 4x16 RGB pad matrix addressed through SysEx, four touch-sensitive relative
//! knobs plus the select encoder, single-colour button LEDs driven by CC and a
//! 128x64 monochrome OLED. The Fire has no hardware blink.

use super::DeviceProtocol;
use crate::control::pads::PadBatch;
use crate::control::{ControlId, ControlKind, ControlSpec, MidiAddress, Trigger};
use crate::error::CodecError;
use crate::midi::{MidiMessage, RelativeEncoding};
use crate::protocol::bitmap::TiledBitLayout;
use crate::protocol::{
    ColorIndex, ColorRegistry, DeviceNote, LightInfo, PadMatrix, Palette, SemanticColor,
    SysexFormat, SysexMessage,
};

/// Product byte following the Akai header
pub const PRODUCT_ID: u8 = 0x43;
pub const SUB_PAD_COLORS: u8 = 0x65;
pub const SUB_OLED: u8 = 0x0E;

/// Note of the top-left pad; pads run left to right, top to bottom
pub const FIRST_PAD_NOTE: u8 = 54;
pub const PAD_COUNT: u8 = 64;

/// OLED write header: first band, last band, first column, last column
const OLED_WINDOW: [u8; 4] = [0x00, 0x07, 0x00, 0x7F];

pub mod buttons {
    pub const MODE: u8 = 0x1A;
    pub const PATTERN_UP: u8 = 0x1F;
    pub const PATTERN_DOWN: u8 = 0x20;
    pub const BROWSER: u8 = 0x21;
    pub const GRID_LEFT: u8 = 0x22;
    pub const GRID_RIGHT: u8 = 0x23;
    /// Track mute/solo buttons, one per pad row
    pub const MUTE_1: u8 = 0x24;
    pub const STEP: u8 = 0x2C;
    pub const NOTE: u8 = 0x2D;
    pub const DRUM: u8 = 0x2E;
    pub const PERFORM: u8 = 0x2F;
    pub const SHIFT: u8 = 0x30;
    pub const ALT: u8 = 0x31;
    pub const PATTERN_SONG: u8 = 0x32;
    pub const PLAY: u8 = 0x33;
    pub const STOP: u8 = 0x34;
    pub const RECORD: u8 = 0x35;
    pub const SELECT_PUSH: u8 = 0x19;
}

/// Touch-sensitive parameter knobs, indices 0..4
pub const PARAMETER_KNOBS: u8 = 4;
/// Knob index of the select encoder
pub const SELECT_KNOB: u8 = PARAMETER_KNOBS;
const SELECT_KNOB_CC: u8 = 0x76;
const KNOB_CC: u8 = 0x10;
const KNOB_TOUCH_NOTE: u8 = 0x10;

/// Button LED levels
const LED_OFF: u8 = 0;
const LED_DULL: u8 = 1;
const LED_BRIGHT: u8 = 3;

pub struct FireProtocol {
    format: SysexFormat,
}

impl FireProtocol {
    pub fn new() -> Self {
        Self {
            format: SysexFormat::new(&[0x47, 0x7F]).with_length_prefix(),
        }
    }

    fn pad_index(note: DeviceNote) -> Option<u8> {
        note.note
            .checked_sub(FIRST_PAD_NOTE)
            .filter(|i| *i < PAD_COUNT && note.channel == 0)
    }
}

impl Default for FireProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceProtocol for FireProtocol {
    fn name(&self) -> &'static str {
        "Akai Fire"
    }

    fn port_pattern(&self) -> &'static str {
        "FL STUDIO FIRE"
    }

    fn controls(&self) -> Vec<ControlSpec> {
        use buttons::*;

        let note = |note| MidiAddress::Note { channel: 0, note };
        let mut specs = Vec::new();

        for (button, trigger) in [
            (MODE, Trigger::OnPress),
            (PATTERN_UP, Trigger::OnPress),
            (PATTERN_DOWN, Trigger::OnPress),
            (BROWSER, Trigger::LongPress),
            (GRID_LEFT, Trigger::OnPress),
            (GRID_RIGHT, Trigger::OnPress),
            (STEP, Trigger::OnPress),
            (NOTE, Trigger::OnPress),
            (DRUM, Trigger::OnPress),
            (PERFORM, Trigger::OnPress),
            (SHIFT, Trigger::Momentary),
            (ALT, Trigger::Momentary),
            (PATTERN_SONG, Trigger::LongPress),
            (PLAY, Trigger::OnPress),
            (STOP, Trigger::OnPress),
            (RECORD, Trigger::OnPress),
            (SELECT_PUSH, Trigger::Momentary),
        ] {
            specs.push(ControlSpec::button(button, note(button), trigger));
        }
        // Row mutes act on release so a held mute can combine with a pad
        for button in MUTE_1..MUTE_1 + 4 {
            specs.push(ControlSpec::button(button, note(button), Trigger::OnRelease));
        }

        for i in 0..PARAMETER_KNOBS {
            specs.push(
                ControlSpec::relative_knob(
                    i,
                    MidiAddress::Cc { channel: 0, cc: KNOB_CC + i },
                    RelativeEncoding::TwosComplement,
                )
                .with_touch(note(KNOB_TOUCH_NOTE + i)),
            );
        }
        specs.push(ControlSpec::relative_knob(
            SELECT_KNOB,
            MidiAddress::Cc { channel: 0, cc: SELECT_KNOB_CC },
            RelativeEncoding::TwosComplement,
        ));

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
            .with_default(SemanticColor::Solo, ColorIndex(7))
            .with_default(SemanticColor::Arm, ColorIndex(4))
            .with_default(SemanticColor::Warning, ColorIndex(5))
    }

    fn init_messages(&self) -> Result<Vec<Vec<u8>>, CodecError> {
        let batch: PadBatch = (0..PAD_COUNT)
            .map(|i| (DeviceNote::new(0, FIRST_PAD_NOTE + i), LightInfo::OFF))
            .collect();
        self.encode_pads(&batch, &ColorRegistry::default())
    }

    fn hardware_blink(&self) -> bool {
        false
    }

    fn pad_matrix(&self) -> Option<PadMatrix> {
        Some(PadMatrix::WIDE_4X16)
    }

    fn pad_note(&self, row: usize, column: usize) -> Option<DeviceNote> {
        if row >= 4 || column >= 16 {
            return None;
        }
        Some(DeviceNote::new(
            0,
            FIRST_PAD_NOTE + ((3 - row) * 16 + column) as u8,
        ))
    }

    fn bitmap_layout(&self) -> Option<TiledBitLayout> {
        Some(TiledBitLayout::fire())
    }

    fn encode_light(
        &self,
        id: ControlId,
        light: &LightInfo,
        colors: &ColorRegistry,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        if id.kind != ControlKind::Button || id.index == buttons::SELECT_PUSH {
            return Ok(None);
        }
        let level = if light.color == ColorIndex::OFF {
            LED_OFF
        } else {
            let rgb = colors.rgb(light.color);
            if rgb.r.max(rgb.g).max(rgb.b) >= 128 {
                LED_BRIGHT
            } else {
                LED_DULL
            }
        };
        let msg = MidiMessage::ControlChange { channel: 0, cc: id.index, value: level };
        Ok(Some(msg.encode()))
    }

    fn encode_bitmap(&self, packed: &[u8]) -> Result<Option<Vec<u8>>, CodecError> {
        let mut payload = Vec::with_capacity(OLED_WINDOW.len() + packed.len());
        payload.extend_from_slice(&OLED_WINDOW);
        payload.extend_from_slice(packed);
        let msg = SysexMessage::new(PRODUCT_ID, SUB_OLED, payload);
        self.format.serialize(&msg).map(Some)
    }

    fn encode_pads(
        &self,
        batch: &PadBatch,
        colors: &ColorRegistry,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        let mut payload = Vec::with_capacity(batch.len() * 4);
        for (pad, light) in batch {
            let Some(index) = Self::pad_index(*pad) else {
                continue;
            };
            let [r, g, b] = colors.rgb(light.color).to_7bit();
            payload.extend_from_slice(&[index, r, g, b]);
        }
        if payload.is_empty() {
            return Ok(Vec::new());
        }
        let msg = SysexMessage::new(PRODUCT_ID, SUB_PAD_COLORS, payload);
        Ok(vec![self.format.serialize(&msg)?])
    }

    fn describe_sysex(&self, data: &[u8]) -> Option<String> {
        if let Some(msg) = self.format.parse(data) {
            return Some(format!(
                "Fire sysex {:02X}/{:02X} ({} bytes)",
                msg.msg_type,
                msg.sub_type,
                msg.payload.len()
            ));
        }
        crate::protocol::sysex::parse_identity_reply(data)
            .map(|id| format!("Identity reply: model {:04X}", id.model))
    }
}
