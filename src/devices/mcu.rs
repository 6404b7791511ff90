//! Mackie Control (MCU, X-Touch in MCU mode)
//!
//! Eight channel strips with V-Pot rings, touch-sensitive motor faders on
//! pitch bend, single-colour button LEDs on notes and a 2x56 character LCD.

use super::DeviceProtocol;
use crate::control::{ControlId, ControlKind, ControlSpec, MidiAddress, Trigger};
use crate::error::CodecError;
use crate::midi::{convert, MidiMessage, RelativeEncoding};
use crate::protocol::text::{Charset, TextLayout};
use crate::protocol::{
    ColorIndex, ColorRegistry, LightInfo, Palette, SemanticColor, SysexFormat, SysexMessage,
};

/// Header following F0 for every MCU SysEx
pub const MCU_HEADER: [u8; 4] = [0x00, 0x00, 0x66, 0x14];
pub const LCD_MESSAGE: u8 = 0x12;

/// Device query the surface answers with a host connection query
pub const DEVICE_QUERY: [u8; 7] = [0xF0, 0x00, 0x00, 0x66, 0x14, 0x00, 0xF7];

pub const STRIPS: u8 = 8;
/// Fader index of the master fader
pub const MASTER_FADER: u8 = 8;

pub mod buttons {
    pub const REC_ARM_1: u8 = 0x00;
    pub const SOLO_1: u8 = 0x08;
    pub const MUTE_1: u8 = 0x10;
    pub const SELECT_1: u8 = 0x18;
    pub const VPOT_PUSH_1: u8 = 0x20;
    pub const ASSIGN_TRACK: u8 = 0x28;
    pub const ASSIGN_SEND: u8 = 0x29;
    pub const ASSIGN_PAN: u8 = 0x2A;
    pub const ASSIGN_PLUGIN: u8 = 0x2B;
    pub const ASSIGN_EQ: u8 = 0x2C;
    pub const ASSIGN_INSTRUMENT: u8 = 0x2D;
    pub const BANK_LEFT: u8 = 0x2E;
    pub const BANK_RIGHT: u8 = 0x2F;
    pub const CHANNEL_LEFT: u8 = 0x30;
    pub const CHANNEL_RIGHT: u8 = 0x31;
    pub const FLIP: u8 = 0x32;
    pub const GLOBAL: u8 = 0x33;
    pub const F1: u8 = 0x36;
    pub const SHIFT: u8 = 0x46;
    pub const REWIND: u8 = 0x5B;
    pub const FORWARD: u8 = 0x5C;
    pub const STOP: u8 = 0x5D;
    pub const PLAY: u8 = 0x5E;
    pub const RECORD: u8 = 0x5F;
}

const VPOT_CC: u8 = 0x10;
const RING_CC: u8 = 0x30;
/// Ring mode "wrap": LEDs fill from the left up to the position
const RING_MODE_WRAP: u8 = 0x20;
const RING_STEPS: f64 = 10.0;
const FADER_TOUCH_NOTE: u8 = 0x68;

const LED_OFF: u8 = 0x00;
const LED_BLINK: u8 = 0x01;
const LED_ON: u8 = 0x7F;

pub struct McuProtocol {
    format: SysexFormat,
}

impl McuProtocol {
    pub fn new() -> Self {
        Self {
            format: SysexFormat::new(&MCU_HEADER).with_max_payload(TextLayout::MACKIE.cell_width * 16),
        }
    }
}

impl Default for McuProtocol {
    fn default() -> Self {
        Self::new()
    }
}

fn has_led(button: u8) -> bool {
    !(buttons::VPOT_PUSH_1..buttons::VPOT_PUSH_1 + STRIPS).contains(&button)
}

impl DeviceProtocol for McuProtocol {
    fn name(&self) -> &'static str {
        "Mackie Control"
    }

    fn port_pattern(&self) -> &'static str {
        "X-Touch"
    }

    fn controls(&self) -> Vec<ControlSpec> {
        use buttons::*;

        let note = |note| MidiAddress::Note { channel: 0, note };
        let mut specs = Vec::new();

        for strip in 0..STRIPS {
            for first in [REC_ARM_1, SOLO_1, MUTE_1, SELECT_1, VPOT_PUSH_1] {
                let button = first + strip;
                specs.push(ControlSpec::button(button, note(button), Trigger::OnPress));
            }
            specs.push(ControlSpec::relative_knob(
                strip,
                MidiAddress::Cc { channel: 0, cc: VPOT_CC + strip },
                RelativeEncoding::SignMagnitude,
            ));
        }

        for (button, trigger) in [
            (ASSIGN_TRACK, Trigger::OnPress),
            (ASSIGN_SEND, Trigger::OnPress),
            (ASSIGN_PAN, Trigger::OnPress),
            (ASSIGN_PLUGIN, Trigger::OnPress),
            (ASSIGN_EQ, Trigger::OnPress),
            (ASSIGN_INSTRUMENT, Trigger::OnPress),
            (BANK_LEFT, Trigger::OnPress),
            (BANK_RIGHT, Trigger::OnPress),
            (CHANNEL_LEFT, Trigger::OnPress),
            (CHANNEL_RIGHT, Trigger::OnPress),
            (FLIP, Trigger::OnPress),
            (GLOBAL, Trigger::OnPress),
            (SHIFT, Trigger::Momentary),
            // Shuttle while held
            (REWIND, Trigger::Momentary),
            (FORWARD, Trigger::Momentary),
            (STOP, Trigger::OnPress),
            (PLAY, Trigger::OnPress),
            (RECORD, Trigger::OnPress),
        ] {
            specs.push(ControlSpec::button(button, note(button), trigger));
        }
        for button in F1..F1 + 8 {
            specs.push(ControlSpec::button(button, note(button), Trigger::LongPress));
        }

        for fader in 0..=MASTER_FADER {
            specs.push(
                ControlSpec::fader(fader, fader).with_touch(note(FADER_TOUCH_NOTE + fader)),
            );
        }

        specs
    }

    fn sysex_format(&self) -> &SysexFormat {
        &self.format
    }

    fn colors(&self) -> ColorRegistry {
        let mut colors = ColorRegistry::new(Palette::standard());
        for color in SemanticColor::ALL {
            let index = match color {
                SemanticColor::Off | SemanticColor::Dim => ColorIndex::OFF,
                _ => ColorIndex(1),
            };
            colors = colors.with_default(color, index);
        }
        colors
    }

    fn init_messages(&self) -> Result<Vec<Vec<u8>>, CodecError> {
        let mut messages = vec![DEVICE_QUERY.to_vec()];
        for spec in self.controls() {
            if let MidiAddress::Note { channel, note } = spec.address {
                if has_led(note) {
                    messages.push(MidiMessage::NoteOn { channel, note, velocity: LED_OFF }.encode());
                }
            }
        }
        Ok(messages)
    }

    fn text_display(&self) -> Option<(TextLayout, Charset)> {
        Some((TextLayout::MACKIE, Charset::mackie()))
    }

    fn encode_light(
        &self,
        id: ControlId,
        light: &LightInfo,
        _colors: &ColorRegistry,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        if id.kind != ControlKind::Button || !has_led(id.index) {
            return Ok(None);
        }
        let lit = light.color != ColorIndex::OFF;
        let velocity = match light.blink {
            Some(other) if (other != ColorIndex::OFF) != lit => LED_BLINK,
            _ if lit => LED_ON,
            _ => LED_OFF,
        };
        let msg = MidiMessage::NoteOn { channel: 0, note: id.index, velocity };
        Ok(Some(msg.encode()))
    }

    fn value_to_wire(&self, id: ControlId, value: f64) -> Option<u16> {
        let value = value.clamp(0.0, 1.0);
        match id.kind {
            ControlKind::Knob if id.index < STRIPS => {
                let position = 1 + (value * RING_STEPS).round() as u8;
                Some((RING_MODE_WRAP | position) as u16)
            }
            ControlKind::Fader if id.index <= MASTER_FADER => Some(convert::from_unit(value)),
            _ => None,
        }
    }

    fn encode_value(&self, id: ControlId, wire: u16) -> Option<Vec<u8>> {
        let msg = match id.kind {
            ControlKind::Knob if id.index < STRIPS => MidiMessage::ControlChange {
                channel: 0,
                cc: RING_CC + id.index,
                value: (wire & 0x7F) as u8,
            },
            ControlKind::Fader if id.index <= MASTER_FADER => MidiMessage::PitchBend {
                channel: id.index,
                value: wire,
            },
            _ => return None,
        };
        Some(msg.encode())
    }

    fn encode_text(
        &self,
        layout: TextLayout,
        line: usize,
        cell: usize,
        chars: &[u8],
    ) -> Result<Option<Vec<u8>>, CodecError> {
        let offset = layout.offset(line, cell) as u8;
        let msg = SysexMessage::new(LCD_MESSAGE, offset, chars.to_vec());
        self.format.serialize(&msg).map(Some)
    }

    fn describe_sysex(&self, data: &[u8]) -> Option<String> {
        let Some(msg) = self.format.parse(data) else {
            return crate::protocol::sysex::parse_identity_reply(data)
                .map(|id| format!("Identity reply: model {:04X}", id.model));
        };
        let what = match msg.msg_type {
            0x01 => "Host connection query",
            0x03 => "Host connection confirmation",
            0x04 => "Host connection error",
            0x14 => "Firmware version reply",
            _ => "MCU sysex",
        };
        Some(format!("{} ({:02X})", what, msg.msg_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ControlRegistry, InputEvent};

    #[test]
    fn test_lcd_cell_message() {
        let mcu = McuProtocol::new();
        let (layout, charset) = mcu.text_display().unwrap();
        let chars = charset.encode_cell("Volume", layout.cell_width);

        let first = mcu.encode_text(layout, 0, 0, &chars).unwrap().unwrap();
        assert_eq!(
            first,
            vec![0xF0, 0x00, 0x00, 0x66, 0x14, 0x12, 0x00, b'V', b'o', b'l', b'u', b'm', b'e', b' ', 0xF7]
        );
        let lower = mcu.encode_text(layout, 1, 2, &chars).unwrap().unwrap();
        assert_eq!(lower[6], 0x38 + 14);
    }

    #[test]
    fn test_led_velocities() {
        let mcu = McuProtocol::new();
        let colors = mcu.colors();
        let play = ControlId::button(buttons::PLAY);
        let on = colors.resolve(SemanticColor::Play, play);

        let encode = |light: LightInfo| mcu.encode_light(play, &light, &colors).unwrap().unwrap();
        assert_eq!(encode(LightInfo::solid(on)), vec![0x90, 0x5E, 0x7F]);
        assert_eq!(encode(LightInfo::OFF), vec![0x90, 0x5E, 0x00]);
        assert_eq!(encode(LightInfo::blinking(on, ColorIndex::OFF, false)), vec![0x90, 0x5E, 0x01]);
        // Dim has no LED level of its own on a single-colour button
        let dim = colors.resolve(SemanticColor::Dim, play);
        assert_eq!(encode(LightInfo::solid(dim)), vec![0x90, 0x5E, 0x00]);

        let push = ControlId::button(buttons::VPOT_PUSH_1 + 3);
        assert_eq!(mcu.encode_light(push, &LightInfo::solid(on), &colors).unwrap(), None);
    }

    #[test]
    fn test_rings_and_faders() {
        let mcu = McuProtocol::new();

        let ring = mcu.value_to_wire(ControlId::knob(2), 0.5).unwrap();
        assert_eq!(ring, 0x26);
        assert_eq!(mcu.encode_value(ControlId::knob(2), ring), Some(vec![0xB0, 0x32, 0x26]));
        assert_eq!(mcu.value_to_wire(ControlId::knob(0), 0.0), Some(0x21));
        assert_eq!(mcu.value_to_wire(ControlId::knob(0), 1.0), Some(0x2B));

        let fader = mcu.value_to_wire(ControlId::fader(MASTER_FADER), 1.0).unwrap();
        assert_eq!(fader, convert::MAX_14BIT);
        assert_eq!(
            mcu.encode_value(ControlId::fader(MASTER_FADER), fader),
            Some(vec![0xE8, 0x7F, 0x7F])
        );
        assert_eq!(mcu.value_to_wire(ControlId::fader(9), 0.5), None);
        assert_eq!(mcu.value_to_wire(ControlId::button(0), 0.5), None);
    }

    #[test]
    fn test_vpot_and_touch_decoding() {
        let mcu = McuProtocol::new();
        let registry = ControlRegistry::new(&mcu.controls(), 3000);

        let left = MidiMessage::ControlChange { channel: 0, cc: 0x13, value: 0x42 };
        assert_eq!(registry.decode(&left), Some(InputEvent::KnobDelta(ControlId::knob(3), -2)));

        let touch = MidiMessage::NoteOn { channel: 0, note: 0x68, velocity: 127 };
        assert_eq!(registry.decode(&touch), Some(InputEvent::Touch(ControlId::fader(0), true)));
    }

    #[test]
    fn test_init_starts_with_device_query() {
        let messages = McuProtocol::new().init_messages().unwrap();
        assert_eq!(messages[0], DEVICE_QUERY.to_vec());
        assert!(messages[1..].iter().all(|m| m[0] == 0x90 && m[2] == 0));
    }

    #[test]
    fn test_describe_connection_query() {
        let mcu = McuProtocol::new();
        let query = [0xF0, 0x00, 0x00, 0x66, 0x14, 0x01, 0x10, 0x11, 0xF7];
        assert_eq!(mcu.describe_sysex(&query).as_deref(), Some("Host connection query (01)"));
        assert_eq!(mcu.describe_sysex(&[0xF0, 0x01, 0xF7]), None);
    }
}
