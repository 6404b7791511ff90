//! MIDI wire messages and value conversions
//!
//! Channel messages, SysEx and relative-encoder decoding for control
//! surfaces. Channels are 0-based on the wire and in these types.

use std::fmt;

/// MIDI message as seen on a control-surface port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MidiMessage {
    /// Note Off: channel (0-15), note (0-127), velocity (0-127)
    NoteOff { channel: u8, note: u8, velocity: u8 },

    /// Note On with a non-zero velocity
    NoteOn { channel: u8, note: u8, velocity: u8 },

    /// Polyphonic aftertouch, sent by pressure-sensitive pads
    PolyPressure { channel: u8, note: u8, pressure: u8 },

    /// Control Change: channel (0-15), cc (0-127), value (0-127)
    ControlChange { channel: u8, cc: u8, value: u8 },

    /// Channel Pressure: channel (0-15), pressure (0-127)
    ChannelPressure { channel: u8, pressure: u8 },

    /// Pitch Bend: channel (0-15), value (0-16383, 14-bit)
    PitchBend { channel: u8, value: u16 },

    /// Complete SysEx frame, including the F0 and F7 bytes
    SysEx { data: Vec<u8> },

    /// Any other system message (clock, active sensing, ...)
    System { status: u8 },
}

impl MidiMessage {
    /// Parse one complete message. Running status is not supported.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let status = *data.first()?;
        if status < 0x80 {
            return None;
        }

        let channel = status & 0x0F;
        let d1 = data.get(1).map(|b| b & 0x7F);
        let d2 = data.get(2).map(|b| b & 0x7F);

        match status & 0xF0 {
            0x80 => Some(MidiMessage::NoteOff { channel, note: d1?, velocity: d2? }),
            0x90 => {
                let (note, velocity) = (d1?, d2?);
                if velocity == 0 {
                    Some(MidiMessage::NoteOff { channel, note, velocity: 0 })
                } else {
                    Some(MidiMessage::NoteOn { channel, note, velocity })
                }
            }
            0xA0 => Some(MidiMessage::PolyPressure { channel, note: d1?, pressure: d2? }),
            0xB0 => Some(MidiMessage::ControlChange { channel, cc: d1?, value: d2? }),
            0xD0 => Some(MidiMessage::ChannelPressure { channel, pressure: d1? }),
            0xE0 => Some(MidiMessage::PitchBend {
                channel,
                value: ((d2? as u16) << 7) | d1? as u16,
            }),
            0xC0 => None,
            _ => {
                if status == 0xF0 {
                    // Only complete frames are accepted
                    let end = data.iter().position(|&b| b == 0xF7)?;
                    Some(MidiMessage::SysEx { data: data[..=end].to_vec() })
                } else {
                    Some(MidiMessage::System { status })
                }
            }
        }
    }

    /// Encode to raw bytes
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                vec![0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                vec![0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F]
            }
            MidiMessage::PolyPressure { channel, note, pressure } => {
                vec![0xA0 | (channel & 0x0F), note & 0x7F, pressure & 0x7F]
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                vec![0xB0 | (channel & 0x0F), cc & 0x7F, value & 0x7F]
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                vec![0xD0 | (channel & 0x0F), pressure & 0x7F]
            }
            MidiMessage::PitchBend { channel, value } => {
                let value = value.min(16383);
                vec![0xE0 | (channel & 0x0F), (value & 0x7F) as u8, (value >> 7) as u8]
            }
            MidiMessage::SysEx { ref data } => data.clone(),
            MidiMessage::System { status } => vec![status],
        }
    }
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            MidiMessage::NoteOff { channel, note, velocity } => {
                write!(f, "NoteOff ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::NoteOn { channel, note, velocity } => {
                write!(f, "NoteOn ch:{} n:{} v:{}", channel + 1, note, velocity)
            }
            MidiMessage::PolyPressure { channel, note, pressure } => {
                write!(f, "PolyPressure ch:{} n:{} p:{}", channel + 1, note, pressure)
            }
            MidiMessage::ControlChange { channel, cc, value } => {
                write!(f, "CC ch:{} cc:{} v:{}", channel + 1, cc, value)
            }
            MidiMessage::ChannelPressure { channel, pressure } => {
                write!(f, "ChannelPressure ch:{} p:{}", channel + 1, pressure)
            }
            MidiMessage::PitchBend { channel, value } => {
                write!(f, "PitchBend ch:{} v:{}", channel + 1, value)
            }
            MidiMessage::SysEx { ref data } => write!(f, "SysEx {} bytes", data.len()),
            MidiMessage::System { status } => write!(f, "System 0x{:02X}", status),
        }
    }
}

/// How a relative encoder reports a signed step in a 7-bit CC value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeEncoding {
    /// Bit 6 is the sign, bits 0-5 the magnitude (Mackie V-Pots: 0x01 = +1, 0x41 = -1)
    SignMagnitude,
    /// 7-bit two's complement (0x01 = +1, 0x7F = -1)
    TwosComplement,
    /// Offset binary centred on 64 (0x41 = +1, 0x3F = -1)
    OffsetBinary,
}

impl RelativeEncoding {
    /// Decode a CC value into a signed step
    pub fn decode(self, value: u8) -> i32 {
        let value = value & 0x7F;
        match self {
            RelativeEncoding::SignMagnitude => {
                let magnitude = (value & 0x3F) as i32;
                if value & 0x40 != 0 {
                    -magnitude
                } else {
                    magnitude
                }
            }
            RelativeEncoding::TwosComplement => {
                if value & 0x40 != 0 {
                    value as i32 - 128
                } else {
                    value as i32
                }
            }
            RelativeEncoding::OffsetBinary => value as i32 - 64,
        }
    }

    /// Encode a signed step, clamped to what the encoding can represent
    pub fn encode(self, delta: i32) -> u8 {
        match self {
            RelativeEncoding::SignMagnitude => {
                let magnitude = delta.unsigned_abs().min(0x3F) as u8;
                if delta < 0 {
                    0x40 | magnitude
                } else {
                    magnitude
                }
            }
            RelativeEncoding::TwosComplement => (delta.clamp(-64, 63) as i8 as u8) & 0x7F,
            RelativeEncoding::OffsetBinary => (delta.clamp(-64, 63) + 64) as u8,
        }
    }
}

/// MIDI value conversion utilities
pub mod convert {
    /// Full scale of a 14-bit value
    pub const MAX_14BIT: u16 = 16383;

    /// Normalized value (0.0-1.0) to 14-bit
    pub fn from_unit(value: f64) -> u16 {
        (value.clamp(0.0, 1.0) * MAX_14BIT as f64).round() as u16
    }

    /// 14-bit to normalized value (0.0-1.0)
    pub fn to_unit(value_14bit: u16) -> f64 {
        value_14bit.min(MAX_14BIT) as f64 / MAX_14BIT as f64
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
