//! SysEx framing
//!
//! Wire shape: `F0 <header..> <type> <sub-type> [len/128 len%128] <payload..> F7`.
//! Each device family owns one [`SysexFormat`] describing its header and
//! whether the payload carries a two-byte length prefix.

use crate::error::CodecError;

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;

/// Largest payload a two 7-bit byte length prefix can describe
pub const MAX_PREFIXED_PAYLOAD: usize = 128 * 128 - 1;

/// Device family framing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysexFormat {
    /// Manufacturer / model bytes following F0
    pub header: Vec<u8>,
    /// Whether the payload is preceded by `len/128, len%128`
    pub length_prefixed: bool,
    /// Largest accepted payload
    pub max_payload: usize,
}

/// One decoded SysEx message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysexMessage {
    pub msg_type: u8,
    pub sub_type: u8,
    pub payload: Vec<u8>,
}

impl SysexMessage {
    pub fn new(msg_type: u8, sub_type: u8, payload: Vec<u8>) -> Self {
        Self {
            msg_type,
            sub_type,
            payload,
        }
    }
}

impl SysexFormat {
    pub fn new(header: &[u8]) -> Self {
        Self {
            header: header.to_vec(),
            length_prefixed: false,
            max_payload: 4096,
        }
    }

    pub fn with_length_prefix(mut self) -> Self {
        self.length_prefixed = true;
        self.max_payload = self.max_payload.min(MAX_PREFIXED_PAYLOAD);
        self
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = if self.length_prefixed {
            max_payload.min(MAX_PREFIXED_PAYLOAD)
        } else {
            max_payload
        };
        self
    }

    /// Frame a message. Fails if the payload is not 7-bit clean or too long.
    pub fn serialize(&self, msg: &SysexMessage) -> Result<Vec<u8>, CodecError> {
        let len = msg.payload.len();
        if len > self.max_payload {
            return Err(CodecError::PayloadTooLong {
                len,
                max: self.max_payload,
            });
        }
        if let Some(offset) = msg.payload.iter().position(|b| b & 0x80 != 0) {
            return Err(CodecError::NotSevenBit {
                offset,
                byte: msg.payload[offset],
            });
        }

        let mut out = Vec::with_capacity(self.header.len() + len + 6);
        out.push(SYSEX_START);
        out.extend_from_slice(&self.header);
        out.push(msg.msg_type & 0x7F);
        out.push(msg.sub_type & 0x7F);
        if self.length_prefixed {
            out.push((len / 128) as u8);
            out.push((len % 128) as u8);
        }
        out.extend_from_slice(&msg.payload);
        out.push(SYSEX_END);
        Ok(out)
    }

    /// Parse a complete frame. Any framing mismatch yields `None`.
    pub fn parse(&self, data: &[u8]) -> Option<SysexMessage> {
        let body = data.strip_prefix(&[SYSEX_START])?;
        let body = body.strip_prefix(self.header.as_slice())?;
        let body = body.strip_suffix(&[SYSEX_END])?;

        let (&msg_type, rest) = body.split_first()?;
        let (&sub_type, rest) = rest.split_first()?;

        let payload = if self.length_prefixed {
            let (&hi, rest) = rest.split_first()?;
            let (&lo, rest) = rest.split_first()?;
            if hi > 0x7F || lo > 0x7F {
                return None;
            }
            let len = hi as usize * 128 + lo as usize;
            if len != rest.len() {
                return None;
            }
            rest
        } else {
            rest
        };

        if payload.len() > self.max_payload || payload.iter().any(|b| b & 0x80 != 0) {
            return None;
        }
        if msg_type & 0x80 != 0 || sub_type & 0x80 != 0 {
            return None;
        }

        Some(SysexMessage::new(msg_type, sub_type, payload.to_vec()))
    }
}

/// Universal device identity request (any device, `F0 7E 7F 06 01 F7`)
pub const IDENTITY_REQUEST: [u8; 6] = [0xF0, 0x7E, 0x7F, 0x06, 0x01, 0xF7];

/// Contents of a universal identity reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: u8,
    /// One byte, or three when the first byte is 0x00
    pub manufacturer: Vec<u8>,
    pub family: u16,
    pub model: u16,
    pub version: [u8; 4],
}

/// Parse `F0 7E <dev> 06 02 <mfr..> <family lsb msb> <model lsb msb> <ver x4> F7`
pub fn parse_identity_reply(data: &[u8]) -> Option<DeviceIdentity> {
    let body = data.strip_prefix(&[SYSEX_START, 0x7E])?;
    let body = body.strip_suffix(&[SYSEX_END])?;
    let (&device_id, body) = body.split_first()?;
    let body = body.strip_prefix(&[0x06, 0x02])?;

    let mfr_len = if *body.first()? == 0x00 { 3 } else { 1 };
    if body.len() < mfr_len + 8 {
        return None;
    }
    let (manufacturer, rest) = body.split_at(mfr_len);

    let word = |lo: u8, hi: u8| (lo as u16) | ((hi as u16) << 7);
    Some(DeviceIdentity {
        device_id,
        manufacturer: manufacturer.to_vec(),
        family: word(rest[0], rest[1]),
        model: word(rest[2], rest[3]),
        version: [rest[4], rest[5], rest[6], rest[7]],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fire_format() -> SysexFormat {
        SysexFormat::new(&[0x47, 0x7F]).with_length_prefix()
    }

    #[test]
    fn test_length_prefixed_wire_bytes() {
        let msg = SysexMessage::new(0x43, 0x65, vec![0x01, 0x02, 0x03]);
        let bytes = fire_format().serialize(&msg).unwrap();
        assert_eq!(
            bytes,
            vec![0xF0, 0x47, 0x7F, 0x43, 0x65, 0x00, 0x03, 0x01, 0x02, 0x03, 0xF7]
        );
    }

    #[test]
    fn test_long_payload_prefix() {
        let msg = SysexMessage::new(0x43, 0x0E, vec![0; 300]);
        let bytes = fire_format().serialize(&msg).unwrap();
        assert_eq!(&bytes[5..7], &[0x02, 0x2C]);
        assert_eq!(fire_format().parse(&bytes), Some(msg));
    }

    #[test]
    fn test_rejects_eight_bit_payload() {
        let msg = SysexMessage::new(0x12, 0x00, vec![0x10, 0x80]);
        let err = SysexFormat::new(&[0x00, 0x00, 0x66, 0x14])
            .serialize(&msg)
            .unwrap_err();
        assert_eq!(err, CodecError::NotSevenBit { offset: 1, byte: 0x80 });
    }

    #[test]
    fn test_rejects_oversized_payload() {
        let format = SysexFormat::new(&[0x00]).with_max_payload(4);
        let msg = SysexMessage::new(1, 2, vec![0; 5]);
        assert_eq!(
            format.serialize(&msg),
            Err(CodecError::PayloadTooLong { len: 5, max: 4 })
        );
    }

    #[test]
    fn test_mismatched_header_is_no_message() {
        let bytes = fire_format()
            .serialize(&SysexMessage::new(0x43, 0x65, vec![1]))
            .unwrap();
        let other = SysexFormat::new(&[0x47, 0x7E]).with_length_prefix();
        assert_eq!(other.parse(&bytes), None);
    }

    #[test]
    fn test_truncated_frames_are_no_message() {
        let bytes = fire_format()
            .serialize(&SysexMessage::new(0x43, 0x65, vec![1, 2, 3]))
            .unwrap();
        for cut in 0..bytes.len() {
            assert_eq!(fire_format().parse(&bytes[..cut]), None, "cut at {}", cut);
        }
    }

    #[test]
    fn test_wrong_length_prefix_is_no_message() {
        let mut bytes = fire_format()
            .serialize(&SysexMessage::new(0x43, 0x65, vec![1, 2, 3]))
            .unwrap();
        bytes[6] = 0x04;
        assert_eq!(fire_format().parse(&bytes), None);
    }

    #[test]
    fn test_identity_reply() {
        // Launchpad X style reply
        let reply = [
            0xF0, 0x7E, 0x00, 0x06, 0x02, 0x00, 0x20, 0x29, 0x03, 0x01, 0x00, 0x00, 0x00, 0x04,
            0x05, 0x01, 0xF7,
        ];
        let id = parse_identity_reply(&reply).unwrap();
        assert_eq!(id.manufacturer, vec![0x00, 0x20, 0x29]);
        assert_eq!(id.family, 0x0083);
        assert_eq!(id.version, [0x00, 0x04, 0x05, 0x01]);
        assert_eq!(parse_identity_reply(&reply[..10]), None);
    }

    proptest! {
        #[test]
        fn prop_round_trip_prefixed(
            msg_type in 0u8..0x80,
            sub_type in 0u8..0x80,
            payload in proptest::collection::vec(0u8..0x80, 0..2048),
        ) {
            let msg = SysexMessage::new(msg_type, sub_type, payload);
            let bytes = fire_format().serialize(&msg).unwrap();
            prop_assert_eq!(fire_format().parse(&bytes), Some(msg));
        }

        #[test]
        fn prop_round_trip_plain(
            msg_type in 0u8..0x80,
            sub_type in 0u8..0x80,
            payload in proptest::collection::vec(0u8..0x80, 0..512),
        ) {
            let format = SysexFormat::new(&[0x00, 0x20, 0x29, 0x02]);
            let msg = SysexMessage::new(msg_type, sub_type, payload);
            let bytes = format.serialize(&msg).unwrap();
            prop_assert_eq!(format.parse(&bytes), Some(msg));
        }
    }
}
