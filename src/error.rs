//! Error types shared by the codec, transport and surface layers
//!
//! Configuration and CLI code paths use `anyhow::Result`; everything that can
//! fail while talking to a device uses the typed errors below so the surface
//! can route them to its error hook instead of unwinding the dispatch path.

use std::sync::Arc;

/// Errors raised while encoding device messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("payload of {len} bytes exceeds the limit of {max} bytes")]
    PayloadTooLong { len: usize, max: usize },

    #[error("payload byte 0x{byte:02X} at offset {offset} is not a 7-bit data byte")]
    NotSevenBit { offset: usize, byte: u8 },

    #[error("grid note {0} is mapped more than once")]
    DuplicateGridNote(u8),

    #[error("device note {note} on channel {channel} is mapped more than once")]
    DuplicateDeviceNote { channel: u8, note: u8 },

    #[error("grid note {0} is outside the grid range")]
    GridNoteOutOfRange(u8),
}

/// Errors raised by MIDI output ports
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("output port is not connected")]
    NotConnected,

    #[error("failed to send {len} bytes: {reason}")]
    Send { len: usize, reason: String },

    #[error("no MIDI port found matching pattern: {0}")]
    PortNotFound(String),

    #[error("failed to open MIDI port: {0}")]
    Connect(String),
}

/// Errors reported by a running control surface
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SurfaceError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Host error-reporting hook invoked for failures at the transmission boundary
pub type ErrorHook = Arc<dyn Fn(&SurfaceError) + Send + Sync>;

/// Default hook: log and carry on
pub fn log_error_hook() -> ErrorHook {
    Arc::new(|err: &SurfaceError| {
        tracing::error!("Control surface error: {}", err);
    })
}
