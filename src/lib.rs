//! surface-rt - control-surface runtime
//!
//! Binds MIDI control surfaces to a host's parameter model: a Mode/View state
//! machine picks the active bindings, parameter banks page a fixed set of
//! controls over a larger collection, knob debounce keeps feedback from
//! fighting the hand, and device codecs turn the rendered frame into SysEx,
//! notes and CCs.

pub mod bindings;
pub mod clock;
pub mod config;
pub mod control;
pub mod debounce;
pub mod devices;
pub mod error;
pub mod host;
pub mod midi;
pub mod mode;
pub mod monitor;
pub mod parameter;
pub mod protocol;
pub mod runtime;
pub mod setup;
pub mod surface;
pub mod tasks;
pub mod transport;
