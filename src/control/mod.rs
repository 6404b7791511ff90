//! Physical controls
//!
//! A surface is described as a list of [`ControlSpec`]s: what each control is,
//! where it lives on the wire and how it reports. The [`registry`] decodes
//! incoming MIDI against that list and remembers what was last sent to each
//! control.

pub mod buttons;
pub mod cache;
pub mod pads;
pub mod registry;

pub use buttons::{ButtonAction, ButtonEvent, ButtonTracker};
pub use cache::SentCache;
pub use pads::{PadBatch, PadGridLights};
pub use registry::ControlRegistry;

use crate::midi::RelativeEncoding;
use crate::protocol::DeviceNote;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Button,
    Knob,
    Fader,
    Pad,
}

/// Identity of one physical control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId {
    pub kind: ControlKind,
    pub index: u8,
}

impl ControlId {
    pub const fn new(kind: ControlKind, index: u8) -> Self {
        Self { kind, index }
    }

    pub const fn button(index: u8) -> Self {
        Self::new(ControlKind::Button, index)
    }

    pub const fn knob(index: u8) -> Self {
        Self::new(ControlKind::Knob, index)
    }

    pub const fn fader(index: u8) -> Self {
        Self::new(ControlKind::Fader, index)
    }

    pub const fn pad(index: u8) -> Self {
        Self::new(ControlKind::Pad, index)
    }
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}#{}", self.kind, self.index)
    }
}

/// Where a control lives on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MidiAddress {
    Note { channel: u8, note: u8 },
    Cc { channel: u8, cc: u8 },
    PitchBend { channel: u8 },
}

/// How a control reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Note or CC with 0 = released
    Button,
    /// 7-bit absolute position
    AbsoluteEncoder,
    /// Endless encoder sending signed steps
    RelativeEncoder(RelativeEncoding),
    /// 14-bit pitch-bend fader
    Fader14Bit,
}

/// When a button fires, as declared by the device for each control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Trigger {
    /// Press edge only
    #[default]
    OnPress,
    /// Release edge only
    OnRelease,
    /// Both edges
    Momentary,
    /// Long press after the hold threshold, short press on an earlier release
    LongPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSpec {
    pub id: ControlId,
    pub address: MidiAddress,
    pub capability: Capability,
    /// Capacitive touch note for faders and knobs that have one
    pub touch: Option<MidiAddress>,
    pub trigger: Trigger,
}

impl ControlSpec {
    pub fn button(index: u8, address: MidiAddress, trigger: Trigger) -> Self {
        Self {
            id: ControlId::button(index),
            address,
            capability: Capability::Button,
            touch: None,
            trigger,
        }
    }

    pub fn relative_knob(index: u8, address: MidiAddress, encoding: RelativeEncoding) -> Self {
        Self {
            id: ControlId::knob(index),
            address,
            capability: Capability::RelativeEncoder(encoding),
            touch: None,
            trigger: Trigger::default(),
        }
    }

    pub fn absolute_knob(index: u8, address: MidiAddress) -> Self {
        Self {
            id: ControlId::knob(index),
            address,
            capability: Capability::AbsoluteEncoder,
            touch: None,
            trigger: Trigger::default(),
        }
    }

    pub fn fader(index: u8, channel: u8) -> Self {
        Self {
            id: ControlId::fader(index),
            address: MidiAddress::PitchBend { channel },
            capability: Capability::Fader14Bit,
            touch: None,
            trigger: Trigger::default(),
        }
    }

    pub fn with_touch(mut self, touch: MidiAddress) -> Self {
        self.touch = Some(touch);
        self
    }
}

/// Decoded hardware input
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    ButtonDown(ControlId),
    ButtonUp(ControlId),
    /// Relative encoder steps
    KnobDelta(ControlId, i32),
    /// Absolute position, 0.0..=1.0
    KnobAbsolute(ControlId, f64),
    /// Fader position, 0.0..=1.0
    Fader(ControlId, f64),
    Touch(ControlId, bool),
    /// Note on an unassigned address, resolved against the active pad grid
    PadDown(DeviceNote, u8),
    PadUp(DeviceNote),
    PadPressure(DeviceNote, u8),
}

impl InputEvent {
    pub fn control(&self) -> Option<ControlId> {
        match *self {
            InputEvent::ButtonDown(id)
            | InputEvent::ButtonUp(id)
            | InputEvent::KnobDelta(id, _)
            | InputEvent::KnobAbsolute(id, _)
            | InputEvent::Fader(id, _)
            | InputEvent::Touch(id, _) => Some(id),
            InputEvent::PadDown(..) | InputEvent::PadUp(_) | InputEvent::PadPressure(..) => None,
        }
    }
}
