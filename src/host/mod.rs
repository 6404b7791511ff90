//! Host capability interface
//!
//! The surface never sees the host's object model. It sees parameters,
//! ordered collections of parameters, a sink for played notes and change
//! notifications. Everything takes `&self`; implementations use interior
//! mutability so handles can be shared as `Arc<dyn ...>` across the input
//! and flush paths.

pub mod memory;

use std::sync::Arc;

/// One host parameter
///
/// Values are normalized to 0.0..=1.0.
pub trait Parameter: Send + Sync {
    /// False for the "no parameter here" sentinel and for removed parameters
    fn exists(&self) -> bool;

    fn name(&self) -> String;

    fn value(&self) -> f64;

    /// Value including modulation, for display
    fn modulated_value(&self) -> f64 {
        self.value()
    }

    /// Host-formatted value, e.g. "-6.0 dB"
    fn display_value(&self) -> String;

    fn is_touched(&self) -> bool {
        false
    }

    fn set_value(&self, value: f64);

    /// Move by a normalized increment
    fn change_value(&self, delta: f64) {
        self.set_value((self.value() + delta).clamp(0.0, 1.0));
    }

    /// Back to the host default
    fn reset_value(&self);

    /// Begin/end a gesture (automation write, undo grouping)
    fn touch(&self, touched: bool);
}

pub type ParameterRef = Arc<dyn Parameter>;

/// Something the host reports about its model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// Items were added, removed or reordered
    CollectionChanged,
    /// The user selected a different track or device
    SelectionChanged,
    /// A parameter's value changed in the host
    ValueChanged { index: usize },
}

/// Host notification callback
pub type HostListener = Arc<dyn Fn(&HostEvent) + Send + Sync>;

/// Returned by [`ParameterSource::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Ordered, mutable host collection (a device's parameters, the track mixer)
pub trait ParameterSource: Send + Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// None past the end of the collection
    fn parameter(&self, index: usize) -> Option<ParameterRef>;

    /// Register for change notifications
    fn subscribe(&self, listener: HostListener) -> SubscriptionId;

    /// Drop a listener; unknown ids are ignored
    fn unsubscribe(&self, id: SubscriptionId);
}

/// Where played pads go
pub trait NoteSink: Send + Sync {
    fn note_on(&self, channel: u8, note: u8, velocity: u8);
    fn note_off(&self, channel: u8, note: u8);
    fn pressure(&self, _channel: u8, _note: u8, _pressure: u8) {}
}
