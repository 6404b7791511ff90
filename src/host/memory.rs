//! In-memory host model
//!
//! Backs the dry-run binary and the tests: parameters with a value, a default
//! and an optional modulation offset, collections that announce changes, and
//! a note sink that records what was played.

use super::{
    HostEvent, HostListener, NoteSink, Parameter, ParameterRef, ParameterSource, SubscriptionId,
};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

pub struct MemoryParameter {
    name: String,
    value: Mutex<f64>,
    default_value: f64,
    modulation: Mutex<f64>,
    touched: AtomicBool,
    removed: AtomicBool,
}

impl MemoryParameter {
    pub fn new(name: impl Into<String>, default_value: f64) -> Arc<Self> {
        let default_value = default_value.clamp(0.0, 1.0);
        Arc::new(Self {
            name: name.into(),
            value: Mutex::new(default_value),
            default_value,
            modulation: Mutex::new(0.0),
            touched: AtomicBool::new(false),
            removed: AtomicBool::new(false),
        })
    }

    pub fn set_modulation(&self, offset: f64) {
        *self.modulation.lock() = offset;
    }

    /// Mark as deleted in the host; existing handles see `exists() == false`
    pub fn remove(&self) {
        self.removed.store(true, Ordering::Release);
    }
}

impl Parameter for MemoryParameter {
    fn exists(&self) -> bool {
        !self.removed.load(Ordering::Acquire)
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn value(&self) -> f64 {
        *self.value.lock()
    }

    fn modulated_value(&self) -> f64 {
        (self.value() + *self.modulation.lock()).clamp(0.0, 1.0)
    }

    fn display_value(&self) -> String {
        format!("{:.0}%", self.value() * 100.0)
    }

    fn is_touched(&self) -> bool {
        self.touched.load(Ordering::Acquire)
    }

    fn set_value(&self, value: f64) {
        *self.value.lock() = value.clamp(0.0, 1.0);
    }

    fn change_value(&self, delta: f64) {
        let mut value = self.value.lock();
        *value = (*value + delta).clamp(0.0, 1.0);
    }

    fn reset_value(&self) {
        *self.value.lock() = self.default_value;
    }

    fn touch(&self, touched: bool) {
        self.touched.store(touched, Ordering::Release);
    }
}

/// Parameter collection with change notifications
#[derive(Default)]
pub struct MemoryParameterSource {
    params: RwLock<Vec<Arc<MemoryParameter>>>,
    listeners: Mutex<Vec<(SubscriptionId, HostListener)>>,
    next_subscription: AtomicU64,
}

impl MemoryParameterSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// One parameter per name, all at half scale
    pub fn with_names(names: impl IntoIterator<Item = String>) -> Arc<Self> {
        let source = Self::new();
        *source.params.write() = names
            .into_iter()
            .map(|name| MemoryParameter::new(name, 0.5))
            .collect();
        source
    }

    pub fn push(&self, param: Arc<MemoryParameter>) {
        self.params.write().push(param);
        self.notify(&HostEvent::CollectionChanged);
    }

    pub fn replace_all(&self, params: Vec<Arc<MemoryParameter>>) {
        *self.params.write() = params;
        self.notify(&HostEvent::CollectionChanged);
    }

    pub fn get(&self, index: usize) -> Option<Arc<MemoryParameter>> {
        self.params.read().get(index).cloned()
    }

    pub fn notify(&self, event: &HostEvent) {
        // Listeners may call back into the source
        let listeners: Vec<HostListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

impl ParameterSource for MemoryParameterSource {
    fn len(&self) -> usize {
        self.params.read().len()
    }

    fn parameter(&self, index: usize) -> Option<ParameterRef> {
        self.get(index).map(|p| p as ParameterRef)
    }

    fn subscribe(&self, listener: HostListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.lock().retain(|(existing, _)| *existing != id);
    }
}

/// Note sink that keeps what was played
#[derive(Debug, Default)]
pub struct RecordingNoteSink {
    played: Mutex<Vec<PlayedNote>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayedNote {
    On { channel: u8, note: u8, velocity: u8 },
    Off { channel: u8, note: u8 },
    Pressure { channel: u8, note: u8, pressure: u8 },
}

impl RecordingNoteSink {
    pub fn take(&self) -> Vec<PlayedNote> {
        std::mem::take(&mut *self.played.lock())
    }
}

impl NoteSink for RecordingNoteSink {
    fn note_on(&self, channel: u8, note: u8, velocity: u8) {
        debug!("Note on ch:{} n:{} v:{}", channel + 1, note, velocity);
        self.played.lock().push(PlayedNote::On { channel, note, velocity });
    }

    fn note_off(&self, channel: u8, note: u8) {
        debug!("Note off ch:{} n:{}", channel + 1, note);
        self.played.lock().push(PlayedNote::Off { channel, note });
    }

    fn pressure(&self, channel: u8, note: u8, pressure: u8) {
        self.played.lock().push(PlayedNote::Pressure { channel, note, pressure });
    }
}

/// Small host used by the binary when no real host is attached
pub struct MemoryHost {
    /// Track volumes
    pub mixer: Arc<MemoryParameterSource>,
    /// Parameters of the selected device
    pub device: Arc<MemoryParameterSource>,
    pub notes: Arc<RecordingNoteSink>,
}

impl MemoryHost {
    pub fn demo(tracks: usize) -> Self {
        const DEVICE_PARAMS: [&str; 12] = [
            "Cutoff", "Reso", "Drive", "Env Amt", "Attack", "Decay", "Sustain", "Release",
            "LFO Rate", "LFO Amt", "Width", "Mix",
        ];
        Self {
            mixer: MemoryParameterSource::with_names((1..=tracks).map(|i| format!("Track {}", i))),
            device: MemoryParameterSource::with_names(DEVICE_PARAMS.iter().map(|s| s.to_string())),
            notes: Arc::new(RecordingNoteSink::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_parameter_values_clamp() {
        let p = MemoryParameter::new("Cutoff", 0.25);
        p.change_value(1.5);
        assert_eq!(p.value(), 1.0);
        p.set_value(-3.0);
        assert_eq!(p.value(), 0.0);
        p.reset_value();
        assert_eq!(p.value(), 0.25);
        assert_eq!(p.display_value(), "25%");
    }

    #[test]
    fn test_modulation_only_affects_modulated_value() {
        let p = MemoryParameter::new("Mix", 0.5);
        p.set_modulation(0.75);
        assert_eq!(p.value(), 0.5);
        assert_eq!(p.modulated_value(), 1.0);
    }

    #[test]
    fn test_source_notifies_on_change() {
        let source = MemoryParameterSource::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        source.subscribe(Arc::new(move |event: &HostEvent| {
            assert_eq!(*event, HostEvent::CollectionChanged);
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        source.push(MemoryParameter::new("A", 0.0));
        source.replace_all(vec![]);
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(source.is_empty());
    }

    #[test]
    fn test_unsubscribed_listener_is_not_called() {
        let source = MemoryParameterSource::new();
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let id = source.subscribe(Arc::new(move |_: &HostEvent| {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        source.unsubscribe(id);
        source.unsubscribe(id);
        source.push(MemoryParameter::new("A", 0.0));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(source.listener_count(), 0);
    }

    #[test]
    fn test_removed_parameter_stops_existing() {
        let source = MemoryHost::demo(2).mixer;
        let handle = source.parameter(0).unwrap();
        assert!(handle.exists());
        source.get(0).unwrap().remove();
        assert!(!handle.exists());
    }
}
