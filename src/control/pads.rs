//! Pad grid light batching
//!
//! Views call [`PadGridLights::light`] once per pad per frame, possibly from
//! several places. Changes accumulate in a pending map behind their own lock
//! and leave in one batch per flush. When nothing changes the full grid is
//! re-sent once per keep-alive window.

use crate::protocol::{DeviceNote, LightInfo};
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// Pads to transmit in one message, in device note order
pub type PadBatch = Vec<(DeviceNote, LightInfo)>;

#[derive(Debug, Default)]
struct Shown {
    pads: BTreeMap<DeviceNote, LightInfo>,
    last_sent_ms: Option<u64>,
}

#[derive(Debug)]
pub struct PadGridLights {
    pending: Mutex<BTreeMap<DeviceNote, LightInfo>>,
    shown: Mutex<Shown>,
    keep_alive_ms: u64,
}

impl PadGridLights {
    pub fn new(keep_alive_ms: u64) -> Self {
        Self {
            pending: Mutex::new(BTreeMap::new()),
            shown: Mutex::new(Shown::default()),
            keep_alive_ms,
        }
    }

    /// Queue a pad colour; no-op when the pad already shows it
    pub fn light(&self, pad: DeviceNote, light: LightInfo) {
        let already_shown = self.shown.lock().pads.get(&pad) == Some(&light);
        let mut pending = self.pending.lock();
        if already_shown {
            pending.remove(&pad);
        } else {
            pending.insert(pad, light);
        }
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Take what must be sent now: the pending changes, or the full grid
    /// when the keep-alive window expired
    pub fn flush(&self, now_ms: u64) -> Option<PadBatch> {
        let changes: PadBatch = std::mem::take(&mut *self.pending.lock()).into_iter().collect();
        if !changes.is_empty() {
            return Some(changes);
        }

        let shown = self.shown.lock();
        let sent_at = shown.last_sent_ms?;
        if shown.pads.is_empty() || now_ms.saturating_sub(sent_at) < self.keep_alive_ms {
            return None;
        }
        Some(shown.pads.iter().map(|(pad, light)| (*pad, *light)).collect())
    }

    /// Record a successful transmission of `batch`
    pub fn commit(&self, batch: &PadBatch, now_ms: u64) {
        let mut shown = self.shown.lock();
        for (pad, light) in batch {
            shown.pads.insert(*pad, *light);
        }
        shown.last_sent_ms = Some(now_ms);
    }

    /// Put a failed batch back, keeping any newer pending colour
    pub fn requeue(&self, batch: PadBatch) {
        let mut pending = self.pending.lock();
        for (pad, light) in batch {
            pending.entry(pad).or_insert(light);
        }
    }

    /// Forget what the device shows (layout change, reconnect)
    pub fn reset(&self) {
        self.pending.lock().clear();
        *self.shown.lock() = Shown::default();
    }

    pub fn set_keep_alive(&mut self, keep_alive_ms: u64) {
        self.keep_alive_ms = keep_alive_ms;
    }
}

impl Default for PadGridLights {
    fn default() -> Self {
        Self::new(crate::control::cache::DEFAULT_KEEP_ALIVE_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ColorIndex;
    use std::sync::Arc;

    fn pad(note: u8) -> DeviceNote {
        DeviceNote::new(0, note)
    }

    fn red() -> LightInfo {
        LightInfo::solid(ColorIndex(3))
    }

    #[test]
    fn test_coalesces_into_one_batch() {
        let lights = PadGridLights::new(3000);
        lights.light(pad(11), red());
        lights.light(pad(12), red());
        lights.light(pad(11), LightInfo::OFF);

        let batch = lights.flush(0).unwrap();
        assert_eq!(batch, vec![(pad(11), LightInfo::OFF), (pad(12), red())]);
        assert_eq!(lights.pending_len(), 0);
    }

    #[test]
    fn test_idempotent_flush_and_single_keep_alive() {
        let lights = PadGridLights::new(3000);
        lights.light(pad(11), red());
        let batch = lights.flush(0).unwrap();
        lights.commit(&batch, 0);

        // Same frame drawn again
        lights.light(pad(11), red());
        assert_eq!(lights.flush(30), None);
        assert_eq!(lights.flush(2999), None);

        let keep_alive = lights.flush(3000).unwrap();
        assert_eq!(keep_alive, vec![(pad(11), red())]);
        lights.commit(&keep_alive, 3000);
        assert_eq!(lights.flush(3001), None);
    }

    #[test]
    fn test_failed_batch_is_retried() {
        let lights = PadGridLights::new(3000);
        lights.light(pad(11), red());
        let batch = lights.flush(0).unwrap();
        lights.light(pad(11), LightInfo::OFF);
        lights.requeue(batch);
        assert_eq!(lights.flush(30), Some(vec![(pad(11), LightInfo::OFF)]));
    }

    #[test]
    fn test_reset_forgets_device_state() {
        let lights = PadGridLights::new(3000);
        lights.light(pad(11), red());
        let batch = lights.flush(0).unwrap();
        lights.commit(&batch, 0);

        lights.reset();
        lights.light(pad(11), red());
        assert_eq!(lights.flush(10), Some(vec![(pad(11), red())]));
        assert_eq!(lights.flush(5000), None);
    }

    #[test]
    fn test_light_from_other_threads() {
        let lights = Arc::new(PadGridLights::new(3000));
        let handles: Vec<_> = (0..4u8)
            .map(|t| {
                let lights = Arc::clone(&lights);
                std::thread::spawn(move || {
                    for i in 0..16 {
                        lights.light(pad(t * 16 + i), red());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(lights.flush(0).map(|b| b.len()), Some(64));
    }
}
