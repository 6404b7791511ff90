//! Last-sent state with keep-alive
//!
//! Every output (a button LED, a ring, a text cell, the whole pad grid, the
//! OLED) remembers what it last transmitted successfully and when. A new state
//! is sent if it differs or if the keep-alive window has elapsed, so displays
//! that sleep without traffic stay awake.

/// Default keep-alive window
pub const DEFAULT_KEEP_ALIVE_MS: u64 = 3000;

#[derive(Debug, Clone)]
pub struct SentCache<T> {
    last: Option<(T, u64)>,
    keep_alive_ms: u64,
}

impl<T: PartialEq + Clone> SentCache<T> {
    pub fn new(keep_alive_ms: u64) -> Self {
        Self {
            last: None,
            keep_alive_ms,
        }
    }

    /// True when `value` differs from the last sent state or the window expired
    pub fn needs_update(&self, value: &T, now_ms: u64) -> bool {
        match &self.last {
            None => true,
            Some((last, sent_at)) => {
                last != value || now_ms.saturating_sub(*sent_at) >= self.keep_alive_ms
            }
        }
    }

    /// True when the window expired regardless of content
    pub fn keep_alive_due(&self, now_ms: u64) -> bool {
        match &self.last {
            None => false,
            Some((_, sent_at)) => now_ms.saturating_sub(*sent_at) >= self.keep_alive_ms,
        }
    }

    /// Record a successful transmission
    pub fn mark_sent(&mut self, value: T, now_ms: u64) {
        self.last = Some((value, now_ms));
    }

    pub fn last(&self) -> Option<&T> {
        self.last.as_ref().map(|(value, _)| value)
    }

    /// Forget the last state; the next update is always sent
    pub fn invalidate(&mut self) {
        self.last = None;
    }

    pub fn set_keep_alive(&mut self, keep_alive_ms: u64) {
        self.keep_alive_ms = keep_alive_ms;
    }
}

impl<T: PartialEq + Clone> Default for SentCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_KEEP_ALIVE_MS)
    }
}
