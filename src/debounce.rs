//! Knob movement debounce
//!
//! While a knob or fader is being turned, host feedback for it lags behind the
//! gesture and would make the ring or display jump back. Each tick marks the
//! control as moving; a recheck task clears the flag once no tick arrived for
//! `timeout_ms`. The parameter itself is always updated immediately by the
//! binding; only the refresh path consults [`KnobMovement::is_moving`].

use crate::control::ControlId;
use crate::tasks::TaskQueue;
use std::collections::HashMap;
use tracing::trace;

pub const DEFAULT_RECHECK_MS: u64 = 100;
pub const DEFAULT_TIMEOUT_MS: u64 = 200;

#[derive(Debug, Clone, Copy, Default)]
struct Movement {
    last_tick_ms: u64,
    moving: bool,
}

#[derive(Debug)]
pub struct KnobMovement {
    controls: HashMap<ControlId, Movement>,
    rechecks: TaskQueue<ControlId>,
    recheck_ms: u64,
    timeout_ms: u64,
}

impl KnobMovement {
    pub fn new(recheck_ms: u64, timeout_ms: u64) -> Self {
        Self {
            controls: HashMap::new(),
            rechecks: TaskQueue::new(),
            recheck_ms: recheck_ms.max(1),
            timeout_ms,
        }
    }

    pub fn set_timing(&mut self, recheck_ms: u64, timeout_ms: u64) {
        self.recheck_ms = recheck_ms.max(1);
        self.timeout_ms = timeout_ms;
    }

    /// Record a tick from a physical gesture
    pub fn tick(&mut self, id: ControlId, now_ms: u64) {
        let movement = self.controls.entry(id).or_default();
        movement.last_tick_ms = now_ms;
        if !movement.moving {
            movement.moving = true;
            self.rechecks.schedule(now_ms, self.recheck_ms, id);
            trace!("{} started moving", id);
        }
    }

    pub fn is_moving(&self, id: ControlId) -> bool {
        self.controls.get(&id).map(|m| m.moving).unwrap_or(false)
    }

    /// Run due rechecks; returns the controls that stopped moving
    pub fn run_due(&mut self, now_ms: u64) -> Vec<ControlId> {
        let mut stopped = Vec::new();
        for id in self.rechecks.take_due(now_ms) {
            let Some(movement) = self.controls.get_mut(&id) else {
                continue;
            };
            if !movement.moving {
                continue;
            }
            if now_ms.saturating_sub(movement.last_tick_ms) >= self.timeout_ms {
                movement.moving = false;
                trace!("{} stopped moving", id);
                stopped.push(id);
            } else {
                self.rechecks.schedule(now_ms, self.recheck_ms, id);
            }
        }
        stopped
    }

    pub fn next_due(&self) -> Option<u64> {
        self.rechecks.next_due()
    }

    pub fn clear(&mut self) {
        self.controls.clear();
        self.rechecks.clear();
    }
}

impl Default for KnobMovement {
    fn default() -> Self {
        Self::new(DEFAULT_RECHECK_MS, DEFAULT_TIMEOUT_MS)
    }
}
