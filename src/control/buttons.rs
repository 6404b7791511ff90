//! Button edge handling
//!
//! Each button carries the [`Trigger`] its device declared for it. The tracker
//! turns raw down/up edges into the actions that trigger asks for; long-press
//! detection runs on the task queue and is cancelled by the release.

use super::{ControlId, Trigger};
use crate::tasks::{TaskId, TaskQueue};
use std::collections::HashMap;
use tracing::trace;

/// Default hold time before a long press fires
pub const DEFAULT_LONG_PRESS_MS: u64 = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonAction {
    Press,
    Release,
    /// Held past the long-press threshold
    LongPress,
    /// Released before the long-press threshold
    ShortPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub id: ControlId,
    pub action: ButtonAction,
}

impl ButtonEvent {
    fn new(id: ControlId, action: ButtonAction) -> Self {
        Self { id, action }
    }
}

#[derive(Debug, Clone, Copy)]
struct Held {
    long_press: Option<TaskId>,
    long_fired: bool,
}

#[derive(Debug)]
pub struct ButtonTracker {
    held: HashMap<ControlId, Held>,
    timers: TaskQueue<ControlId>,
    long_press_ms: u64,
}

impl ButtonTracker {
    pub fn new(long_press_ms: u64) -> Self {
        Self {
            held: HashMap::new(),
            timers: TaskQueue::new(),
            long_press_ms,
        }
    }

    pub fn set_long_press(&mut self, long_press_ms: u64) {
        self.long_press_ms = long_press_ms;
    }

    pub fn is_held(&self, id: ControlId) -> bool {
        self.held.contains_key(&id)
    }

    pub fn press(&mut self, id: ControlId, trigger: Trigger, now_ms: u64) -> Option<ButtonEvent> {
        if self.held.contains_key(&id) {
            trace!("Repeated press on {} ignored", id);
            return None;
        }
        let long_press = (trigger == Trigger::LongPress)
            .then(|| self.timers.schedule(now_ms, self.long_press_ms, id));
        self.held.insert(
            id,
            Held {
                long_press,
                long_fired: false,
            },
        );

        match trigger {
            Trigger::OnPress | Trigger::Momentary => Some(ButtonEvent::new(id, ButtonAction::Press)),
            Trigger::OnRelease | Trigger::LongPress => None,
        }
    }

    pub fn release(&mut self, id: ControlId, trigger: Trigger) -> Option<ButtonEvent> {
        let held = self.held.remove(&id);
        if let Some(task) = held.and_then(|h| h.long_press) {
            self.timers.cancel(task);
        }

        match trigger {
            Trigger::OnPress => None,
            Trigger::Momentary => Some(ButtonEvent::new(id, ButtonAction::Release)),
            // A release without a press we saw (e.g. held during startup) is dropped
            Trigger::OnRelease => held.map(|_| ButtonEvent::new(id, ButtonAction::Release)),
            Trigger::LongPress => match held {
                Some(h) if h.long_fired => Some(ButtonEvent::new(id, ButtonAction::Release)),
                Some(_) => Some(ButtonEvent::new(id, ButtonAction::ShortPress)),
                None => None,
            },
        }
    }

    /// Long presses whose hold time elapsed
    pub fn run_due(&mut self, now_ms: u64) -> Vec<ButtonEvent> {
        self.timers
            .take_due(now_ms)
            .into_iter()
            .filter_map(|id| {
                let held = self.held.get_mut(&id)?;
                held.long_press = None;
                held.long_fired = true;
                Some(ButtonEvent::new(id, ButtonAction::LongPress))
            })
            .collect()
    }

    pub fn next_due(&self) -> Option<u64> {
        self.timers.next_due()
    }

    pub fn clear(&mut self) {
        self.held.clear();
        self.timers.clear();
    }
}

impl Default for ButtonTracker {
    fn default() -> Self {
        Self::new(DEFAULT_LONG_PRESS_MS)
    }
}
