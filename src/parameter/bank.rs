//! Paged parameter bank
//!
//! A fixed number of controls looks at a window of `page_size` items of a host
//! collection. The window is rebuilt when the page moves or the collection
//! changes, never on a flush tick. Every rebuild bumps the generation so
//! consumers can tell their cached view is stale.

use super::{no_parameter, ParameterProvider};
use crate::host::{HostEvent, ParameterRef, ParameterSource, SubscriptionId};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Called with the new generation after every rebind
pub type BankListener = Arc<dyn Fn(u64) + Send + Sync>;

struct Binding {
    source: Arc<dyn ParameterSource>,
    /// Index of the first item shown
    position: usize,
    params: Vec<ParameterRef>,
}

pub struct ParameterBank {
    page_size: usize,
    binding: RwLock<Binding>,
    generation: AtomicU64,
    /// Bumped on `set_source`; notifications from older sources are ignored
    source_epoch: Arc<AtomicU64>,
    /// Our listener on the current source
    subscription: Mutex<Option<SubscriptionId>>,
    listeners: Mutex<Vec<BankListener>>,
}

impl ParameterBank {
    pub fn new(source: Arc<dyn ParameterSource>, page_size: usize) -> Arc<Self> {
        let bank = Arc::new(Self {
            page_size: page_size.max(1),
            binding: RwLock::new(Binding {
                source: Arc::clone(&source),
                position: 0,
                params: Vec::new(),
            }),
            generation: AtomicU64::new(0),
            source_epoch: Arc::new(AtomicU64::new(0)),
            subscription: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        });
        bank.watch(&source, 0);
        bank.rebind();
        bank
    }

    fn watch(self: &Arc<Self>, source: &Arc<dyn ParameterSource>, epoch: u64) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let source_epoch = Arc::clone(&self.source_epoch);
        let id = source.subscribe(Arc::new(move |event: &HostEvent| {
            if source_epoch.load(Ordering::Acquire) != epoch {
                return;
            }
            if let (HostEvent::CollectionChanged, Some(bank)) = (event, weak.upgrade()) {
                bank.rebind();
            }
        }));
        *self.subscription.lock() = Some(id);
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Current page, 0-based
    pub fn page(&self) -> usize {
        self.binding.read().position / self.page_size
    }

    pub fn page_count(&self) -> usize {
        let len = self.binding.read().source.len();
        len.div_ceil(self.page_size).max(1)
    }

    pub fn position(&self) -> usize {
        self.binding.read().position
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn can_scroll_forward(&self) -> bool {
        self.page() + 1 < self.page_count()
    }

    pub fn can_scroll_backward(&self) -> bool {
        self.position() > 0
    }

    /// Select a page; out-of-range pages clamp to the last one
    pub fn select_page(&self, page: usize) {
        self.move_to(page.saturating_mul(self.page_size));
    }

    pub fn next_page(&self) {
        self.select_page(self.page() + 1);
    }

    pub fn previous_page(&self) {
        self.select_page(self.page().saturating_sub(1));
    }

    /// Scroll by a number of items
    pub fn scroll_by(&self, items: isize) {
        let position = self.position();
        let target = if items < 0 {
            position.saturating_sub(items.unsigned_abs())
        } else {
            position.saturating_add(items as usize)
        };
        self.move_to(target);
    }

    fn move_to(&self, position: usize) {
        {
            let mut binding = self.binding.write();
            let position = position.min(self.last_position(binding.source.len()));
            if position == binding.position {
                return;
            }
            binding.position = position;
        }
        self.rebind();
    }

    fn last_position(&self, len: usize) -> usize {
        len.saturating_sub(1) / self.page_size * self.page_size
    }

    /// Point the bank at a different collection (e.g. a new track selected)
    pub fn set_source(self: &Arc<Self>, source: Arc<dyn ParameterSource>) {
        let epoch = self.source_epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let previous = {
            let mut binding = self.binding.write();
            binding.position = 0;
            std::mem::replace(&mut binding.source, Arc::clone(&source))
        };
        if let Some(id) = self.subscription.lock().take() {
            previous.unsubscribe(id);
        }
        self.watch(&source, epoch);
        self.rebind();
    }

    /// Rebuild the current window from the source
    pub fn rebind(&self) {
        let generation = {
            let mut binding = self.binding.write();
            let len = binding.source.len();
            binding.position = binding.position.min(self.last_position(len));
            let start = binding.position;
            let params = (start..start + self.page_size)
                .map(|i| binding.source.parameter(i).unwrap_or_else(no_parameter))
                .collect();
            binding.params = params;
            self.generation.fetch_add(1, Ordering::AcqRel) + 1
        };
        debug!(
            "Parameter bank rebound: page {}/{} (generation {})",
            self.page() + 1,
            self.page_count(),
            generation
        );

        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(generation);
        }
    }

    pub fn subscribe(&self, listener: BankListener) {
        self.listeners.lock().push(listener);
    }
}

impl Drop for ParameterBank {
    fn drop(&mut self) {
        if let Some(id) = self.subscription.get_mut().take() {
            self.binding.get_mut().source.unsubscribe(id);
        }
    }
}

impl ParameterProvider for ParameterBank {
    fn size(&self) -> usize {
        self.page_size
    }

    fn get(&self, index: usize) -> ParameterRef {
        self.binding
            .read()
            .params
            .get(index)
            .cloned()
            .unwrap_or_else(no_parameter)
    }
}
