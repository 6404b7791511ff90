//! Mode/View state machine
//!
//! One permanent active feature plus a stack of temporary overrides. The
//! effective feature is the top of the stack, or the permanent one when the
//! stack is empty. Unknown ids are ignored with a warning.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Something the manager can switch on and off
pub trait Feature {
    fn activate(&self);
    fn deactivate(&self);
}

pub struct FeatureManager<T> {
    /// "mode" or "view", for diagnostics
    kind: &'static str,
    catalog: BTreeMap<String, T>,
    active: Option<String>,
    overrides: Vec<String>,
}

impl<T: Feature> FeatureManager<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            catalog: BTreeMap::new(),
            active: None,
            overrides: Vec::new(),
        }
    }

    /// Add a feature to the catalog
    pub fn register(&mut self, id: impl Into<String>, feature: T) {
        let id = id.into();
        if self.catalog.insert(id.clone(), feature).is_some() {
            warn!("Replacing registered {} '{}'", self.kind, id);
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.catalog.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.catalog.keys().map(String::as_str)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.catalog.get(id)
    }

    fn known(&self, id: &str) -> bool {
        if self.catalog.contains_key(id) {
            true
        } else {
            warn!("Unknown {} '{}' ignored", self.kind, id);
            false
        }
    }

    fn run_activate(&self, id: &str) {
        if let Some(feature) = self.catalog.get(id) {
            feature.activate();
        }
    }

    fn run_deactivate(&self, id: &str) {
        if let Some(feature) = self.catalog.get(id) {
            feature.deactivate();
        }
    }

    /// Make `id` the permanent feature, dropping every override
    pub fn set_active(&mut self, id: &str) -> bool {
        if !self.known(id) {
            return false;
        }
        if self.overrides.is_empty() && self.active.as_deref() == Some(id) {
            return false;
        }

        if let Some(current) = self.effective_id().map(str::to_owned) {
            self.run_deactivate(&current);
        }
        self.overrides.clear();
        self.active = Some(id.to_owned());
        self.run_activate(id);
        info!("Active {}: {}", self.kind, id);
        true
    }

    /// Override the effective feature until [`restore`](Self::restore)
    pub fn set_temporary(&mut self, id: &str) -> bool {
        if !self.known(id) {
            return false;
        }
        if self.effective_id() == Some(id) {
            return false;
        }

        if let Some(current) = self.effective_id().map(str::to_owned) {
            self.run_deactivate(&current);
        }
        self.overrides.push(id.to_owned());
        self.run_activate(id);
        debug!("Temporary {}: {} (depth {})", self.kind, id, self.overrides.len());
        true
    }

    /// Drop the newest override and return to its predecessor
    pub fn restore(&mut self) -> bool {
        let Some(top) = self.overrides.pop() else {
            return false;
        };
        self.run_deactivate(&top);
        if let Some(previous) = self.effective_id().map(str::to_owned) {
            self.run_activate(&previous);
            debug!("Restored {}: {}", self.kind, previous);
        }
        true
    }

    /// Permanent feature
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Newest override
    pub fn temporary_id(&self) -> Option<&str> {
        self.overrides.last().map(String::as_str)
    }

    /// Feature currently receiving input
    pub fn effective_id(&self) -> Option<&str> {
        self.temporary_id().or(self.active_id())
    }

    pub fn effective(&self) -> Option<&T> {
        self.effective_id().and_then(|id| self.catalog.get(id))
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.as_deref() == Some(id)
    }

    pub fn is_active_or_temporary(&self, id: &str) -> bool {
        self.is_active(id) || self.overrides.iter().any(|o| o == id)
    }

    pub fn override_depth(&self) -> usize {
        self.overrides.len()
    }
}
