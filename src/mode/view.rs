use super::binding::GridBinding;
use super::manager::Feature;
use super::mode::Hook;
use crate::protocol::GridLayout;
use std::sync::Arc;

/// Pad grid binding set
///
/// Carries the note layout its grid binding expects; switching to a View with
/// a different layout resets the pad light cache.
#[derive(Clone)]
pub struct View {
    layout: GridLayout,
    grid: Option<Arc<dyn GridBinding>>,
    on_activate: Vec<Hook>,
    on_deactivate: Vec<Hook>,
}

impl View {
    pub fn new(layout: GridLayout) -> Self {
        Self {
            layout,
            grid: None,
            on_activate: Vec::new(),
            on_deactivate: Vec::new(),
        }
    }

    pub fn with_grid(mut self, grid: Arc<dyn GridBinding>) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn on_activate(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_activate.push(Arc::new(hook));
        self
    }

    pub fn on_deactivate(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_deactivate.push(Arc::new(hook));
        self
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn grid(&self) -> Option<&Arc<dyn GridBinding>> {
        self.grid.as_ref()
    }
}

impl Feature for View {
    fn activate(&self) {
        self.on_activate.iter().for_each(|hook| hook());
    }

    fn deactivate(&self) {
        self.on_deactivate.iter().for_each(|hook| hook());
    }
}
