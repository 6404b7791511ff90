use super::binding::{ButtonHandler, KnobHandler, Renderer};
use super::manager::Feature;
use std::sync::Arc;

pub type Hook = Arc<dyn Fn() + Send + Sync>;

/// Knob/button binding set
///
/// Built once at startup from shared handler objects:
///
/// ```ignore
/// let mode = Mode::new()
///     .with_knobs(Arc::new(ParameterKnobs::new(bank.clone(), 0.01)))
///     .with_renderer(Arc::new(ParameterRenderer::new(bank, ControlKind::Knob)))
///     .on_activate(move || tracing::info!("device mode"));
/// ```
#[derive(Clone, Default)]
pub struct Mode {
    knobs: Option<Arc<dyn KnobHandler>>,
    buttons: Option<Arc<dyn ButtonHandler>>,
    renderers: Vec<Arc<dyn Renderer>>,
    on_activate: Vec<Hook>,
    on_deactivate: Vec<Hook>,
}

impl Mode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_knobs(mut self, knobs: Arc<dyn KnobHandler>) -> Self {
        self.knobs = Some(knobs);
        self
    }

    pub fn with_buttons(mut self, buttons: Arc<dyn ButtonHandler>) -> Self {
        self.buttons = Some(buttons);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderers.push(renderer);
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

    pub fn knobs(&self) -> Option<&Arc<dyn KnobHandler>> {
        self.knobs.as_ref()
    }

    pub fn buttons(&self) -> Option<&Arc<dyn ButtonHandler>> {
        self.buttons.as_ref()
    }

    pub fn renderers(&self) -> &[Arc<dyn Renderer>] {
        &self.renderers
    }
}

impl Feature for Mode {
    fn activate(&self) {
        self.on_activate.iter().for_each(|hook| hook());
    }

    fn deactivate(&self) {
        self.on_deactivate.iter().for_each(|hook| hook());
    }
}
