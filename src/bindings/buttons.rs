//! Button tables
//!
//! Most buttons either switch a mode/view or call one host operation. A
//! [`ButtonMap`] binds `(button, action)` pairs to one of those and lights
//! each button from a state predicate.

use crate::control::{ButtonAction, ButtonEvent, ControlId};
use crate::mode::{BindingContext, ButtonHandler, Frame, RenderContext, Renderer, SurfaceRequest};
use crate::protocol::SemanticColor;
use std::collections::HashMap;
use std::sync::Arc;

type Action = Arc<dyn Fn(&mut BindingContext) + Send + Sync>;
type LightFn = Arc<dyn Fn() -> SemanticColor + Send + Sync>;

#[derive(Default, Clone)]
pub struct ButtonMap {
    actions: HashMap<(ControlId, ButtonAction), Action>,
    lights: Vec<(ControlId, LightFn)>,
}

impl ButtonMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `request` when `button` reports `action`
    pub fn on(self, button: ControlId, action: ButtonAction, request: SurfaceRequest) -> Self {
        self.on_fn(button, action, move |ctx| ctx.request(request.clone()))
    }

    pub fn on_fn(
        mut self,
        button: ControlId,
        action: ButtonAction,
        f: impl Fn(&mut BindingContext) + Send + Sync + 'static,
    ) -> Self {
        self.actions.insert((button, action), Arc::new(f));
        self
    }

    /// Hold-to-override: temporary mode on press, restore on release
    pub fn momentary_mode(self, button: ControlId, mode: impl Into<String>) -> Self {
        let mode = mode.into();
        self.on(button, ButtonAction::Press, SurfaceRequest::TemporaryMode(mode))
            .on(button, ButtonAction::Release, SurfaceRequest::RestoreMode)
    }

    pub fn light(
        mut self,
        button: ControlId,
        f: impl Fn() -> SemanticColor + Send + Sync + 'static,
    ) -> Self {
        self.lights.push((button, Arc::new(f)));
        self
    }
}

impl ButtonHandler for ButtonMap {
    fn button(&self, event: ButtonEvent, ctx: &mut BindingContext) -> bool {
        match self.actions.get(&(event.id, event.action)) {
            Some(action) => {
                action(ctx);
                true
            }
            None => false,
        }
    }
}

impl Renderer for ButtonMap {
    fn render(&self, frame: &mut Frame, ctx: &RenderContext) {
        for (button, color) in &self.lights {
            frame.set_light(*button, ctx.light(color(), *button));
        }
    }
}
