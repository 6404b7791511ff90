//! Knob handlers and renderers backed by a parameter provider

use crate::control::{ControlId, ControlKind};
use crate::mode::{BindingContext, Frame, KnobHandler, RenderContext, Renderer};
use crate::parameter::ProviderRef;
use crate::protocol::bitmap::{self, WHITE};
use tracing::trace;

/// Knob `n` drives `provider.get(n)`
pub struct ParameterKnobs {
    provider: ProviderRef,
    /// Normalized change per encoder step
    step: f64,
}

impl ParameterKnobs {
    pub fn new(provider: ProviderRef, step: f64) -> Self {
        Self { provider, step }
    }
}

impl KnobHandler for ParameterKnobs {
    fn turn(&self, id: ControlId, delta: i32, _ctx: &mut BindingContext) {
        let param = self.provider.get(id.index as usize);
        if !param.exists() {
            trace!("{} turned with nothing bound", id);
            return;
        }
        param.change_value(delta as f64 * self.step);
    }

    fn set(&self, id: ControlId, value: f64, _ctx: &mut BindingContext) {
        let param = self.provider.get(id.index as usize);
        if param.exists() {
            param.set_value(value);
        }
    }

    fn touch(&self, id: ControlId, touched: bool, _ctx: &mut BindingContext) {
        let param = self.provider.get(id.index as usize);
        if param.exists() {
            param.touch(touched);
        }
    }
}

/// Rings/faders plus names on line 0 and values on line 1
///
/// The value line of a control under a gesture is left alone until it settles.
pub struct ParameterRenderer {
    provider: ProviderRef,
    kind: ControlKind,
}

impl ParameterRenderer {
    /// Values go to controls of `kind` (knob rings or motor faders)
    pub fn new(provider: ProviderRef, kind: ControlKind) -> Self {
        Self { provider, kind }
    }
}

impl Renderer for ParameterRenderer {
    fn render(&self, frame: &mut Frame, ctx: &RenderContext) {
        for index in 0..self.provider.size() {
            let param = self.provider.get(index);
            let id = ControlId::new(self.kind, index as u8);
            if !param.exists() {
                frame.set_value(id, 0.0);
                frame.set_text(0, index, "");
                frame.set_text(1, index, "");
                continue;
            }
            frame.set_value(id, param.modulated_value());
            frame.set_text(0, index, param.name());
            if !ctx.is_moving(id) {
                frame.set_text(1, index, param.display_value());
            }
        }
    }
}

/// One horizontal bar per parameter on a bitmap display
pub struct ParameterBars {
    provider: ProviderRef,
}

impl ParameterBars {
    pub fn new(provider: ProviderRef) -> Self {
        Self { provider }
    }
}

impl Renderer for ParameterBars {
    fn render(&self, frame: &mut Frame, _ctx: &RenderContext) {
        let count = self.provider.size().clamp(1, 8);
        let row_height = bitmap::HEIGHT / count;
        let canvas = frame.bitmap_mut();

        for index in 0..count {
            let param = self.provider.get(index);
            if !param.exists() {
                continue;
            }
            let top = index * row_height + 1;
            let height = row_height.saturating_sub(2).max(1);
            canvas.stroke_rect(0, top, bitmap::WIDTH, height, WHITE);

            let inner = bitmap::WIDTH - 4;
            let filled = (param.modulated_value() * inner as f64).round() as usize;
            canvas.fill_rect(2, top + 2, filled, height.saturating_sub(4), WHITE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debounce::KnobMovement;
    use crate::host::memory::MemoryParameter;
    use crate::host::{Parameter, ParameterRef};
    use crate::parameter::FixedParameterProvider;
    use crate::protocol::ColorRegistry;
    use std::sync::Arc;

    fn provider(values: &[f64]) -> (ProviderRef, Vec<Arc<MemoryParameter>>) {
        let params: Vec<Arc<MemoryParameter>> = values
            .iter()
            .enumerate()
            .map(|(i, v)| MemoryParameter::new(format!("P{}", i + 1), *v))
            .collect();
        let refs = params.iter().map(|p| Arc::clone(p) as ParameterRef).collect();
        (Arc::new(FixedParameterProvider::new(refs)), params)
    }

    #[test]
    fn test_knobs_drive_bound_parameters() {
        let (provider, params) = provider(&[0.5, 0.5]);
        let knobs = ParameterKnobs::new(provider, 0.01);
        let colors = ColorRegistry::default();
        let mut ctx = BindingContext::new(0, &colors);

        knobs.turn(ControlId::knob(0), 10, &mut ctx);
        knobs.set(ControlId::knob(1), 0.9, &mut ctx);
        knobs.turn(ControlId::knob(5), 3, &mut ctx);
        knobs.touch(ControlId::knob(1), true, &mut ctx);

        assert!((params[0].value() - 0.6).abs() < 1e-9);
        assert_eq!(params[1].value(), 0.9);
        assert!(params[1].is_touched());
        assert!(ctx.into_requests().is_empty());
    }

    #[test]
    fn test_renderer_fills_values_and_text() {
        let (provider, _params) = provider(&[0.25]);
        let renderer = ParameterRenderer::new(provider, ControlKind::Knob);
        let colors = ColorRegistry::default();
        let movement = KnobMovement::default();
        let ctx = RenderContext { now_ms: 0, colors: &colors, movement: &movement };

        let mut frame = Frame::new();
        renderer.render(&mut frame, &ctx);
        assert_eq!(frame.values.get(&ControlId::knob(0)), Some(&0.25));
        assert_eq!(frame.text.get(&(0, 0)).map(String::as_str), Some("P1"));
        assert_eq!(frame.text.get(&(1, 0)).map(String::as_str), Some("25%"));
    }

    #[test]
    fn test_value_text_waits_for_gesture_to_end() {
        let (provider, _params) = provider(&[0.25, 0.5]);
        let renderer = ParameterRenderer::new(provider, ControlKind::Knob);
        let colors = ColorRegistry::default();
        let mut movement = KnobMovement::new(100, 200);
        movement.tick(ControlId::knob(0), 0);
        let ctx = RenderContext { now_ms: 50, colors: &colors, movement: &movement };

        let mut frame = Frame::new();
        renderer.render(&mut frame, &ctx);
        assert_eq!(frame.text.get(&(0, 0)).map(String::as_str), Some("P1"));
        assert_eq!(frame.text.get(&(1, 0)), None);
        assert_eq!(frame.text.get(&(1, 1)).map(String::as_str), Some("50%"));
        assert_eq!(frame.values.get(&ControlId::knob(0)), Some(&0.25));
    }

    #[test]
    fn test_bars_draw_to_bitmap() {
        let (provider, _params) = provider(&[1.0, 0.0]);
        let bars = ParameterBars::new(provider);
        let colors = ColorRegistry::default();
        let movement = KnobMovement::default();
        let ctx = RenderContext { now_ms: 0, colors: &colors, movement: &movement };

        let mut frame = Frame::new();
        bars.render(&mut frame, &ctx);
        let canvas = frame.bitmap.unwrap();
        // Full bar in row 0, empty bar in row 1
        assert!(canvas.is_lit(64, 10));
        assert!(!canvas.is_lit(64, 42));
        assert!(canvas.is_lit(0, 33));
    }
}
