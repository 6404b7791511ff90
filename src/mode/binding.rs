//! Binding interfaces
//!
//! A Mode or View is assembled from small handler objects. All methods take
//! `&self` so handlers can be shared as `Arc<dyn ...>` between records;
//! handlers that keep state use interior mutability.
//!
//! Handlers run while the surface is dispatching and cannot reach the mode
//! managers directly. Mode switches and other surface-level effects are
//! queued on the [`BindingContext`] and applied once dispatch returns.

use crate::control::{ButtonEvent, ControlId};
use crate::debounce::KnobMovement;
use crate::protocol::{BitmapFrame, ColorIndex, ColorRegistry, LightInfo, SemanticColor};
use std::collections::BTreeMap;

/// Surface-level effect requested by a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceRequest {
    SetMode(String),
    TemporaryMode(String),
    RestoreMode,
    SetView(String),
    TemporaryView(String),
    RestoreView,
    /// Forget the device state and repaint everything on the next flush
    Repaint,
    /// Apply `request` after `delay_ms`
    Defer { delay_ms: u64, request: Box<SurfaceRequest> },
}

/// What a handler sees while handling input
pub struct BindingContext<'a> {
    pub now_ms: u64,
    pub colors: &'a ColorRegistry,
    requests: Vec<SurfaceRequest>,
}

impl<'a> BindingContext<'a> {
    pub fn new(now_ms: u64, colors: &'a ColorRegistry) -> Self {
        Self {
            now_ms,
            colors,
            requests: Vec::new(),
        }
    }

    pub fn request(&mut self, request: SurfaceRequest) {
        self.requests.push(request);
    }

    pub fn defer(&mut self, delay_ms: u64, request: SurfaceRequest) {
        self.requests.push(SurfaceRequest::Defer {
            delay_ms,
            request: Box::new(request),
        });
    }

    pub fn into_requests(self) -> Vec<SurfaceRequest> {
        self.requests
    }
}

/// What a renderer sees during a flush
pub struct RenderContext<'a> {
    pub now_ms: u64,
    pub colors: &'a ColorRegistry,
    pub movement: &'a KnobMovement,
}

impl RenderContext<'_> {
    /// Renderers may skip feedback for controls under a live gesture
    pub fn is_moving(&self, id: ControlId) -> bool {
        self.movement.is_moving(id)
    }

    pub fn resolve(&self, color: SemanticColor, id: ControlId) -> ColorIndex {
        self.colors.resolve(color, id)
    }

    pub fn light(&self, color: SemanticColor, id: ControlId) -> LightInfo {
        LightInfo::solid(self.resolve(color, id))
    }
}

/// Desired output state for one flush
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub lights: BTreeMap<ControlId, LightInfo>,
    /// Ring and motor fader positions, 0.0..=1.0
    pub values: BTreeMap<ControlId, f64>,
    /// `(line, cell)` -> text
    pub text: BTreeMap<(usize, usize), String>,
    /// Grid note -> light
    pub pads: BTreeMap<u8, LightInfo>,
    pub bitmap: Option<BitmapFrame>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_light(&mut self, id: ControlId, light: LightInfo) {
        self.lights.insert(id, light);
    }

    pub fn set_value(&mut self, id: ControlId, value: f64) {
        self.values.insert(id, value.clamp(0.0, 1.0));
    }

    pub fn set_text(&mut self, line: usize, cell: usize, text: impl Into<String>) {
        self.text.insert((line, cell), text.into());
    }

    pub fn set_pad(&mut self, grid_note: u8, light: LightInfo) {
        self.pads.insert(grid_note, light);
    }

    /// Bitmap canvas, created blank on first use
    pub fn bitmap_mut(&mut self) -> &mut BitmapFrame {
        self.bitmap.get_or_insert_with(BitmapFrame::new)
    }
}

/// Knobs and faders
pub trait KnobHandler: Send + Sync {
    /// Relative encoder steps
    fn turn(&self, id: ControlId, delta: i32, ctx: &mut BindingContext);

    /// Absolute position from a fader or absolute knob
    fn set(&self, id: ControlId, value: f64, ctx: &mut BindingContext);

    fn touch(&self, _id: ControlId, _touched: bool, _ctx: &mut BindingContext) {}
}

pub trait ButtonHandler: Send + Sync {
    /// Returns false when the button is not bound here
    fn button(&self, event: ButtonEvent, ctx: &mut BindingContext) -> bool;
}

pub trait Renderer: Send + Sync {
    fn render(&self, frame: &mut Frame, ctx: &RenderContext);
}

/// Pad grid drawing and dispatch for a View
pub trait GridBinding: Send + Sync {
    /// `velocity` is None on release
    fn pad(&self, grid_note: u8, velocity: Option<u8>, ctx: &mut BindingContext);

    fn pressure(&self, _grid_note: u8, _pressure: u8, _ctx: &mut BindingContext) {}

    fn draw(&self, frame: &mut Frame, ctx: &RenderContext);
}
