//! Control surface
//!
//! Ties one device profile to the mode and view managers. Input is decoded
//! through the control registry and dispatched to the effective Mode (knobs,
//! buttons) and View (pads). [`ControlSurface::flush`] renders both into a
//! [`Frame`] and transmits whatever differs from what the device shows.
//!
//! Transmission failures stop at the send boundary: they go to the error hook
//! and the cache is left untouched, so the next flush retries.

#[cfg(test)]
mod tests;

use crate::clock::Clock;
use crate::config::TimingConfig;
use crate::control::{
    ButtonEvent, ButtonTracker, ControlId, ControlRegistry, InputEvent, PadGridLights, Trigger,
};
use crate::debounce::KnobMovement;
use crate::devices::SurfaceContext;
use crate::error::{log_error_hook, ErrorHook, SurfaceError};
use crate::midi::{format_hex, MidiMessage};
use crate::mode::{
    BindingContext, ButtonHandler, Frame, GridBinding, KnobHandler, Mode, ModeManager,
    RenderContext, Renderer, SurfaceRequest, View, ViewManager,
};
use crate::protocol::{BitmapDisplay, DeviceNote, GridLayout, LightInfo, TextDisplay};
use crate::tasks::TaskQueue;
use crate::transport::MidiSink;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Software blink half-periods for devices without hardware blink
const FAST_BLINK_MS: u64 = 125;
const SLOW_BLINK_MS: u64 = 250;

/// Sink plus error hook
struct Output {
    sink: Arc<dyn MidiSink>,
    error_hook: ErrorHook,
}

impl Output {
    fn report(&self, err: SurfaceError) {
        (self.error_hook)(&err);
    }

    /// Returns whether the message went out
    fn send(&self, bytes: &[u8]) -> bool {
        match self.sink.send(bytes) {
            Ok(()) => true,
            Err(e) => {
                self.report(e.into());
                false
            }
        }
    }
}

/// Alternate between the two colours of a blinking light
fn software_blink(light: LightInfo, now_ms: u64) -> LightInfo {
    match light.blink {
        Some(other) => {
            let period = if light.fast { FAST_BLINK_MS } else { SLOW_BLINK_MS };
            let color = if (now_ms / period) % 2 == 0 { light.color } else { other };
            LightInfo::solid(color)
        }
        None => light,
    }
}

pub struct ControlSurface {
    context: Arc<SurfaceContext>,
    clock: Arc<dyn Clock>,
    output: Output,
    registry: ControlRegistry,
    buttons: ButtonTracker,
    movement: KnobMovement,
    /// Touch-sensitive controls currently under a finger
    touched: HashSet<ControlId>,
    pads: PadGridLights,
    text: Option<TextDisplay>,
    bitmap: Option<BitmapDisplay>,
    modes: ModeManager,
    views: ViewManager,
    global_buttons: Vec<Arc<dyn ButtonHandler>>,
    global_renderers: Vec<Arc<dyn Renderer>>,
    deferred: TaskQueue<SurfaceRequest>,
    /// Grid layout the pad cache was built for
    shown_layout: Option<GridLayout>,
}

impl ControlSurface {
    pub fn new(
        context: Arc<SurfaceContext>,
        sink: Arc<dyn MidiSink>,
        clock: Arc<dyn Clock>,
        timing: &TimingConfig,
    ) -> Self {
        let protocol = &context.protocol;
        let keep_alive = timing.keep_alive_ms;

        let registry = ControlRegistry::new(&protocol.controls(), keep_alive);
        let text = protocol
            .text_display()
            .map(|(layout, charset)| TextDisplay::new(layout, charset, keep_alive));
        let bitmap = protocol
            .bitmap_layout()
            .map(|layout| BitmapDisplay::new(layout, keep_alive));
        info!("Control surface ready: {}", protocol.name());

        Self {
            registry,
            text,
            bitmap,
            clock,
            output: Output {
                sink,
                error_hook: log_error_hook(),
            },
            buttons: ButtonTracker::new(timing.long_press_ms),
            movement: KnobMovement::new(timing.debounce_recheck_ms, timing.debounce_timeout_ms),
            touched: HashSet::new(),
            pads: PadGridLights::new(keep_alive),
            modes: ModeManager::new("mode"),
            views: ViewManager::new("view"),
            global_buttons: Vec::new(),
            global_renderers: Vec::new(),
            deferred: TaskQueue::new(),
            shown_layout: None,
            context,
        }
    }

    pub fn context(&self) -> &Arc<SurfaceContext> {
        &self.context
    }

    pub fn modes(&self) -> &ModeManager {
        &self.modes
    }

    pub fn modes_mut(&mut self) -> &mut ModeManager {
        &mut self.modes
    }

    pub fn views(&self) -> &ViewManager {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut ViewManager {
        &mut self.views
    }

    /// Replace the default (logging) error hook
    pub fn set_error_hook(&mut self, hook: ErrorHook) {
        self.output.error_hook = hook;
    }

    /// Buttons handled before the effective Mode sees them
    pub fn add_global_buttons(&mut self, handler: Arc<dyn ButtonHandler>) {
        self.global_buttons.push(handler);
    }

    /// Rendered on every flush, underneath the effective Mode
    pub fn add_global_renderer(&mut self, renderer: Arc<dyn Renderer>) {
        self.global_renderers.push(renderer);
    }

    /// Send the device's startup messages and schedule a full repaint
    pub fn initialize(&mut self) {
        match self.context.protocol.init_messages() {
            Ok(messages) => {
                let sent = messages.iter().filter(|m| self.output.send(m)).count();
                debug!("Sent {}/{} init messages", sent, messages.len());
            }
            Err(e) => self.output.report(e.into()),
        }
        self.repaint();
    }

    /// Apply reloaded timing to the running surface
    pub fn apply_timing(&mut self, timing: &TimingConfig) {
        self.registry.set_keep_alive(timing.keep_alive_ms);
        self.pads.set_keep_alive(timing.keep_alive_ms);
        if let Some(text) = self.text.as_mut() {
            text.set_keep_alive(timing.keep_alive_ms);
        }
        if let Some(bitmap) = self.bitmap.as_mut() {
            bitmap.set_keep_alive(timing.keep_alive_ms);
        }
        self.movement
            .set_timing(timing.debounce_recheck_ms, timing.debounce_timeout_ms);
        self.buttons.set_long_press(timing.long_press_ms);
        info!(
            "Timing updated: keep-alive {} ms, debounce {}/{} ms, long press {} ms",
            timing.keep_alive_ms,
            timing.debounce_recheck_ms,
            timing.debounce_timeout_ms,
            timing.long_press_ms
        );
    }

    /// Forget what the device shows; everything is re-sent on the next flush
    pub fn repaint(&mut self) {
        self.registry.invalidate();
        self.pads.reset();
        if let Some(text) = self.text.as_mut() {
            text.invalidate();
        }
        if let Some(bitmap) = self.bitmap.as_mut() {
            bitmap.invalidate();
        }
        debug!("Full repaint scheduled");
    }

    /// Raw bytes from the input port
    pub fn handle_midi(&mut self, data: &[u8]) {
        let Some(msg) = MidiMessage::parse(data) else {
            debug!("Failed to parse MIDI: {}", format_hex(data));
            return;
        };

        if let MidiMessage::SysEx { data } = &msg {
            match self.context.protocol.describe_sysex(data) {
                Some(what) => debug!("<- {}", what),
                None => debug!("Dropping unrecognised SysEx: {}", format_hex(data)),
            }
            return;
        }

        match self.registry.decode(&msg) {
            Some(event) => self.handle_input(event),
            None => trace!("No control for {}", msg),
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) {
        let now = self.clock.now_ms();
        let context = Arc::clone(&self.context);
        let mut ctx = BindingContext::new(now, &context.colors);

        match event {
            InputEvent::ButtonDown(id) => {
                let trigger = self.trigger(id);
                if let Some(event) = self.buttons.press(id, trigger, now) {
                    self.dispatch_button(event, &mut ctx);
                }
            }
            InputEvent::ButtonUp(id) => {
                let trigger = self.trigger(id);
                if let Some(event) = self.buttons.release(id, trigger) {
                    self.dispatch_button(event, &mut ctx);
                }
            }
            InputEvent::KnobDelta(id, delta) => {
                self.movement.tick(id, now);
                if let Some(knobs) = self.knobs() {
                    knobs.turn(id, delta, &mut ctx);
                }
            }
            InputEvent::KnobAbsolute(id, value) | InputEvent::Fader(id, value) => {
                self.movement.tick(id, now);
                if let Some(knobs) = self.knobs() {
                    knobs.set(id, value, &mut ctx);
                }
            }
            InputEvent::Touch(id, touched) => {
                if touched {
                    self.touched.insert(id);
                    self.movement.tick(id, now);
                } else {
                    self.touched.remove(&id);
                }
                if let Some(knobs) = self.knobs() {
                    knobs.touch(id, touched, &mut ctx);
                }
            }
            InputEvent::PadDown(note, velocity) => {
                if let Some((grid_note, grid)) = self.grid_target(note) {
                    grid.pad(grid_note, Some(velocity), &mut ctx);
                }
            }
            InputEvent::PadUp(note) => {
                if let Some((grid_note, grid)) = self.grid_target(note) {
                    grid.pad(grid_note, None, &mut ctx);
                }
            }
            InputEvent::PadPressure(note, pressure) => {
                if let Some((grid_note, grid)) = self.grid_target(note) {
                    grid.pressure(grid_note, pressure, &mut ctx);
                }
            }
        }

        let requests = ctx.into_requests();
        self.apply_requests(requests, now);
    }

    fn trigger(&self, id: ControlId) -> Trigger {
        self.registry
            .spec(id)
            .map(|spec| spec.trigger)
            .unwrap_or_default()
    }

    fn knobs(&self) -> Option<Arc<dyn KnobHandler>> {
        self.modes.effective().and_then(Mode::knobs).cloned()
    }

    /// Global handlers first, then the effective Mode
    fn dispatch_button(&self, event: ButtonEvent, ctx: &mut BindingContext) {
        if self.global_buttons.iter().any(|h| h.button(event, ctx)) {
            return;
        }
        let handled = self
            .modes
            .effective()
            .and_then(Mode::buttons)
            .is_some_and(|h| h.button(event, ctx));
        if !handled {
            trace!("{:?} on {} not bound", event.action, event.id);
        }
    }

    fn grid_target(&self, note: DeviceNote) -> Option<(u8, Arc<dyn GridBinding>)> {
        let view = self.views.effective()?;
        let grid = view.grid()?;
        let Some(grid_note) = self
            .context
            .grid(view.layout())
            .and_then(|table| table.translate_to_grid(note))
        else {
            trace!("Note {} on channel {} is outside the pad grid", note.note, note.channel);
            return None;
        };
        Some((grid_note, Arc::clone(grid)))
    }

    /// Apply a surface-level request immediately
    pub fn request(&mut self, request: SurfaceRequest) {
        let now = self.clock.now_ms();
        self.apply_requests(vec![request], now);
    }

    fn apply_requests(&mut self, requests: Vec<SurfaceRequest>, now_ms: u64) {
        for request in requests {
            match request {
                SurfaceRequest::SetMode(id) => {
                    self.modes.set_active(&id);
                }
                SurfaceRequest::TemporaryMode(id) => {
                    self.modes.set_temporary(&id);
                }
                SurfaceRequest::RestoreMode => {
                    self.modes.restore();
                }
                SurfaceRequest::SetView(id) => {
                    self.views.set_active(&id);
                    self.sync_layout();
                }
                SurfaceRequest::TemporaryView(id) => {
                    self.views.set_temporary(&id);
                    self.sync_layout();
                }
                SurfaceRequest::RestoreView => {
                    self.views.restore();
                    self.sync_layout();
                }
                SurfaceRequest::Repaint => self.repaint(),
                SurfaceRequest::Defer { delay_ms, request } => {
                    self.deferred.schedule(now_ms, delay_ms, *request);
                }
            }
        }
    }

    /// Reset the pad cache when the effective View uses another note layout
    fn sync_layout(&mut self) {
        let layout = self.views.effective().map(View::layout);
        if layout != self.shown_layout {
            debug!("Pad layout {:?} -> {:?}", self.shown_layout, layout);
            self.pads.reset();
            self.shown_layout = layout;
        }
    }

    /// Run long presses, debounce rechecks and deferred requests that are due
    pub fn run_due_tasks(&mut self) {
        let now = self.clock.now_ms();
        let context = Arc::clone(&self.context);
        let mut ctx = BindingContext::new(now, &context.colors);

        for event in self.buttons.run_due(now) {
            self.dispatch_button(event, &mut ctx);
        }
        for id in self.movement.run_due(now) {
            trace!("{} settled", id);
        }

        let requests = ctx.into_requests();
        self.apply_requests(requests, now);
        let deferred = self.deferred.take_due(now);
        self.apply_requests(deferred, now);
    }

    /// Render the effective Mode and View and send what changed
    pub fn flush(&mut self) {
        self.run_due_tasks();
        self.sync_layout();

        let now = self.clock.now_ms();
        let frame = self.render(now);
        self.send_lights(&frame, now);
        self.send_values(&frame, now);
        self.send_text(&frame, now);
        self.send_bitmap(&frame, now);
        self.send_pads(&frame, now);
    }

    fn render(&self, now_ms: u64) -> Frame {
        let ctx = RenderContext {
            now_ms,
            colors: &self.context.colors,
            movement: &self.movement,
        };
        let mut frame = Frame::new();
        for renderer in &self.global_renderers {
            renderer.render(&mut frame, &ctx);
        }
        if let Some(mode) = self.modes.effective() {
            for renderer in mode.renderers() {
                renderer.render(&mut frame, &ctx);
            }
        }
        if let Some(grid) = self.views.effective().and_then(View::grid) {
            grid.draw(&mut frame, &ctx);
        }
        frame
    }

    fn displayed(&self, light: LightInfo, now_ms: u64) -> LightInfo {
        if self.context.protocol.hardware_blink() {
            light
        } else {
            software_blink(light, now_ms)
        }
    }

    fn send_lights(&mut self, frame: &Frame, now_ms: u64) {
        let context = Arc::clone(&self.context);
        for (&id, &light) in &frame.lights {
            let light = self.displayed(light, now_ms);
            if !self.registry.light_needs_update(id, &light, now_ms) {
                continue;
            }
            match context.protocol.encode_light(id, &light, &context.colors) {
                Ok(Some(bytes)) => {
                    if self.output.send(&bytes) {
                        self.registry.mark_light_sent(id, light, now_ms);
                    }
                }
                Ok(None) => {}
                Err(e) => self.output.report(e.into()),
            }
        }
    }

    fn send_values(&mut self, frame: &Frame, now_ms: u64) {
        let protocol = Arc::clone(&self.context.protocol);
        for (&id, &value) in &frame.values {
            if self.movement.is_moving(id) || self.touched.contains(&id) {
                trace!("{} under a gesture, feedback held back", id);
                continue;
            }
            let Some(wire) = protocol.value_to_wire(id, value) else {
                continue;
            };
            if !self.registry.value_needs_update(id, wire, now_ms) {
                continue;
            }
            let Some(bytes) = protocol.encode_value(id, wire) else {
                continue;
            };
            if self.output.send(&bytes) {
                self.registry.mark_value_sent(id, wire, now_ms);
            }
        }
    }

    fn send_text(&mut self, frame: &Frame, now_ms: u64) {
        let Some(display) = self.text.as_mut() else {
            return;
        };
        let protocol = &self.context.protocol;
        let layout = display.layout();
        for (&(line, cell), text) in &frame.text {
            let Some(chars) = display.prepare(line, cell, text, now_ms) else {
                continue;
            };
            match protocol.encode_text(layout, line, cell, &chars) {
                Ok(Some(bytes)) => {
                    if self.output.send(&bytes) {
                        display.mark_sent(line, cell, chars, now_ms);
                    }
                }
                Ok(None) => {}
                Err(e) => self.output.report(e.into()),
            }
        }
    }

    fn send_bitmap(&mut self, frame: &Frame, now_ms: u64) {
        let (Some(display), Some(canvas)) = (self.bitmap.as_mut(), frame.bitmap.as_ref()) else {
            return;
        };
        let Some(packed) = display.prepare(canvas, now_ms) else {
            return;
        };
        match self.context.protocol.encode_bitmap(&packed) {
            Ok(Some(bytes)) => {
                if self.output.send(&bytes) {
                    display.mark_sent(packed, now_ms);
                }
            }
            Ok(None) => {}
            Err(e) => self.output.report(e.into()),
        }
    }

    fn send_pads(&mut self, frame: &Frame, now_ms: u64) {
        let context = Arc::clone(&self.context);
        let Some(grid) = self.shown_layout.and_then(|layout| context.grid(layout)) else {
            return;
        };

        for (&grid_note, &light) in &frame.pads {
            match grid.translate_to_controller(grid_note) {
                Some(pad) => self.pads.light(pad, self.displayed(light, now_ms)),
                None => trace!("Grid note {} has no pad", grid_note),
            }
        }

        let Some(batch) = self.pads.flush(now_ms) else {
            return;
        };
        match context.protocol.encode_pads(&batch, &context.colors) {
            Ok(messages) => {
                if messages.iter().all(|m| self.output.send(m)) {
                    self.pads.commit(&batch, now_ms);
                } else {
                    self.pads.requeue(batch);
                }
            }
            Err(e) => {
                self.pads.requeue(batch);
                self.output.report(e.into());
            }
        }
    }
}
