use super::*;
use crate::bindings::{ButtonMap, ParameterKnobs, ParameterRenderer, ToggleGridView};
use crate::clock::VirtualClock;
use crate::control::pads::PadBatch;
use crate::control::{ButtonAction, ControlKind, ControlSpec};
use crate::devices::{fire, launchpad, mcu, DeviceKind, DeviceProtocol};
use crate::error::CodecError;
use crate::host::memory::MemoryParameter;
use crate::host::{Parameter, ParameterRef};
use crate::parameter::FixedParameterProvider;
use crate::protocol::{ColorIndex, ColorRegistry, PadMatrix, SemanticColor, SysexFormat};
use crate::transport::MemorySink;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

fn surface(kind: DeviceKind) -> (ControlSurface, Arc<MemorySink>, Arc<VirtualClock>) {
    let sink = MemorySink::new();
    let clock = Arc::new(VirtualClock::new(0));
    let context = SurfaceContext::new(kind.protocol()).unwrap();
    let surface = ControlSurface::new(context, sink.clone(), clock.clone(), &TimingConfig::default());
    (surface, sink, clock)
}

fn counting_hook() -> (ErrorHook, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let hook: ErrorHook = Arc::new(move |_err: &SurfaceError| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (hook, count)
}

fn note_on(note: u8) -> [u8; 3] {
    [0x90, note, 0x7F]
}

fn note_off(note: u8) -> [u8; 3] {
    [0x80, note, 0x00]
}

struct FixedLights(Vec<(ControlId, LightInfo)>);

impl Renderer for FixedLights {
    fn render(&self, frame: &mut Frame, _ctx: &RenderContext) {
        for (id, light) in &self.0 {
            frame.set_light(*id, *light);
        }
    }
}

fn mixer_mode(param: &Arc<MemoryParameter>) -> Mode {
    let params: Vec<ParameterRef> = vec![Arc::clone(param) as ParameterRef];
    let provider = Arc::new(FixedParameterProvider::new(params));
    Mode::new()
        .with_knobs(Arc::new(ParameterKnobs::new(provider.clone(), 0.01)))
        .with_renderer(Arc::new(ParameterRenderer::new(provider, ControlKind::Knob)))
}

fn ring_messages(sent: &[Vec<u8>]) -> Vec<Vec<u8>> {
    sent.iter()
        .filter(|m| m.len() == 3 && m[0] == 0xB0 && m[1] == 0x30)
        .cloned()
        .collect()
}

#[test]
fn test_moving_knob_is_not_refreshed() {
    let (mut surface, sink, clock) = surface(DeviceKind::Mcu);
    let volume = MemoryParameter::new("Volume", 0.5);
    surface.modes_mut().register("mixer", mixer_mode(&volume));
    surface.request(SurfaceRequest::SetMode("mixer".into()));

    surface.flush();
    assert_eq!(ring_messages(&sink.take()), vec![vec![0xB0, 0x30, 0x26]]);

    // Ten steps clockwise on V-Pot 1
    clock.set(10);
    surface.handle_midi(&[0xB0, 0x10, 0x0A]);
    assert!((volume.value() - 0.6).abs() < 1e-9);

    clock.set(40);
    surface.flush();
    assert!(ring_messages(&sink.take()).is_empty());

    clock.set(190);
    surface.flush();
    assert!(ring_messages(&sink.take()).is_empty());

    // No tick for 200 ms: the next recheck clears the gesture
    clock.set(400);
    surface.flush();
    assert_eq!(ring_messages(&sink.take()), vec![vec![0xB0, 0x30, 0x27]]);
}

#[test]
fn test_failed_send_is_reported_and_retried() {
    let (mut surface, sink, _clock) = surface(DeviceKind::Mcu);
    let (hook, errors) = counting_hook();
    surface.set_error_hook(hook);

    let play = ControlId::button(mcu::buttons::PLAY);
    surface.add_global_renderer(Arc::new(ButtonMap::new().light(play, || SemanticColor::Play)));

    sink.set_failing(true);
    surface.flush();
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert!(sink.take().is_empty());

    sink.set_failing(false);
    surface.flush();
    assert_eq!(sink.take(), vec![vec![0x90, 0x5E, 0x7F]]);
    assert_eq!(errors.load(Ordering::SeqCst), 1);

    surface.flush();
    assert!(sink.take().is_empty());
}

#[test]
fn test_unrecognised_input_is_dropped() {
    let (mut surface, sink, _clock) = surface(DeviceKind::Mcu);
    let (hook, errors) = counting_hook();
    surface.set_error_hook(hook);
    surface.modes_mut().register("mixer", Mode::new());
    surface.request(SurfaceRequest::SetMode("mixer".into()));

    surface.handle_midi(&[0xF0, 0x01, 0x02, 0xF7]);
    surface.handle_midi(&[0xF0, 0x00, 0x00, 0x66]);
    surface.handle_midi(&[0x42]);
    surface.handle_midi(&[]);
    surface.handle_midi(&[0xB5, 0x7F, 0x01]);

    assert_eq!(surface.modes().effective_id(), Some("mixer"));
    assert!(sink.take().is_empty());
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

#[test]
fn test_global_buttons_win_and_momentary_mode_restores() {
    let (mut surface, _sink, _clock) = surface(DeviceKind::Mcu);
    let shift = ControlId::button(mcu::buttons::SHIFT);
    let play = ControlId::button(mcu::buttons::PLAY);

    let mode_buttons = ButtonMap::new()
        .on(shift, ButtonAction::Press, SurfaceRequest::SetMode("never".into()))
        .on(play, ButtonAction::Press, SurfaceRequest::SetMode("transport".into()));
    surface.modes_mut().register("mixer", Mode::new().with_buttons(Arc::new(mode_buttons)));
    surface.modes_mut().register("shift", Mode::new());
    surface.modes_mut().register("transport", Mode::new());
    surface.add_global_buttons(Arc::new(ButtonMap::new().momentary_mode(shift, "shift")));
    surface.request(SurfaceRequest::SetMode("mixer".into()));

    surface.handle_midi(&note_on(mcu::buttons::SHIFT));
    assert_eq!(surface.modes().effective_id(), Some("shift"));
    assert_eq!(surface.modes().active_id(), Some("mixer"));

    surface.handle_midi(&note_off(mcu::buttons::SHIFT));
    assert_eq!(surface.modes().effective_id(), Some("mixer"));

    surface.handle_midi(&note_on(mcu::buttons::PLAY));
    assert_eq!(surface.modes().effective_id(), Some("transport"));
}

#[test]
fn test_long_and_short_press() {
    let (mut surface, _sink, clock) = surface(DeviceKind::Mcu);
    let f1 = ControlId::button(mcu::buttons::F1);
    for id in ["a", "long", "short"] {
        surface.modes_mut().register(id, Mode::new());
    }
    surface.add_global_buttons(Arc::new(
        ButtonMap::new()
            .on(f1, ButtonAction::LongPress, SurfaceRequest::SetMode("long".into()))
            .on(f1, ButtonAction::ShortPress, SurfaceRequest::SetMode("short".into())),
    ));
    surface.request(SurfaceRequest::SetMode("a".into()));

    surface.handle_midi(&note_on(mcu::buttons::F1));
    clock.set(399);
    surface.flush();
    assert_eq!(surface.modes().effective_id(), Some("a"));
    clock.set(450);
    surface.flush();
    assert_eq!(surface.modes().effective_id(), Some("long"));
    surface.handle_midi(&note_off(mcu::buttons::F1));
    assert_eq!(surface.modes().effective_id(), Some("long"));

    clock.set(1000);
    surface.handle_midi(&note_on(mcu::buttons::F1));
    clock.set(1100);
    surface.handle_midi(&note_off(mcu::buttons::F1));
    assert_eq!(surface.modes().effective_id(), Some("short"));

    // The cancelled timer never fires
    clock.set(2000);
    surface.flush();
    assert_eq!(surface.modes().effective_id(), Some("short"));
}

#[test]
fn test_timing_update_changes_long_press() {
    let (mut surface, _sink, clock) = surface(DeviceKind::Mcu);
    let f1 = ControlId::button(mcu::buttons::F1);
    surface.modes_mut().register("a", Mode::new());
    surface.modes_mut().register("long", Mode::new());
    surface.add_global_buttons(Arc::new(ButtonMap::new().on(
        f1,
        ButtonAction::LongPress,
        SurfaceRequest::SetMode("long".into()),
    )));
    surface.request(SurfaceRequest::SetMode("a".into()));

    let timing = TimingConfig {
        long_press_ms: 100,
        ..TimingConfig::default()
    };
    surface.apply_timing(&timing);

    surface.handle_midi(&note_on(mcu::buttons::F1));
    clock.set(120);
    surface.flush();
    assert_eq!(surface.modes().effective_id(), Some("long"));
}

#[test]
fn test_deferred_request() {
    let (mut surface, _sink, clock) = surface(DeviceKind::Mcu);
    let play = ControlId::button(mcu::buttons::PLAY);
    surface.modes_mut().register("a", Mode::new());
    surface.modes_mut().register("b", Mode::new());
    surface.add_global_buttons(Arc::new(ButtonMap::new().on_fn(
        play,
        ButtonAction::Press,
        |ctx| ctx.defer(500, SurfaceRequest::SetMode("b".into())),
    )));
    surface.request(SurfaceRequest::SetMode("a".into()));

    surface.handle_midi(&note_on(mcu::buttons::PLAY));
    clock.set(100);
    surface.flush();
    assert_eq!(surface.modes().effective_id(), Some("a"));
    clock.set(500);
    surface.flush();
    assert_eq!(surface.modes().effective_id(), Some("b"));
}

#[test]
fn test_text_cells_sent_once_until_keep_alive() {
    let (mut surface, sink, clock) = surface(DeviceKind::Mcu);
    let volume = MemoryParameter::new("Volume", 0.25);
    surface.modes_mut().register("mixer", mixer_mode(&volume));
    surface.request(SurfaceRequest::SetMode("mixer".into()));

    let lcd = |sent: &[Vec<u8>]| {
        sent.iter()
            .filter(|m| m.starts_with(&[0xF0, 0x00, 0x00, 0x66, 0x14, mcu::LCD_MESSAGE]))
            .count()
    };

    surface.flush();
    // Name and value cells of the one bound parameter
    assert_eq!(lcd(&sink.take()), 2);

    clock.set(100);
    surface.flush();
    assert_eq!(lcd(&sink.take()), 0);

    volume.set_value(0.75);
    clock.set(200);
    surface.flush();
    assert_eq!(lcd(&sink.take()), 1);

    clock.set(3300);
    surface.flush();
    assert_eq!(lcd(&sink.take()), 2);
}

#[test]
fn test_pads_follow_view_layout() {
    let (mut surface, sink, _clock) = surface(DeviceKind::Launchpad);
    let play_grid = Arc::new(ToggleGridView::new(SemanticColor::On));
    let drum_grid = Arc::new(ToggleGridView::new(SemanticColor::On));
    surface
        .views_mut()
        .register("play", View::new(GridLayout::Linear).with_grid(play_grid.clone()));
    surface
        .views_mut()
        .register("drums", View::new(launchpad::DRUM_LAYOUT).with_grid(drum_grid.clone()));
    surface.request(SurfaceRequest::SetView("play".into()));

    // Bottom-left pad is grid note 36
    surface.handle_midi(&note_on(11));
    surface.handle_midi(&note_off(11));
    assert!(play_grid.is_on(36));

    surface.flush();
    let sent = sink.take();
    assert_eq!(sent.len(), 1);
    // Header, 64 three-byte records, terminator
    assert_eq!(sent[0].len(), 7 + 64 * 3 + 1);
    let on = surface.context().colors.resolve(SemanticColor::On, ControlId::pad(0));
    let on = launchpad::native_color(on).unwrap();
    assert!(sent[0][7..].chunks(3).any(|r| r == [0, 11, on]));

    surface.flush();
    assert!(sink.take().is_empty());

    surface.request(SurfaceRequest::SetView("drums".into()));
    surface.handle_midi(&note_on(15));
    assert!(drum_grid.is_on(52));
    assert!(!play_grid.is_on(40));

    surface.flush();
    let sent = sink.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].len(), 7 + 64 * 3 + 1);
}

#[test]
fn test_failed_pad_batch_is_requeued() {
    let (mut surface, sink, _clock) = surface(DeviceKind::Launchpad);
    let (hook, errors) = counting_hook();
    surface.set_error_hook(hook);
    let grid = Arc::new(ToggleGridView::new(SemanticColor::On));
    surface
        .views_mut()
        .register("play", View::new(GridLayout::Linear).with_grid(grid));
    surface.request(SurfaceRequest::SetView("play".into()));

    sink.set_failing(true);
    surface.flush();
    assert_eq!(errors.load(Ordering::SeqCst), 1);

    sink.set_failing(false);
    surface.flush();
    let sent = sink.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].len(), 7 + 64 * 3 + 1);
}

/// Launchpad whose pad encoder can be told to fail
struct FailingPads {
    inner: launchpad::LaunchpadProtocol,
    failing: AtomicBool,
}

impl DeviceProtocol for FailingPads {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn port_pattern(&self) -> &'static str {
        self.inner.port_pattern()
    }

    fn controls(&self) -> Vec<ControlSpec> {
        self.inner.controls()
    }

    fn sysex_format(&self) -> &SysexFormat {
        self.inner.sysex_format()
    }

    fn colors(&self) -> ColorRegistry {
        self.inner.colors()
    }

    fn pad_matrix(&self) -> Option<PadMatrix> {
        self.inner.pad_matrix()
    }

    fn pad_note(&self, row: usize, column: usize) -> Option<DeviceNote> {
        self.inner.pad_note(row, column)
    }

    fn encode_light(
        &self,
        id: ControlId,
        light: &LightInfo,
        colors: &ColorRegistry,
    ) -> Result<Option<Vec<u8>>, CodecError> {
        self.inner.encode_light(id, light, colors)
    }

    fn encode_pads(
        &self,
        batch: &PadBatch,
        colors: &ColorRegistry,
    ) -> Result<Vec<Vec<u8>>, CodecError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CodecError::PayloadTooLong { len: batch.len() * 3, max: 0 });
        }
        self.inner.encode_pads(batch, colors)
    }
}

#[test]
fn test_pad_batch_is_kept_when_encoding_fails() {
    let protocol = Arc::new(FailingPads {
        inner: launchpad::LaunchpadProtocol::new(),
        failing: AtomicBool::new(true),
    });
    let sink = MemorySink::new();
    let context = SurfaceContext::new(protocol.clone()).unwrap();
    let mut surface = ControlSurface::new(
        context,
        sink.clone(),
        Arc::new(VirtualClock::new(0)),
        &TimingConfig::default(),
    );
    let (hook, errors) = counting_hook();
    surface.set_error_hook(hook);
    let grid = Arc::new(ToggleGridView::new(SemanticColor::On));
    surface
        .views_mut()
        .register("play", View::new(GridLayout::Linear).with_grid(grid));
    surface.request(SurfaceRequest::SetView("play".into()));

    surface.flush();
    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert!(sink.take().is_empty());

    protocol.failing.store(false, Ordering::SeqCst);
    surface.flush();
    let sent = sink.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].len(), 7 + 64 * 3 + 1);
}

#[test]
fn test_fire_blinks_in_software() {
    let (mut surface, sink, clock) = surface(DeviceKind::Fire);
    let play = ControlId::button(fire::buttons::PLAY);
    let light = LightInfo::blinking(ColorIndex(8), ColorIndex::OFF, true);
    surface.add_global_renderer(Arc::new(FixedLights(vec![(play, light)])));

    surface.flush();
    assert_eq!(sink.take(), vec![vec![0xB0, 0x33, 0x03]]);

    clock.set(60);
    surface.flush();
    assert!(sink.take().is_empty());

    clock.set(125);
    surface.flush();
    assert_eq!(sink.take(), vec![vec![0xB0, 0x33, 0x00]]);

    clock.set(250);
    surface.flush();
    assert_eq!(sink.take(), vec![vec![0xB0, 0x33, 0x03]]);
}

#[test]
fn test_initialize_sends_init_and_repaints() {
    let (mut surface, sink, _clock) = surface(DeviceKind::Launchpad);
    surface.initialize();
    assert_eq!(
        sink.take(),
        vec![vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0E, 0x0E, 0x01, 0xF7]]
    );
}

#[test]
fn test_touched_fader_is_not_driven() {
    let (mut surface, sink, clock) = surface(DeviceKind::Mcu);
    let level = MemoryParameter::new("Level", 1.0);
    let params: Vec<ParameterRef> = vec![Arc::clone(&level) as ParameterRef];
    let provider = Arc::new(FixedParameterProvider::new(params));
    surface.modes_mut().register(
        "faders",
        Mode::new()
            .with_knobs(Arc::new(ParameterKnobs::new(provider.clone(), 0.01)))
            .with_renderer(Arc::new(ParameterRenderer::new(provider, ControlKind::Fader))),
    );
    surface.request(SurfaceRequest::SetMode("faders".into()));

    let fader_moves = |sent: Vec<Vec<u8>>| sent.into_iter().filter(|m| m[0] == 0xE0).count();

    surface.handle_midi(&note_on(0x68));
    assert!(level.is_touched());
    level.set_value(0.2);
    clock.set(1000);
    surface.flush();
    assert_eq!(fader_moves(sink.take()), 0);

    surface.handle_midi(&note_off(0x68));
    clock.set(1300);
    surface.flush();
    assert_eq!(fader_moves(sink.take()), 1);
}
