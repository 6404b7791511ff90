//! Default layout for the bundled device profiles
//!
//! Two modes ("mixer" on track volumes, "device" on the selected device's
//! parameters) and, on devices with pads, three views ("play", "drum",
//! "toggle"). Navigation buttons page the bank of whichever mode is active.

use crate::bindings::{
    ButtonMap, ParameterBars, ParameterKnobs, ParameterRenderer, PlayView, ToggleGridView,
};
use crate::config::BankConfig;
use crate::control::{ButtonAction, ControlId, ControlKind};
use crate::devices::{fire, launchpad, mcu, DeviceKind};
use crate::host::memory::MemoryHost;
use crate::mode::{BindingContext, KnobHandler, Mode, SurfaceRequest, View};
use crate::parameter::ParameterBank;
use crate::protocol::{GridLayout, SemanticColor};
use crate::surface::ControlSurface;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;

pub const MIXER_MODE: &str = "mixer";
pub const DEVICE_MODE: &str = "device";
pub const PLAY_VIEW: &str = "play";
pub const DRUM_VIEW: &str = "drum";
pub const TOGGLE_VIEW: &str = "toggle";

/// Name of the active mode or view, kept current by activation hooks
#[derive(Clone, Default)]
pub struct Selection(Arc<RwLock<String>>);

impl Selection {
    fn hook(&self, id: &'static str) -> impl Fn() + Send + Sync + 'static {
        let current = Arc::clone(&self.0);
        move || *current.write() = id.to_string()
    }

    pub fn get(&self) -> String {
        self.0.read().clone()
    }

    pub fn is(&self, id: &str) -> bool {
        *self.0.read() == id
    }

    /// Lit when `id` is selected
    fn light(&self, id: &'static str) -> impl Fn() -> SemanticColor + Send + Sync + 'static {
        let selection = self.clone();
        move || {
            if selection.is(id) {
                SemanticColor::Selected
            } else {
                SemanticColor::Dim
            }
        }
    }
}

/// Handles kept by the caller after installing the layout
pub struct DefaultLayout {
    pub mixer: Arc<ParameterBank>,
    pub device: Arc<ParameterBank>,
    pub mode: Selection,
    pub view: Selection,
}

impl DefaultLayout {
    /// Bank of the active mode
    pub fn active_bank(&self) -> &Arc<ParameterBank> {
        if self.mode.is(DEVICE_MODE) {
            &self.device
        } else {
            &self.mixer
        }
    }
}

/// Register modes, views and navigation buttons for `kind` and select the defaults
pub fn install(
    surface: &mut ControlSurface,
    host: &MemoryHost,
    kind: DeviceKind,
    bank: &BankConfig,
) -> Arc<DefaultLayout> {
    // The Fire has four parameter knobs next to its select encoder
    let page_size = match kind {
        DeviceKind::Fire => bank.page_size.min(fire::PARAMETER_KNOBS as usize),
        _ => bank.page_size,
    };
    let layout = Arc::new(DefaultLayout {
        mixer: ParameterBank::new(host.mixer.clone(), page_size),
        device: ParameterBank::new(host.device.clone(), page_size),
        mode: Selection::default(),
        view: Selection::default(),
    });

    for (id, params) in [(MIXER_MODE, &layout.mixer), (DEVICE_MODE, &layout.device)] {
        let knobs = ParameterKnobs::new(params.clone(), bank.knob_step);
        let mut mode = Mode::new()
            .with_renderer(Arc::new(ParameterRenderer::new(params.clone(), ControlKind::Knob)))
            .on_activate(layout.mode.hook(id));
        match kind {
            DeviceKind::Mcu if id == MIXER_MODE => {
                let faders = ParameterRenderer::new(params.clone(), ControlKind::Fader);
                mode = mode.with_knobs(Arc::new(knobs)).with_renderer(Arc::new(faders));
            }
            DeviceKind::Fire => {
                let select = ScrollEncoder {
                    encoder: ControlId::knob(fire::SELECT_KNOB),
                    bank: params.clone(),
                    knobs,
                };
                mode = mode
                    .with_knobs(Arc::new(select))
                    .with_renderer(Arc::new(ParameterBars::new(params.clone())));
            }
            _ => mode = mode.with_knobs(Arc::new(knobs)),
        }
        surface.modes_mut().register(id, mode);
    }

    let has_pads = surface.context().protocol.pad_matrix().is_some();
    if has_pads {
        let drum_layout = match kind {
            DeviceKind::Launchpad => launchpad::DRUM_LAYOUT,
            _ => GridLayout::InterleavedHalves,
        };
        let play = PlayView::new(host.notes.clone(), 0, 0);
        // Drums on MIDI channel 10
        let drums = PlayView::new(host.notes.clone(), 9, 0);
        let toggles = ToggleGridView::new(SemanticColor::Selected);
        let views = [
            (PLAY_VIEW, View::new(GridLayout::Linear).with_grid(Arc::new(play))),
            (DRUM_VIEW, View::new(drum_layout).with_grid(Arc::new(drums))),
            (TOGGLE_VIEW, View::new(GridLayout::Linear).with_grid(Arc::new(toggles))),
        ];
        for (id, view) in views {
            surface.views_mut().register(id, view.on_activate(layout.view.hook(id)));
        }
    }

    let buttons = Arc::new(navigation(kind, &layout));
    surface.add_global_buttons(buttons.clone());
    surface.add_global_renderer(buttons);

    surface.request(SurfaceRequest::SetMode(MIXER_MODE.into()));
    if has_pads {
        surface.request(SurfaceRequest::SetView(PLAY_VIEW.into()));
    }
    info!("Installed default layout for {}", kind);
    layout
}

/// One encoder scrolls the bank by single items, the rest edit parameters
struct ScrollEncoder {
    encoder: ControlId,
    bank: Arc<ParameterBank>,
    knobs: ParameterKnobs,
}

impl KnobHandler for ScrollEncoder {
    fn turn(&self, id: ControlId, delta: i32, ctx: &mut BindingContext) {
        if id == self.encoder {
            self.bank.scroll_by(delta as isize);
        } else {
            self.knobs.turn(id, delta, ctx);
        }
    }

    fn set(&self, id: ControlId, value: f64, ctx: &mut BindingContext) {
        if id != self.encoder {
            self.knobs.set(id, value, ctx);
        }
    }

    fn touch(&self, id: ControlId, touched: bool, ctx: &mut BindingContext) {
        if id != self.encoder {
            self.knobs.touch(id, touched, ctx);
        }
    }
}

fn page_buttons(map: ButtonMap, previous: u8, next: u8, layout: &Arc<DefaultLayout>) -> ButtonMap {
    let (previous, next) = (ControlId::button(previous), ControlId::button(next));
    let back = Arc::clone(layout);
    let forward = Arc::clone(layout);
    let can_back = Arc::clone(layout);
    let can_forward = Arc::clone(layout);
    map.on_fn(previous, ButtonAction::Press, move |_| {
        back.active_bank().previous_page()
    })
    .on_fn(next, ButtonAction::Press, move |_| forward.active_bank().next_page())
    .light(previous, move || {
        lit_if(can_back.active_bank().can_scroll_backward())
    })
    .light(next, move || {
        lit_if(can_forward.active_bank().can_scroll_forward())
    })
}

fn lit_if(on: bool) -> SemanticColor {
    if on {
        SemanticColor::On
    } else {
        SemanticColor::Off
    }
}

/// Press selects the mode; lit while it is selected
fn mode_button(map: ButtonMap, button: u8, id: &'static str, selection: &Selection) -> ButtonMap {
    let button = ControlId::button(button);
    map.on(button, ButtonAction::Press, SurfaceRequest::SetMode(id.into()))
        .light(button, selection.light(id))
}

/// Press selects the view; lit while it is selected
fn view_button(map: ButtonMap, button: u8, id: &'static str, selection: &Selection) -> ButtonMap {
    let button = ControlId::button(button);
    map.on(button, ButtonAction::Press, SurfaceRequest::SetView(id.into()))
        .light(button, selection.light(id))
}

fn navigation(kind: DeviceKind, layout: &Arc<DefaultLayout>) -> ButtonMap {
    let (mode, view) = (&layout.mode, &layout.view);
    match kind {
        DeviceKind::Mcu => {
            use mcu::buttons::*;
            let map = mode_button(ButtonMap::new(), ASSIGN_TRACK, MIXER_MODE, mode);
            let map = mode_button(map, ASSIGN_PLUGIN, DEVICE_MODE, mode);
            let map = page_buttons(map, BANK_LEFT, BANK_RIGHT, layout);
            let left = Arc::clone(layout);
            let right = Arc::clone(layout);
            map.on_fn(ControlId::button(CHANNEL_LEFT), ButtonAction::Press, move |_| {
                left.active_bank().scroll_by(-1)
            })
            .on_fn(ControlId::button(CHANNEL_RIGHT), ButtonAction::Press, move |_| {
                right.active_bank().scroll_by(1)
            })
            .momentary_mode(ControlId::button(SHIFT), DEVICE_MODE)
        }
        DeviceKind::Fire => {
            use fire::buttons::*;
            let map = view_button(ButtonMap::new(), NOTE, PLAY_VIEW, view);
            let map = view_button(map, DRUM, DRUM_VIEW, view);
            let map = view_button(map, STEP, TOGGLE_VIEW, view);
            let map = page_buttons(map, PATTERN_DOWN, PATTERN_UP, layout);
            let current = mode.clone();
            map.on_fn(ControlId::button(MODE), ButtonAction::Press, move |ctx| {
                let next = if current.is(MIXER_MODE) { DEVICE_MODE } else { MIXER_MODE };
                ctx.request(SurfaceRequest::SetMode(next.into()));
            })
            .light(ControlId::button(MODE), mode.light(DEVICE_MODE))
            .momentary_mode(ControlId::button(SHIFT), DEVICE_MODE)
        }
        DeviceKind::Launchpad => {
            use launchpad::buttons::*;
            let map = view_button(ButtonMap::new(), SESSION, TOGGLE_VIEW, view);
            let map = view_button(map, NOTE, PLAY_VIEW, view);
            let map = view_button(map, CHORD, DRUM_VIEW, view);
            let map = page_buttons(map, LEFT, RIGHT, layout);
            map.on(ControlId::button(CUSTOM), ButtonAction::LongPress, SurfaceRequest::Repaint)
                .momentary_mode(ControlId::button(SHIFT), DEVICE_MODE)
        }
    }
}
