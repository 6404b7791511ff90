//! Pad grid bindings

use crate::control::ControlId;
use crate::host::NoteSink;
use crate::mode::{BindingContext, Frame, GridBinding, RenderContext};
use crate::protocol::grid::{GRID_BASE, GRID_SIZE};
use crate::protocol::{LightInfo, SemanticColor};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Pads play notes into the host
///
/// Grid note `n` plays `n + transpose`; held pads light up and every
/// octave root stays dimly lit as an orientation aid.
pub struct PlayView {
    sink: Arc<dyn NoteSink>,
    channel: u8,
    transpose: i8,
    held: Mutex<BTreeSet<u8>>,
}

impl PlayView {
    pub fn new(sink: Arc<dyn NoteSink>, channel: u8, transpose: i8) -> Self {
        Self {
            sink,
            channel,
            transpose,
            held: Mutex::new(BTreeSet::new()),
        }
    }

    fn played_note(&self, grid_note: u8) -> Option<u8> {
        let note = grid_note as i16 + self.transpose as i16;
        (0..=127).contains(&note).then_some(note as u8)
    }
}

impl GridBinding for PlayView {
    fn pad(&self, grid_note: u8, velocity: Option<u8>, _ctx: &mut BindingContext) {
        let Some(note) = self.played_note(grid_note) else {
            return;
        };
        match velocity {
            Some(v) => {
                self.held.lock().insert(grid_note);
                self.sink.note_on(self.channel, note, v);
            }
            None => {
                self.held.lock().remove(&grid_note);
                self.sink.note_off(self.channel, note);
            }
        }
    }

    fn pressure(&self, grid_note: u8, pressure: u8, _ctx: &mut BindingContext) {
        if let Some(note) = self.played_note(grid_note) {
            self.sink.pressure(self.channel, note, pressure);
        }
    }

    fn draw(&self, frame: &mut Frame, ctx: &RenderContext) {
        let held = self.held.lock();
        for grid_note in GRID_BASE..GRID_BASE + GRID_SIZE as u8 {
            let id = ControlId::pad(grid_note - GRID_BASE);
            let color = match self.played_note(grid_note) {
                _ if held.contains(&grid_note) => SemanticColor::Highlighted,
                Some(note) if note % 12 == 0 => SemanticColor::Dim,
                Some(_) => SemanticColor::Off,
                None => SemanticColor::Off,
            };
            frame.set_pad(grid_note, ctx.light(color, id));
        }
    }
}

/// 64 on/off cells, one per pad
pub struct ToggleGridView {
    cells: Mutex<[bool; GRID_SIZE]>,
    on_color: SemanticColor,
}

impl ToggleGridView {
    pub fn new(on_color: SemanticColor) -> Self {
        Self {
            cells: Mutex::new([false; GRID_SIZE]),
            on_color,
        }
    }

    pub fn is_on(&self, grid_note: u8) -> bool {
        grid_note
            .checked_sub(GRID_BASE)
            .and_then(|i| self.cells.lock().get(i as usize).copied())
            .unwrap_or(false)
    }
}

impl GridBinding for ToggleGridView {
    fn pad(&self, grid_note: u8, velocity: Option<u8>, _ctx: &mut BindingContext) {
        if velocity.is_none() {
            return;
        }
        let Some(index) = grid_note.checked_sub(GRID_BASE) else {
            return;
        };
        let mut cells = self.cells.lock();
        if let Some(cell) = cells.get_mut(index as usize) {
            *cell = !*cell;
            debug!("Grid cell {} -> {}", grid_note, cell);
        }
    }

    fn draw(&self, frame: &mut Frame, ctx: &RenderContext) {
        let cells = *self.cells.lock();
        for (i, on) in cells.iter().enumerate() {
            let grid_note = GRID_BASE + i as u8;
            let light = if *on {
                ctx.light(self.on_color, ControlId::pad(i as u8))
            } else {
                LightInfo::OFF
            };
            frame.set_pad(grid_note, light);
        }
    }
}
