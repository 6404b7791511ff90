//! Reusable handler objects for assembling Modes and Views

pub mod buttons;
pub mod grid;
pub mod parameters;

pub use buttons::ButtonMap;
pub use grid::{PlayView, ToggleGridView};
pub use parameters::{ParameterBars, ParameterKnobs, ParameterRenderer};
