//! Modes and Views
//!
//! A Mode decides what the knobs, buttons and displays do; a View decides what
//! the pad grid does. Both are plain records of handler objects switched by
//! the same [`FeatureManager`], run as two independent state machines so a
//! mode switch never changes the view.

pub mod binding;
pub mod manager;
#[allow(clippy::module_inception)]
pub mod mode;
pub mod view;

pub use binding::{
    BindingContext, ButtonHandler, Frame, GridBinding, KnobHandler, RenderContext, Renderer,
    SurfaceRequest,
};
pub use manager::{Feature, FeatureManager};
pub use mode::{Hook, Mode};
pub use view::View;

pub type ModeManager = FeatureManager<Mode>;
pub type ViewManager = FeatureManager<View>;
