//! Gesture handling: debounced action dispatch and the hold (drag) gesture

pub mod actions;
pub mod dispatch;
pub mod hold;

pub use actions::{register_bindings, ActionKind};
pub use dispatch::{GestureAction, GestureDispatcher};
pub use hold::{HoldPhase, HoldState, HoldStateManager};
