//! OS input and media actions
//!
//! Pointer movement and left-button hold go through [`PointerBackend`], which
//! tries a chain of mechanisms until one succeeds. Volume and media keys are
//! fire-and-forget commands in [`media`].

pub mod media;
pub mod pointer;

pub use media::{MediaControl, VolumeDirection};
pub use pointer::{
    EnigoMechanism, HyprctlMechanism, PointerBackend, PointerMechanism, XdotoolMechanism,
    YdotoolForm, YdotoolMechanism,
};

use crate::platform::CommandError;

/// Errors from a single input mechanism attempt
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{mechanism} does not support {operation}")]
    Unsupported {
        mechanism: &'static str,
        operation: &'static str,
    },

    #[error("Input library error: {0}")]
    Library(String),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Pointer operations the gesture pipeline drives.
///
/// Every call reports success as a bool and never fails loudly; callers
/// treat `false` as "nothing happened".
pub trait PointerControl {
    /// Move the cursor to absolute virtual-screen pixels.
    fn move_cursor_absolute(&self, x: i32, y: i32) -> bool;

    /// Press and hold the left button. A no-op success while already held.
    fn press_button_hold(&self) -> bool;

    /// Release the left button. A no-op success while not held.
    fn release_button_hold(&self) -> bool;

    /// Whether the left button is believed to be held.
    fn is_holding(&self) -> bool;
}
