//! Pointer movement and left-button hold with mechanism fallback
//!
//! Mechanisms are probed once when the backend is built. Each operation walks
//! the probed list in order and stops at the first success.

use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{BackendError, PointerControl};
use crate::platform::{self, run_command};

/// One way of driving the pointer.
pub trait PointerMechanism {
    fn name(&self) -> &'static str;
    fn move_to(&self, x: i32, y: i32) -> Result<(), BackendError>;
    fn press(&self) -> Result<(), BackendError>;
    fn release(&self) -> Result<(), BackendError>;
}

/// In-process input through `enigo`.
pub struct EnigoMechanism {
    enigo: Mutex<enigo::Enigo>,
}

impl EnigoMechanism {
    pub fn new() -> Result<Self, BackendError> {
        let enigo = enigo::Enigo::new(&enigo::Settings::default())
            .map_err(|e| BackendError::Library(e.to_string()))?;
        Ok(Self {
            enigo: Mutex::new(enigo),
        })
    }

    fn button(&self, direction: enigo::Direction) -> Result<(), BackendError> {
        use enigo::{Button, Mouse};
        self.enigo
            .lock()
            .button(Button::Left, direction)
            .map_err(|e| BackendError::Library(e.to_string()))
    }
}

impl PointerMechanism for EnigoMechanism {
    fn name(&self) -> &'static str {
        "enigo"
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), BackendError> {
        use enigo::{Coordinate, Mouse};
        self.enigo
            .lock()
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| BackendError::Library(e.to_string()))
    }

    fn press(&self) -> Result<(), BackendError> {
        self.button(enigo::Direction::Press)
    }

    fn release(&self) -> Result<(), BackendError> {
        self.button(enigo::Direction::Release)
    }
}

/// Cursor warps through the Hyprland compositor. Move only.
pub struct HyprctlMechanism {
    path: PathBuf,
    timeout: Duration,
}

impl HyprctlMechanism {
    pub fn new(path: PathBuf, timeout: Duration) -> Self {
        Self { path, timeout }
    }
}

impl PointerMechanism for HyprctlMechanism {
    fn name(&self) -> &'static str {
        "hyprctl"
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), BackendError> {
        let (x, y) = (x.to_string(), y.to_string());
        run_command(&self.path, &["dispatch", "movecursor", &x, &y], self.timeout)?;
        Ok(())
    }

    fn press(&self) -> Result<(), BackendError> {
        Err(BackendError::Unsupported {
            mechanism: "hyprctl",
            operation: "button press",
        })
    }

    fn release(&self) -> Result<(), BackendError> {
        Err(BackendError::Unsupported {
            mechanism: "hyprctl",
            operation: "button release",
        })
    }
}

/// X11 input through the `xdotool` CLI.
pub struct XdotoolMechanism {
    path: PathBuf,
    timeout: Duration,
}

impl XdotoolMechanism {
    pub fn new(path: PathBuf, timeout: Duration) -> Self {
        Self { path, timeout }
    }
}

impl PointerMechanism for XdotoolMechanism {
    fn name(&self) -> &'static str {
        "xdotool"
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), BackendError> {
        let (x, y) = (x.to_string(), y.to_string());
        run_command(&self.path, &["mousemove", &x, &y], self.timeout)?;
        Ok(())
    }

    fn press(&self) -> Result<(), BackendError> {
        run_command(&self.path, &["mousedown", "1"], self.timeout)?;
        Ok(())
    }

    fn release(&self) -> Result<(), BackendError> {
        run_command(&self.path, &["mouseup", "1"], self.timeout)?;
        Ok(())
    }
}

/// How a particular `ydotool` build spells its move command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YdotoolForm {
    /// `ydotool mousemove X Y`
    Mousemove,
    /// `ydotool mouse move X Y`
    MouseMove,
    /// `ydotool m X Y`
    Short,
}

impl YdotoolForm {
    /// Work out the move form from `ydotool help` output.
    pub fn detect(help: &str) -> Self {
        let help = help.to_lowercase();
        if help.contains("mousemove") {
            Self::Mousemove
        } else if help.contains("mouse") && help.contains("move") {
            Self::MouseMove
        } else if help.lines().any(|l| l.trim_start().starts_with("m ")) {
            Self::Short
        } else {
            Self::Mousemove
        }
    }

    fn words(self) -> &'static [&'static str] {
        match self {
            Self::Mousemove => &["mousemove"],
            Self::MouseMove => &["mouse", "move"],
            Self::Short => &["m"],
        }
    }
}

/// uinput-level input through the `ydotool` CLI. Works under Wayland.
pub struct YdotoolMechanism {
    path: PathBuf,
    form: YdotoolForm,
    timeout: Duration,
}

/// `ydotool click` codes for left button down / up
const YDOTOOL_LEFT_DOWN: &str = "0x40";
const YDOTOOL_LEFT_UP: &str = "0x80";

impl YdotoolMechanism {
    /// Ask the binary for its help text to pick the move form.
    pub fn probe(path: PathBuf, timeout: Duration) -> Self {
        let form = match run_command(&path, &["help"], timeout) {
            Ok(help) => YdotoolForm::detect(&help),
            Err(e) => {
                tracing::debug!("ydotool help failed ({}), assuming mousemove", e);
                YdotoolForm::Mousemove
            }
        };
        tracing::debug!("ydotool move form: {:?}", form);
        Self { path, form, timeout }
    }

    fn move_args(&self, x: &str, y: &str) -> Vec<String> {
        let mut args: Vec<String> = self.form.words().iter().map(|w| w.to_string()).collect();
        args.push(x.to_string());
        args.push(y.to_string());
        args
    }
}

impl PointerMechanism for YdotoolMechanism {
    fn name(&self) -> &'static str {
        "ydotool"
    }

    fn move_to(&self, x: i32, y: i32) -> Result<(), BackendError> {
        let args = self.move_args(&x.to_string(), &y.to_string());
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        run_command(&self.path, &args, self.timeout)?;
        Ok(())
    }

    fn press(&self) -> Result<(), BackendError> {
        run_command(&self.path, &["click", YDOTOOL_LEFT_DOWN], self.timeout)?;
        Ok(())
    }

    fn release(&self) -> Result<(), BackendError> {
        run_command(&self.path, &["click", YDOTOOL_LEFT_UP], self.timeout)?;
        Ok(())
    }
}

/// Pointer control over an ordered list of mechanisms.
pub struct PointerBackend {
    mechanisms: Vec<Box<dyn PointerMechanism>>,
    holding: AtomicBool,
    move_failure_reported: AtomicBool,
}

impl PointerBackend {
    /// Probe the available mechanisms in preference order.
    pub fn probe(command_timeout: Duration) -> Self {
        let mut mechanisms: Vec<Box<dyn PointerMechanism>> = Vec::new();

        match EnigoMechanism::new() {
            Ok(m) => mechanisms.push(Box::new(m)),
            Err(e) => tracing::warn!("enigo unavailable: {}", e),
        }

        if platform::is_hyprland() {
            if let Some(path) = platform::find_executable("hyprctl") {
                mechanisms.push(Box::new(HyprctlMechanism::new(path, command_timeout)));
            }
        }

        if let Some(path) = platform::find_executable("xdotool") {
            mechanisms.push(Box::new(XdotoolMechanism::new(path, command_timeout)));
        }

        if let Some(path) = platform::find_executable("ydotool") {
            mechanisms.push(Box::new(YdotoolMechanism::probe(path, command_timeout)));
        }

        let backend = Self::with_mechanisms(mechanisms);
        if backend.mechanisms.is_empty() {
            tracing::warn!(
                "No pointer mechanism available on {}; cursor control disabled",
                platform::get_display_server()
            );
        } else {
            tracing::info!(
                "Pointer mechanisms: {}",
                backend.mechanism_names().join(", ")
            );
        }
        backend
    }

    pub fn with_mechanisms(mechanisms: Vec<Box<dyn PointerMechanism>>) -> Self {
        Self {
            mechanisms,
            holding: AtomicBool::new(false),
            move_failure_reported: AtomicBool::new(false),
        }
    }

    pub fn mechanism_names(&self) -> Vec<&'static str> {
        self.mechanisms.iter().map(|m| m.name()).collect()
    }

    /// Run `op` on each mechanism until one succeeds.
    fn attempt<F>(&self, operation: &str, op: F) -> bool
    where
        F: Fn(&dyn PointerMechanism) -> Result<(), BackendError>,
    {
        for mechanism in &self.mechanisms {
            match op(mechanism.as_ref()) {
                Ok(()) => return true,
                Err(e) => tracing::debug!("{} via {} failed: {}", operation, mechanism.name(), e),
            }
        }
        false
    }
}

impl PointerControl for PointerBackend {
    fn move_cursor_absolute(&self, x: i32, y: i32) -> bool {
        let moved = self.attempt("move", |m| m.move_to(x, y));
        if moved {
            self.move_failure_reported.store(false, Ordering::Relaxed);
        } else if !self.move_failure_reported.swap(true, Ordering::Relaxed) {
            tracing::warn!("No pointer mechanism could move the cursor to ({}, {})", x, y);
        }
        moved
    }

    fn press_button_hold(&self) -> bool {
        if self.holding.load(Ordering::SeqCst) {
            return true;
        }
        if self.attempt("press", |m| m.press()) {
            self.holding.store(true, Ordering::SeqCst);
            tracing::debug!("Left button pressed");
            true
        } else {
            tracing::warn!("Failed to press left button with any mechanism");
            false
        }
    }

    fn release_button_hold(&self) -> bool {
        if !self.holding.load(Ordering::SeqCst) {
            return true;
        }
        // On total failure the flag stays set even though the OS may disagree
        if self.attempt("release", |m| m.release()) {
            self.holding.store(false, Ordering::SeqCst);
            tracing::debug!("Left button released");
            true
        } else {
            tracing::warn!("Failed to release left button with any mechanism");
            false
        }
    }

    fn is_holding(&self) -> bool {
        self.holding.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    /// Records calls and fails on demand
    #[derive(Default)]
    struct FakeMechanism {
        fail: AtomicBool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeMechanism {
        fn failing() -> Self {
            let m = Self::default();
            m.fail.store(true, Ordering::SeqCst);
            m
        }

        fn result(&self, call: String) -> Result<(), BackendError> {
            self.calls.lock().push(call);
            if self.fail.load(Ordering::SeqCst) {
                Err(BackendError::Library("fake failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl PointerMechanism for Arc<FakeMechanism> {
        fn name(&self) -> &'static str {
            "fake"
        }
        fn move_to(&self, x: i32, y: i32) -> Result<(), BackendError> {
            self.result(format!("move {} {}", x, y))
        }
        fn press(&self) -> Result<(), BackendError> {
            self.result("press".to_string())
        }
        fn release(&self) -> Result<(), BackendError> {
            self.result("release".to_string())
        }
    }

    fn backend(mechs: &[Arc<FakeMechanism>]) -> PointerBackend {
        PointerBackend::with_mechanisms(
            mechs
                .iter()
                .map(|m| Box::new(Arc::clone(m)) as Box<dyn PointerMechanism>)
                .collect(),
        )
    }

    #[test]
    fn test_falls_through_to_next_mechanism() {
        let first = Arc::new(FakeMechanism::failing());
        let second = Arc::new(FakeMechanism::default());
        let b = backend(&[first.clone(), second.clone()]);

        assert!(b.move_cursor_absolute(10, 20));
        assert_eq!(*first.calls.lock(), vec!["move 10 20"]);
        assert_eq!(*second.calls.lock(), vec!["move 10 20"]);
    }

    #[test]
    fn test_stops_at_first_success() {
        let first = Arc::new(FakeMechanism::default());
        let second = Arc::new(FakeMechanism::default());
        let b = backend(&[first.clone(), second.clone()]);

        assert!(b.move_cursor_absolute(1, 2));
        assert!(second.calls.lock().is_empty());
    }

    #[test]
    fn test_all_failing_reports_false() {
        let b = backend(&[
            Arc::new(FakeMechanism::failing()),
            Arc::new(FakeMechanism::failing()),
        ]);
        assert!(!b.move_cursor_absolute(0, 0));
        assert!(!b.press_button_hold());
        assert!(!b.is_holding());
    }

    #[test]
    fn test_no_mechanisms() {
        let b = PointerBackend::with_mechanisms(Vec::new());
        assert!(!b.move_cursor_absolute(0, 0));
        assert!(!b.press_button_hold());
        // Nothing held, so release is a no-op success
        assert!(b.release_button_hold());
    }

    #[test]
    fn test_press_is_idempotent() {
        let m = Arc::new(FakeMechanism::default());
        let b = backend(&[m.clone()]);

        assert!(b.press_button_hold());
        assert!(b.press_button_hold());
        assert!(b.is_holding());
        assert_eq!(*m.calls.lock(), vec!["press"]);
    }

    #[test]
    fn test_release_when_not_holding_is_noop() {
        let m = Arc::new(FakeMechanism::default());
        let b = backend(&[m.clone()]);

        assert!(b.release_button_hold());
        assert!(m.calls.lock().is_empty());
    }

    #[test]
    fn test_failed_release_keeps_holding_flag() {
        let m = Arc::new(FakeMechanism::default());
        let b = backend(&[m.clone()]);
        assert!(b.press_button_hold());

        m.fail.store(true, Ordering::SeqCst);
        assert!(!b.release_button_hold());
        assert!(b.is_holding());

        m.fail.store(false, Ordering::SeqCst);
        assert!(b.release_button_hold());
        assert!(!b.is_holding());
    }

    #[test]
    fn test_ydotool_form_detection() {
        let help = "Usage: ydotool <cmd> <args>\nAvailable commands:\n  click\n  mousemove\n  type\n";
        assert_eq!(YdotoolForm::detect(help), YdotoolForm::Mousemove);

        let help = "Commands:\n  mouse move <x> <y>\n  key\n";
        assert_eq!(YdotoolForm::detect(help), YdotoolForm::MouseMove);

        let help = "Commands:\n  m <x> <y>\n  k\n";
        assert_eq!(YdotoolForm::detect(help), YdotoolForm::Short);

        assert_eq!(YdotoolForm::detect(""), YdotoolForm::Mousemove);
    }

    #[test]
    fn test_ydotool_move_args() {
        let m = YdotoolMechanism {
            path: PathBuf::from("ydotool"),
            form: YdotoolForm::MouseMove,
            timeout: Duration::from_secs(1),
        };
        assert_eq!(m.move_args("5", "6"), vec!["mouse", "move", "5", "6"]);
    }

    #[test]
    fn test_hyprctl_has_no_buttons() {
        let m = HyprctlMechanism::new(PathBuf::from("hyprctl"), Duration::from_secs(1));
        assert!(matches!(m.press(), Err(BackendError::Unsupported { .. })));
        assert!(matches!(m.release(), Err(BackendError::Unsupported { .. })));
    }
}
