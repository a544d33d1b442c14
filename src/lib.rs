//! gesturectl - hand gesture desktop control
//!
//! Turns webcam hand-gesture recognition into cursor movement, click-and-drag,
//! media and volume actions on Linux desktops.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

pub mod config;
pub mod display;
pub mod gestures;
pub mod input;
pub mod overlay;
pub mod pipeline;
pub mod platform;
pub mod recognition;
pub mod tracker;

use display::{MonitorResolver, ScreenGeometry};
use input::{MediaControl, PointerBackend, PointerControl};
use pipeline::{ExitReason, GesturePipeline};
use recognition::{ResultStore, SubprocessRecognizer, TickFrameSource};

/// Use cases offered by the start-up menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseCase {
    HandGestureRecognition,
}

impl UseCase {
    /// Menu entries as `(choice, title)`
    pub const MENU: &'static [(&'static str, &'static str)] = &[("1", "Hand Gesture Recognition")];

    /// Parse a menu choice. An empty answer picks the first entry.
    pub fn from_choice(choice: &str) -> Option<Self> {
        match choice.trim() {
            "" | "1" => Some(UseCase::HandGestureRecognition),
            _ => None,
        }
    }
}

/// Set up stdout and file logging (local time for readability).
///
/// Logs go to `~/.gesturectl/logs/gesturectl-debug.log` as well as stdout.
pub fn init_logging() {
    use tracing_subscriber::prelude::*;

    /// Format timestamps using the system's local time via chrono
    struct LocalTimer;
    impl tracing_subscriber::fmt::time::FormatTime for LocalTimer {
        fn format_time(
            &self,
            w: &mut tracing_subscriber::fmt::format::Writer<'_>,
        ) -> std::fmt::Result {
            write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
        }
    }

    let log_dir = config::get_config_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("gesturectl-debug.log"))
        .ok();

    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    if let Some(file) = log_file {
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_timer(LocalTimer)
            .with_ansi(false);
        let stdout_layer = tracing_subscriber::fmt::layer().with_timer(LocalTimer);
        let _ = tracing_subscriber::registry()
            .with(filter())
            .with(stdout_layer)
            .with(file_layer)
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_timer(LocalTimer)
            .try_init();
    }
}

/// Run hand gesture recognition until `quit` is set or a gesture exits.
///
/// Fails only when the recognizer cannot start, most often because the
/// model file is missing.
pub fn run(quit: Arc<AtomicBool>) -> anyhow::Result<ExitReason> {
    let cfg = config::get_config();
    tracing::info!("gesturectl {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("Display server: {}", platform::get_display_server());

    let timeout = Duration::from_millis(cfg.backend.command_timeout_ms);

    let store = Arc::new(ResultStore::new());
    let mut recognizer = SubprocessRecognizer::spawn(
        &cfg.recognizer.helper_command,
        &cfg.recognizer.model_path,
        cfg.recognizer.num_hands,
        store.clone(),
    )
    .context("Failed to start gesture recognizer")?;

    let pointer = Arc::new(PointerBackend::probe(timeout));
    let resolver: Arc<dyn ScreenGeometry> = Arc::new(MonitorResolver::new(&cfg.display, timeout));
    let media = MediaControl::new(cfg.backend.volume_step_percent, timeout);

    let mut pipeline = GesturePipeline::from_config(
        &cfg,
        pointer as Arc<dyn PointerControl>,
        Some(resolver),
        &media,
    );
    let mut frames = TickFrameSource::new(cfg.recognizer.frame_rate);

    tracing::info!("Hand gesture recognition running, enter q to quit");
    let reason = pipeline::run_loop(&mut pipeline, &mut frames, &mut recognizer, &store, &quit);

    if recognizer.dropped_frames() > 0 {
        tracing::debug!(
            "Recognizer skipped {} frames while busy",
            recognizer.dropped_frames()
        );
    }
    Ok(reason)
}
