//! Per-frame gesture pipeline
//!
//! Each tick takes the latest recognition snapshot through:
//! 1. Hold detection (press/release the left button)
//! 2. Overlay labels
//! 3. Fingertip cursor tracking
//! 4. Gesture dispatch (debounced actions, exit signal)
//!
//! [`run_loop`] drives ticks from a frame source until the user quits, a
//! gesture asks to exit, or the input runs dry. Any held button is released
//! on every way out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::display::{MonitorBox, ScreenGeometry};
use crate::gestures::{register_bindings, GestureDispatcher, HoldStateManager};
use crate::input::{MediaControl, PointerControl};
use crate::overlay::{LogOverlay, Overlay};
use crate::recognition::{FrameResult, FrameSource, RecognitionError, Recognizer, ResultStore};
use crate::tracker::PointerTracker;

/// Result of one pipeline tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    /// A gesture action asked to stop
    Exit,
}

/// Why [`run_loop`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The quit flag was set
    QuitRequested,
    /// A gesture action returned the exit signal
    GestureExit,
    /// The frame source ran out of frames
    SourceClosed,
    /// The recognizer can no longer accept frames
    RecognizerGone,
}

pub struct GesturePipeline {
    hold: Option<HoldStateManager>,
    tracker: Option<PointerTracker>,
    dispatcher: GestureDispatcher,
    overlay: Box<dyn Overlay>,
    monitor_box: Option<MonitorBox>,
    require_gesture: bool,
    shut_down: bool,
}

impl GesturePipeline {
    /// Assemble the pipeline from configuration.
    ///
    /// The target monitor is resolved once here; tracking falls back to the
    /// resolver and then the whole screen when that fails.
    pub fn from_config(
        config: &Config,
        pointer: Arc<dyn PointerControl>,
        geometry: Option<Arc<dyn ScreenGeometry>>,
        media: &MediaControl,
    ) -> Self {
        let mut dispatcher = GestureDispatcher::with_cooldowns(&config.gestures.cooldowns);
        register_bindings(&mut dispatcher, &config.gestures.actions, media);

        let hold = config.hold.enabled.then(|| {
            HoldStateManager::new(
                pointer.clone(),
                config.hold.gesture.clone(),
                Duration::from_millis(config.hold.restart_cooldown_ms),
            )
        });

        let monitor_box = geometry.as_ref().and_then(|g| g.monitor_box());
        match monitor_box {
            Some(b) => tracing::info!("Tracking onto monitor {}", b),
            None => tracing::info!("No monitor detected, tracking onto the whole screen"),
        }

        let tracker = config
            .tracking
            .enabled
            .then(|| PointerTracker::new(pointer, geometry, &config.tracking));

        Self {
            hold,
            tracker,
            dispatcher,
            overlay: Box::new(LogOverlay::new()),
            monitor_box,
            require_gesture: config.tracking.require_gesture,
            shut_down: false,
        }
    }

    /// Build a pipeline from ready-made parts.
    pub fn new(
        hold: Option<HoldStateManager>,
        tracker: Option<PointerTracker>,
        dispatcher: GestureDispatcher,
        monitor_box: Option<MonitorBox>,
    ) -> Self {
        Self {
            hold,
            tracker,
            dispatcher,
            overlay: Box::new(LogOverlay::new()),
            monitor_box,
            require_gesture: true,
            shut_down: false,
        }
    }

    pub fn with_overlay(mut self, overlay: Box<dyn Overlay>) -> Self {
        self.overlay = overlay;
        self
    }

    /// Track any hand with landmarks instead of only those showing the
    /// tracking gesture.
    pub fn with_require_gesture(mut self, require_gesture: bool) -> Self {
        self.require_gesture = require_gesture;
        self
    }

    pub fn hold_manager(&self) -> Option<&HoldStateManager> {
        self.hold.as_ref()
    }

    pub fn tracker(&self) -> Option<&PointerTracker> {
        self.tracker.as_ref()
    }

    /// Process one recognition snapshot.
    ///
    /// Every hand's gesture is dispatched even after one of them asks to exit.
    pub fn tick(&mut self, frame: &FrameResult) -> TickOutcome {
        if let Some(hold) = self.hold.as_mut() {
            hold.update(frame);
        }

        self.overlay.render(frame);

        if let Some(tracker) = self.tracker.as_mut() {
            track_hands(tracker, frame, self.monitor_box, self.require_gesture);
        }

        let mut exit = false;
        for (hand_index, gesture) in frame.gestures.iter().enumerate() {
            if let Some(gesture) = gesture {
                let handedness = frame.handedness(hand_index);
                exit |= self.dispatcher.dispatch(gesture, handedness, hand_index);
            }
        }

        if exit {
            TickOutcome::Exit
        } else {
            TickOutcome::Continue
        }
    }

    /// Release any held button. Also runs on drop.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;

        if let Some(hold) = self.hold.as_mut() {
            hold.release_all();
        }
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.reset_all();
        }
        tracing::info!("Gesture pipeline stopped");
    }
}

impl Drop for GesturePipeline {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn track_hands(
    tracker: &mut PointerTracker,
    frame: &FrameResult,
    monitor_box: Option<MonitorBox>,
    require_gesture: bool,
) {
    if frame.hand_count() == 0 {
        tracker.reset_all();
        return;
    }

    let mut tracked_one = false;
    for hand_index in 0..frame.hand_count() {
        let Some(landmarks) = frame.landmarks(hand_index) else {
            tracker.reset_hand(hand_index);
            continue;
        };
        let gesture = frame.gesture(hand_index);

        let wanted = if require_gesture {
            gesture == Some(tracker.track_gesture())
        } else {
            // Without the gate only one hand may steer the cursor
            !tracked_one
        };
        if !wanted {
            continue;
        }

        tracked_one = true;
        let moved =
            tracker.track_hand(hand_index, Some(landmarks), gesture, monitor_box, require_gesture);
        if !moved {
            tracing::debug!("Cursor move failed for hand {}", hand_index);
        }
    }
}

/// Drive the pipeline until quit, exit gesture, or end of input.
///
/// Each iteration submits the next frame without waiting for its result and
/// processes whatever snapshot the store currently holds.
pub fn run_loop(
    pipeline: &mut GesturePipeline,
    frames: &mut dyn FrameSource,
    recognizer: &mut dyn Recognizer,
    store: &ResultStore,
    quit: &AtomicBool,
) -> ExitReason {
    let reason = loop {
        if quit.load(Ordering::SeqCst) {
            break ExitReason::QuitRequested;
        }

        let Some(frame) = frames.next_frame() else {
            break ExitReason::SourceClosed;
        };

        match recognizer.recognize_async(&frame) {
            Ok(()) => {}
            Err(RecognitionError::Disconnected) => {
                tracing::error!("Recognizer stopped accepting frames");
                break ExitReason::RecognizerGone;
            }
            Err(e) => tracing::warn!("Failed to submit frame: {}", e),
        }

        let snapshot = store.snapshot();
        if pipeline.tick(&snapshot) == TickOutcome::Exit {
            break ExitReason::GestureExit;
        }
    };

    tracing::info!("Gesture loop finished: {:?}", reason);
    pipeline.shutdown();
    reason
}
