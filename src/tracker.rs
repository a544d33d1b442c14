//! Fingertip-to-cursor tracking
//!
//! The index fingertip's normalized position is amplified around the frame
//! centre, clamped, smoothed per hand with an exponential moving average and
//! mapped onto a monitor rectangle before the cursor is moved.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::TrackingConfig;
use crate::display::{MonitorBox, ScreenGeometry, DEFAULT_SCREEN};
use crate::input::PointerControl;
use crate::recognition::{landmarks, Landmark};

/// Per-hand smoothing state
#[derive(Debug, Clone, Copy, PartialEq)]
struct TrackerState {
    last_smoothed: (f64, f64),
}

pub struct PointerTracker {
    backend: Arc<dyn PointerControl>,
    geometry: Option<Arc<dyn ScreenGeometry>>,
    track_gesture: String,
    smoothing_alpha: f64,
    sensitivity: f64,
    invert_y: bool,
    hands: HashMap<usize, TrackerState>,
    /// Whole-screen fallback, queried once
    screen: Option<MonitorBox>,
}

impl PointerTracker {
    pub fn new(
        backend: Arc<dyn PointerControl>,
        geometry: Option<Arc<dyn ScreenGeometry>>,
        config: &TrackingConfig,
    ) -> Self {
        let mut tracker = Self {
            backend,
            geometry,
            track_gesture: config.track_gesture.clone(),
            smoothing_alpha: 1.0,
            sensitivity: 1.0,
            invert_y: config.invert_y,
            hands: HashMap::new(),
            screen: None,
        };
        tracker.set_smoothing(config.smoothing_alpha);
        tracker.set_sensitivity(config.sensitivity);
        tracker
    }

    pub fn track_gesture(&self) -> &str {
        &self.track_gesture
    }

    /// Move the cursor to follow one hand's index fingertip.
    ///
    /// With `require_gesture`, a hand showing any gesture other than the
    /// tracking gesture is ignored and its smoothing state is left alone.
    /// `monitor_box` overrides the resolver for this call. Returns whether
    /// the cursor was moved.
    pub fn track_hand(
        &mut self,
        hand_index: usize,
        landmarks: Option<&[Landmark]>,
        current_gesture: Option<&str>,
        monitor_box: Option<MonitorBox>,
        require_gesture: bool,
    ) -> bool {
        if require_gesture {
            if let Some(gesture) = current_gesture {
                if gesture != self.track_gesture {
                    return false;
                }
            }
        }

        let Some(tip) = landmarks.and_then(|lm| lm.get(landmarks::INDEX_FINGER_TIP)) else {
            return false;
        };

        let x = f64::from(tip.x);
        let mut y = f64::from(tip.y);
        if self.invert_y {
            y = 1.0 - y;
        }

        let amplify = |v: f64| (0.5 + (v - 0.5) * self.sensitivity).clamp(0.0, 1.0);
        let (x, y) = (amplify(x), amplify(y));
        if x.is_nan() || y.is_nan() {
            tracing::debug!("Ignoring non-numeric fingertip on hand {}", hand_index);
            return false;
        }

        let alpha = self.smoothing_alpha;
        let state = self.hands.entry(hand_index).or_insert(TrackerState {
            last_smoothed: (x, y),
        });
        let (px, py) = state.last_smoothed;
        let smoothed = (px * (1.0 - alpha) + x * alpha, py * (1.0 - alpha) + y * alpha);
        state.last_smoothed = smoothed;

        let target = match monitor_box {
            Some(b) => b,
            None => self.resolve_box(),
        };
        let (pixel_x, pixel_y) = target.to_pixel(smoothed.0, smoothed.1);
        tracing::trace!(
            "Hand {} -> ({:.3}, {:.3}) -> {},{} on {}",
            hand_index,
            smoothed.0,
            smoothed.1,
            pixel_x,
            pixel_y,
            target
        );

        self.backend.move_cursor_absolute(pixel_x, pixel_y)
    }

    fn resolve_box(&mut self) -> MonitorBox {
        if let Some(found) = self.geometry.as_ref().and_then(|g| g.monitor_box()) {
            return found;
        }
        if let Some(screen) = self.screen {
            return screen;
        }
        let screen = self
            .geometry
            .as_ref()
            .map_or(DEFAULT_SCREEN, |g| g.virtual_screen());
        tracing::debug!("Using whole screen {} for tracking", screen);
        self.screen = Some(screen);
        screen
    }

    /// Forget one hand's smoothing so its next sample starts fresh.
    pub fn reset_hand(&mut self, hand_index: usize) {
        self.hands.remove(&hand_index);
    }

    pub fn reset_all(&mut self) {
        self.hands.clear();
    }

    /// Set the EMA weight of the newest sample. Values outside (0, 1] are
    /// clamped, non-numbers ignored.
    pub fn set_smoothing(&mut self, alpha: f64) {
        if alpha.is_nan() {
            tracing::warn!("Ignoring smoothing factor NaN");
            return;
        }
        self.smoothing_alpha = alpha.clamp(f64::EPSILON, 1.0);
    }

    pub fn set_sensitivity(&mut self, sensitivity: f64) {
        if !sensitivity.is_finite() || sensitivity <= 0.0 {
            tracing::warn!("Ignoring sensitivity {}", sensitivity);
            return;
        }
        self.sensitivity = sensitivity;
    }

    pub fn last_smoothed_for_hand(&self, hand_index: usize) -> Option<(f64, f64)> {
        self.hands.get(&hand_index).map(|s| s.last_smoothed)
    }
}
