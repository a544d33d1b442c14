//! Press-and-hold state machine
//!
//! Entering the hold gesture presses the left button; leaving it releases
//! the button. State is tracked per hand index.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::input::PointerControl;
use crate::recognition::FrameResult;

/// Hold phase for one hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HoldPhase {
    #[default]
    NotHolding,
    Holding,
}

/// Per-hand hold bookkeeping
#[derive(Debug, Clone, Default)]
pub struct HoldState {
    /// Gesture seen on the previous frame, `None` when the hand reported none
    pub previous_gesture: Option<String>,
    pub phase: HoldPhase,
    /// Last press attempt of the current entry, for rate limiting.
    /// Cleared on the exit edge.
    pub last_start_attempt: Option<Instant>,
}

impl HoldState {
    /// Nothing left to remember once the press rate limit has expired
    fn is_idle(&self, now: Instant, restart_cooldown: Duration) -> bool {
        self.previous_gesture.is_none()
            && self.phase == HoldPhase::NotHolding
            && self
                .last_start_attempt
                .is_none_or(|last| now.saturating_duration_since(last) >= restart_cooldown)
    }
}

/// Detects hold-gesture edges per hand and drives the left button.
pub struct HoldStateManager {
    backend: Arc<dyn PointerControl>,
    hold_gesture: String,
    restart_cooldown: Duration,
    hands: BTreeMap<usize, HoldState>,
}

impl HoldStateManager {
    pub fn new(
        backend: Arc<dyn PointerControl>,
        hold_gesture: impl Into<String>,
        restart_cooldown: Duration,
    ) -> Self {
        Self {
            backend,
            hold_gesture: hold_gesture.into(),
            restart_cooldown,
            hands: BTreeMap::new(),
        }
    }

    pub fn hold_gesture(&self) -> &str {
        &self.hold_gesture
    }

    /// Process one frame of gestures.
    pub fn update(&mut self, frame: &FrameResult) {
        self.update_at(frame, Instant::now());
    }

    /// [`update`](Self::update) with an explicit clock.
    pub fn update_at(&mut self, frame: &FrameResult, now: Instant) {
        // Hands that vanished from the frame still need their exit edge
        let mut indices: Vec<usize> = (0..frame.hand_count()).collect();
        indices.extend(self.hands.keys().copied());
        indices.sort_unstable();
        indices.dedup();

        for hand_index in indices {
            self.update_hand(hand_index, frame.gesture(hand_index), now);
        }

        let cooldown = self.restart_cooldown;
        self.hands.retain(|_, state| !state.is_idle(now, cooldown));
    }

    fn update_hand(&mut self, hand_index: usize, current: Option<&str>, now: Instant) {
        let hold = self.hold_gesture.as_str();
        let state = self.hands.entry(hand_index).or_default();

        let was_hold = state.previous_gesture.as_deref() == Some(hold);
        let is_hold = current == Some(hold);
        let mut deferred = false;

        if !was_hold && is_hold {
            let rate_limited = state
                .last_start_attempt
                .is_some_and(|last| now.saturating_duration_since(last) < self.restart_cooldown);

            if rate_limited {
                // Retried on the next frame since the previous gesture is kept
                deferred = true;
            } else {
                state.last_start_attempt = Some(now);
                if self.backend.press_button_hold() {
                    state.phase = HoldPhase::Holding;
                    tracing::info!("Hold started on hand {}", hand_index);
                } else {
                    tracing::warn!("Hold press failed on hand {}", hand_index);
                }
            }
        }

        if was_hold && !is_hold {
            if !self.backend.release_button_hold() {
                tracing::warn!("Hold release failed on hand {}", hand_index);
            }
            state.phase = HoldPhase::NotHolding;
            // Re-entry after an exit presses immediately
            state.last_start_attempt = None;
            tracing::info!(
                "Hold ended on hand {} (gesture -> {})",
                hand_index,
                current.unwrap_or("none")
            );
        }

        match current {
            Some(_) if deferred => {}
            Some(gesture) => state.previous_gesture = Some(gesture.to_string()),
            None => state.previous_gesture = None,
        }
    }

    /// Whether this manager pressed the button for the given hand.
    pub fn is_holding(&self, hand_index: usize) -> bool {
        self.hands
            .get(&hand_index)
            .is_some_and(|s| s.phase == HoldPhase::Holding)
    }

    pub fn any_holding(&self) -> bool {
        self.hands.values().any(|s| s.phase == HoldPhase::Holding)
    }

    /// Release the button and forget all per-hand state.
    ///
    /// Safe to call any number of times.
    pub fn release_all(&mut self) {
        let was_holding = self.any_holding() || self.backend.is_holding();
        if !self.backend.release_button_hold() {
            tracing::warn!("Failed to release held button during cleanup");
        } else if was_holding {
            tracing::info!("Released held button");
        }
        self.hands.clear();
    }
}
