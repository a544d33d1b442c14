//! Per-gesture debounce and action dispatch

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Action bound to a gesture: `(handedness, hand_index) -> exit requested`
pub type GestureAction = Box<dyn FnMut(Option<&str>, usize) -> bool>;

/// Maps gesture names to actions, each with its own cooldown.
///
/// A gesture fires when it has never fired, or when strictly more than its
/// cooldown has elapsed since it last fired. Gestures without a cooldown
/// fire on every call.
#[derive(Default)]
pub struct GestureDispatcher {
    actions: HashMap<String, GestureAction>,
    cooldowns: HashMap<String, Duration>,
    last_trigger: HashMap<String, Instant>,
}

impl GestureDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a dispatcher with cooldowns given in seconds.
    pub fn with_cooldowns(cooldowns: &BTreeMap<String, f64>) -> Self {
        let mut dispatcher = Self::new();
        for (gesture, secs) in cooldowns {
            match Duration::try_from_secs_f64(*secs) {
                Ok(cooldown) => dispatcher.set_cooldown(gesture, cooldown),
                Err(e) => tracing::warn!("Ignoring cooldown for {}: {}", gesture, e),
            }
        }
        dispatcher
    }

    pub fn set_cooldown(&mut self, gesture: &str, cooldown: Duration) {
        self.cooldowns.insert(gesture.to_string(), cooldown);
    }

    pub fn cooldown(&self, gesture: &str) -> Duration {
        self.cooldowns.get(gesture).copied().unwrap_or(Duration::ZERO)
    }

    /// Bind an action, replacing any previous binding for the gesture.
    pub fn register<F>(&mut self, gesture: &str, action: F)
    where
        F: FnMut(Option<&str>, usize) -> bool + 'static,
    {
        self.actions.insert(gesture.to_string(), Box::new(action));
    }

    pub fn is_registered(&self, gesture: &str) -> bool {
        self.actions.contains_key(gesture)
    }

    /// Fire the gesture's action if it is off cooldown.
    ///
    /// Returns `true` when the action asks the caller to exit.
    pub fn dispatch(
        &mut self,
        gesture: &str,
        handedness: Option<&str>,
        hand_index: usize,
    ) -> bool {
        self.dispatch_at(gesture, handedness, hand_index, Instant::now())
    }

    /// [`dispatch`](Self::dispatch) with an explicit clock.
    pub fn dispatch_at(
        &mut self,
        gesture: &str,
        handedness: Option<&str>,
        hand_index: usize,
        now: Instant,
    ) -> bool {
        let Some(action) = self.actions.get_mut(gesture) else {
            tracing::debug!("No action bound to gesture {}", gesture);
            return false;
        };

        let cooldown = self.cooldowns.get(gesture).copied().unwrap_or(Duration::ZERO);
        if let Some(last) = self.last_trigger.get(gesture) {
            if now.saturating_duration_since(*last) <= cooldown {
                return false;
            }
        }

        tracing::debug!(
            "Hand {} ({}): {}",
            hand_index,
            handedness.unwrap_or("unknown"),
            gesture
        );
        let exit = action(handedness, hand_index);
        self.last_trigger.insert(gesture.to_string(), now);
        exit
    }
}
