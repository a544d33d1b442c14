//! Built-in gesture actions and their configuration names

use serde::{Deserialize, Serialize};

use super::GestureDispatcher;
use crate::input::{MediaControl, VolumeDirection};

/// Action a gesture can be bound to in the config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    VolumeUp,
    VolumeDown,
    MediaPlayPause,
    /// Stop the gesture loop
    Quit,
    /// Only log the detection
    Log,
}

impl ActionKind {
    pub fn description(&self) -> &'static str {
        match self {
            ActionKind::VolumeUp => "Volume up",
            ActionKind::VolumeDown => "Volume down",
            ActionKind::MediaPlayPause => "Pause / unpause media playback",
            ActionKind::Quit => "Quit",
            ActionKind::Log => "Log only",
        }
    }
}

/// Register one action per configured gesture binding.
pub fn register_bindings<'a, I>(
    dispatcher: &mut GestureDispatcher,
    bindings: I,
    media: &MediaControl,
) where
    I: IntoIterator<Item = (&'a String, &'a ActionKind)>,
{
    for (gesture, kind) in bindings {
        let gesture_name = gesture.clone();
        let kind = *kind;
        let media = media.clone();

        dispatcher.register(gesture, move |handedness, hand_index| {
            tracing::info!(
                "{} on hand {} ({}): {}",
                gesture_name,
                hand_index,
                handedness.unwrap_or("unknown"),
                kind.description()
            );
            match kind {
                ActionKind::VolumeUp => media.change_volume(VolumeDirection::Up),
                ActionKind::VolumeDown => media.change_volume(VolumeDirection::Down),
                ActionKind::MediaPlayPause => media.play_pause(),
                ActionKind::Quit => return true,
                ActionKind::Log => {}
            }
            false
        });
    }
}
