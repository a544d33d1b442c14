//! Volume and media playback commands
//!
//! Every command runs on a short-lived thread so the frame loop never waits
//! on the audio stack. Failures are logged and otherwise ignored.

use std::thread;
use std::time::Duration;

use crate::platform::run_command;

/// Volume direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeDirection {
    Up,
    Down,
}

/// Candidate volume commands in preference order
pub fn volume_commands(
    direction: VolumeDirection,
    step_percent: u32,
) -> Vec<(&'static str, Vec<String>)> {
    let sign = match direction {
        VolumeDirection::Up => '+',
        VolumeDirection::Down => '-',
    };

    vec![
        (
            "pactl",
            vec![
                "set-sink-volume".to_string(),
                "@DEFAULT_SINK@".to_string(),
                format!("{}{}%", sign, step_percent),
            ],
        ),
        (
            "wpctl",
            vec![
                "set-volume".to_string(),
                "@DEFAULT_AUDIO_SINK@".to_string(),
                format!("{}%{}", step_percent, sign),
            ],
        ),
        (
            "amixer",
            vec![
                "-q".to_string(),
                "sset".to_string(),
                "Master".to_string(),
                format!("{}%{}", step_percent, sign),
            ],
        ),
    ]
}

/// Fire-and-forget volume and playback control.
#[derive(Debug, Clone)]
pub struct MediaControl {
    step_percent: u32,
    timeout: Duration,
}

impl MediaControl {
    pub fn new(step_percent: u32, timeout: Duration) -> Self {
        Self {
            step_percent,
            timeout,
        }
    }

    /// Step the default sink volume.
    pub fn change_volume(&self, direction: VolumeDirection) {
        let commands = volume_commands(direction, self.step_percent);
        let timeout = self.timeout;
        thread::spawn(move || {
            for (program, args) in &commands {
                let args: Vec<&str> = args.iter().map(String::as_str).collect();
                match run_command(program, &args, timeout) {
                    Ok(_) => {
                        tracing::debug!("Volume {:?} via {}", direction, program);
                        return;
                    }
                    Err(e) => tracing::debug!("Volume change via {} failed: {}", program, e),
                }
            }
            tracing::warn!("Failed to change volume with any mixer command");
        });
    }

    /// Toggle playback of the active media player.
    pub fn play_pause(&self) {
        let timeout = self.timeout;
        thread::spawn(move || match run_command("playerctl", &["play-pause"], timeout) {
            Ok(_) => tracing::debug!("Toggled media playback"),
            Err(e) => tracing::warn!("Failed to toggle media playback: {}", e),
        });
    }
}
