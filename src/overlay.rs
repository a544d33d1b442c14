//! Per-hand labels for a preview overlay

use std::collections::BTreeMap;

use crate::recognition::{landmarks, FrameResult, Landmark};

/// Text drawn next to one hand
#[derive(Debug, Clone, PartialEq)]
pub struct HandLabel {
    pub hand_index: usize,
    /// `"<handedness> <gesture>"`, either part may be missing
    pub text: String,
    /// Wrist landmark the label is anchored to
    pub anchor: Landmark,
}

/// Compose the label for one hand, `None` when the hand has no landmarks or
/// nothing to say.
pub fn hand_label(frame: &FrameResult, hand_index: usize) -> Option<HandLabel> {
    let anchor = *frame.landmarks(hand_index)?.get(landmarks::WRIST)?;

    let text = match (frame.handedness(hand_index), frame.gesture(hand_index)) {
        (Some(hand), Some(gesture)) => format!("{} {}", hand, gesture),
        (Some(hand), None) => hand.to_string(),
        (None, Some(gesture)) => gesture.to_string(),
        (None, None) => return None,
    };

    Some(HandLabel {
        hand_index,
        text,
        anchor,
    })
}

/// Labels for every hand that has landmarks.
pub fn hand_labels(frame: &FrameResult) -> Vec<HandLabel> {
    (0..frame.landmarks.len())
        .filter_map(|i| hand_label(frame, i))
        .collect()
}

/// Visual feedback hook run once per frame, after hold detection.
pub trait Overlay {
    fn render(&mut self, frame: &FrameResult);
}

/// Overlay that logs label changes instead of drawing.
#[derive(Debug, Default)]
pub struct LogOverlay {
    shown: BTreeMap<usize, String>,
}

impl LogOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, hand_index: usize) -> Option<&str> {
        self.shown.get(&hand_index).map(String::as_str)
    }
}

impl Overlay for LogOverlay {
    fn render(&mut self, frame: &FrameResult) {
        let labels = hand_labels(frame);

        for label in &labels {
            if self.current(label.hand_index) != Some(label.text.as_str()) {
                tracing::debug!(
                    "Hand {}: {} at ({:.2}, {:.2})",
                    label.hand_index,
                    label.text,
                    label.anchor.x,
                    label.anchor.y
                );
            }
        }

        self.shown = labels.into_iter().map(|l| (l.hand_index, l.text)).collect();
    }
}
