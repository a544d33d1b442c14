//! Gesture recognition data model
//!
//! The classification model is an external collaborator. This module holds
//! the per-frame result it produces, the thread-safe buffer that hands those
//! results from the recognizer's background thread to the frame loop, and
//! the bridge that talks to the recognizer itself.
//!
//! Per-hand data arrives as three parallel sequences (gesture, handedness,
//! landmarks) indexed by hand. Their lengths are not guaranteed to match, so
//! every accessor treats an out-of-range index as "no data for this hand".

pub mod recognizer;
pub mod result_store;

pub use recognizer::{
    Classification, Frame, FrameSource, Recognizer, RecognitionError, SubprocessRecognizer,
    TickFrameSource,
};
pub use result_store::ResultStore;

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Hand landmark indices (MediaPipe hand landmark model convention)
pub mod landmarks {
    pub const WRIST: usize = 0;
    pub const INDEX_FINGER_TIP: usize = 8;
    /// Number of landmarks per detected hand
    pub const COUNT: usize = 21;
}

/// A single normalized hand landmark
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// X coordinate (0.0 to 1.0, normalized to image width)
    pub x: f32,
    /// Y coordinate (0.0 to 1.0, normalized to image height)
    pub y: f32,
    /// Depth relative to the wrist
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Latest recognition output for one frame.
///
/// The three sequences are aligned by hand index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameResult {
    /// Top-1 gesture name per hand, `None` when unrecognized
    pub gestures: Vec<Option<String>>,
    /// "Left"/"Right" per hand
    pub handedness: Vec<Option<String>>,
    /// 21 landmarks per hand
    pub landmarks: Vec<Vec<Landmark>>,
    /// When the result was stored; `None` before the first update
    pub timestamp: Option<Instant>,
}

impl FrameResult {
    /// Number of hand slots, the longest of the gesture and landmark sequences.
    pub fn hand_count(&self) -> usize {
        self.gestures.len().max(self.landmarks.len())
    }

    pub fn gesture(&self, hand_index: usize) -> Option<&str> {
        self.gestures.get(hand_index).and_then(|g| g.as_deref())
    }

    pub fn handedness(&self, hand_index: usize) -> Option<&str> {
        self.handedness.get(hand_index).and_then(|h| h.as_deref())
    }

    /// Landmarks for a hand, `None` when absent or empty.
    pub fn landmarks(&self, hand_index: usize) -> Option<&[Landmark]> {
        self.landmarks
            .get(hand_index)
            .map(Vec::as_slice)
            .filter(|lm| !lm.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty() && self.handedness.is_empty() && self.landmarks.is_empty()
    }
}
