//! Thread-safe buffer for the latest recognition result
//!
//! The recognizer delivers results on its own background thread; the frame
//! loop polls whatever is newest. A single mutex guards the whole triple so
//! a reader never sees gestures from one write next to landmarks from
//! another. Every read hands out an owned copy.

use parking_lot::Mutex;
use std::time::Instant;

use super::{Classification, FrameResult, Landmark, RecognitionError};

/// Latest-value store shared between the recognizer callback and the frame loop
#[derive(Debug, Default)]
pub struct ResultStore {
    inner: Mutex<FrameResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the stored result with copies of the given sequences.
    pub fn set(
        &self,
        gestures: &[Option<String>],
        handedness: &[Option<String>],
        landmarks: &[Vec<Landmark>],
    ) {
        // Copy outside the lock so writers hold it as briefly as possible
        let next = FrameResult {
            gestures: gestures.to_vec(),
            handedness: handedness.to_vec(),
            landmarks: landmarks.to_vec(),
            timestamp: Some(Instant::now()),
        };
        *self.inner.lock() = next;
    }

    /// Store the outcome of converting one recognizer callback.
    ///
    /// A failed conversion empties the store instead of leaving the previous
    /// frame's hands in place. Never fails.
    pub fn apply(&self, outcome: Result<Classification, RecognitionError>) {
        match outcome {
            Ok(c) => self.set(&c.gestures, &c.handedness, &c.landmarks),
            Err(e) => {
                tracing::debug!("Discarding malformed recognition result: {}", e);
                self.set(&[], &[], &[]);
            }
        }
    }

    /// Owned copy of the current result.
    pub fn snapshot(&self) -> FrameResult {
        self.inner.lock().clone()
    }

    pub fn gestures(&self) -> (Vec<Option<String>>, Option<Instant>) {
        let guard = self.inner.lock();
        (guard.gestures.clone(), guard.timestamp)
    }

    pub fn handedness(&self) -> (Vec<Option<String>>, Option<Instant>) {
        let guard = self.inner.lock();
        (guard.handedness.clone(), guard.timestamp)
    }

    pub fn landmarks(&self) -> (Vec<Vec<Landmark>>, Option<Instant>) {
        let guard = self.inner.lock();
        (guard.landmarks.clone(), guard.timestamp)
    }

    /// Time of the last update, `None` if never set or cleared
    pub fn last_update(&self) -> Option<Instant> {
        self.inner.lock().timestamp
    }

    /// Drop the stored result and reset the timestamp.
    pub fn clear(&self) {
        *self.inner.lock() = FrameResult::default();
    }
}
