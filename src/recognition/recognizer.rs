//! Bridge to the external gesture classification model
//!
//! The model runs out of process in a helper that owns the model asset. Frames
//! go in on the helper's stdin, results come back as one JSON object per line
//! on its stdout. A reader thread converts each line and writes it into the
//! shared [`ResultStore`]; the frame loop never waits on the helper.
//!
//! Request framing per frame:
//! - `frame <timestamp_ms>\n` when the helper captures the camera itself
//! - `image <timestamp_ms> <width> <height> <channels>\n` followed by the raw
//!   pixel bytes when the caller supplies pixels
//!
//! Result line shape (MediaPipe gesture recognizer output):
//! `{"gestures": [[{"category_name": "03_fist", "score": 0.93}]],
//!   "handedness": [[{"category_name": "Left"}]],
//!   "hand_landmarks": [[{"x": 0.4, "y": 0.6, "z": 0.0}, ...]]}`

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Sender, TrySendError};
use serde::Deserialize;

use super::{Landmark, ResultStore};

/// Errors from the recognizer bridge
#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    #[error("Gesture model not found at {0}")]
    ModelMissing(PathBuf),

    #[error("No recognizer helper command configured")]
    NoHelper,

    #[error("Failed to start recognizer helper {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Recognizer helper is not running")]
    Disconnected,

    #[error("Malformed recognition result: {0}")]
    Malformed(String),

    #[error("Recognizer reported an error: {0}")]
    Helper(String),
}

/// A camera frame submitted for recognition
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Milliseconds since the stream started; must increase monotonically
    pub timestamp_ms: u64,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    /// Raw interleaved pixels, `None` when the helper captures frames itself
    pub pixels: Option<Vec<u8>>,
}

impl Frame {
    /// A frame that only carries a timestamp.
    pub fn tick(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            ..Default::default()
        }
    }

    fn write_request<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        match &self.pixels {
            Some(pixels) => {
                writeln!(
                    out,
                    "image {} {} {} {}",
                    self.timestamp_ms, self.width, self.height, self.channels
                )?;
                out.write_all(pixels)?;
            }
            None => writeln!(out, "frame {}", self.timestamp_ms)?,
        }
        out.flush()
    }
}

/// Something that yields camera frames.
pub trait FrameSource {
    /// Next frame, or `None` when the source is exhausted or closed.
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Asynchronous gesture recognizer.
///
/// Results are delivered later through whatever [`ResultStore`] the
/// implementation was built with.
pub trait Recognizer {
    /// Submit a frame without waiting for its result.
    fn recognize_async(&mut self, frame: &Frame) -> Result<(), RecognitionError>;
}

/// Paced frame source for helpers that own the camera.
///
/// Emits timestamp-only frames at a fixed rate.
pub struct TickFrameSource {
    interval: Duration,
    started: Instant,
    next_deadline: Instant,
    remaining: Option<u64>,
}

impl TickFrameSource {
    pub fn new(frames_per_second: u32) -> Self {
        let fps = frames_per_second.max(1);
        let now = Instant::now();
        Self {
            interval: Duration::from_secs(1) / fps,
            started: now,
            next_deadline: now,
            remaining: None,
        }
    }

    /// Stop after `frames` frames.
    pub fn with_limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl FrameSource for TickFrameSource {
    fn next_frame(&mut self) -> Option<Frame> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return None;
            }
            *remaining -= 1;
        }

        let now = Instant::now();
        if self.next_deadline > now {
            thread::sleep(self.next_deadline - now);
        }
        // Don't try to catch up after a slow tick
        self.next_deadline = Instant::now().max(self.next_deadline) + self.interval;

        Some(Frame::tick(self.started.elapsed().as_millis() as u64))
    }
}

#[derive(Debug, Deserialize)]
struct Category {
    category_name: String,
    #[serde(default)]
    #[allow(dead_code)]
    score: f32,
}

#[derive(Debug, Deserialize)]
struct RawResult {
    #[serde(default)]
    gestures: Vec<Vec<Category>>,
    #[serde(default)]
    handedness: Vec<Vec<Category>>,
    #[serde(default)]
    hand_landmarks: Vec<Vec<Landmark>>,
    #[serde(default)]
    error: Option<String>,
}

/// Per-hand top-1 classification extracted from one recognizer result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    pub gestures: Vec<Option<String>>,
    pub handedness: Vec<Option<String>>,
    pub landmarks: Vec<Vec<Landmark>>,
}

impl Classification {
    /// Parse one result line from the helper.
    pub fn from_json_line(line: &str) -> Result<Self, RecognitionError> {
        let raw: RawResult = serde_json::from_str(line)
            .map_err(|e| RecognitionError::Malformed(e.to_string()))?;
        if let Some(error) = raw.error {
            return Err(RecognitionError::Helper(error));
        }
        Ok(raw.into())
    }
}

impl From<RawResult> for Classification {
    fn from(raw: RawResult) -> Self {
        // Categories arrive sorted by score, so the first one is the top-1
        let top = |categories: Vec<Vec<Category>>| -> Vec<Option<String>> {
            categories
                .into_iter()
                .map(|c| c.into_iter().next().map(|c| c.category_name))
                .collect()
        };

        Self {
            gestures: top(raw.gestures),
            handedness: top(raw.handedness),
            landmarks: raw.hand_landmarks,
        }
    }
}

/// Recognizer running as a child process.
pub struct SubprocessRecognizer {
    child: Child,
    frames: Option<Sender<Frame>>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
    dropped_frames: u64,
}

impl SubprocessRecognizer {
    /// Start the helper and its reader thread.
    ///
    /// `command` is the helper program followed by its own arguments;
    /// `--model <path>` and `--num-hands <n>` are appended.
    pub fn spawn(
        command: &[String],
        model_path: &Path,
        num_hands: u32,
        store: Arc<ResultStore>,
    ) -> Result<Self, RecognitionError> {
        if !model_path.is_file() {
            return Err(RecognitionError::ModelMissing(model_path.to_path_buf()));
        }

        let (program, args) = command.split_first().ok_or(RecognitionError::NoHelper)?;

        tracing::info!(
            "Starting recognizer helper: {} (model={}, hands={})",
            program,
            model_path.display(),
            num_hands
        );

        let mut child = Command::new(program)
            .args(args)
            .arg("--model")
            .arg(model_path)
            .arg("--num-hands")
            .arg(num_hands.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| RecognitionError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(RecognitionError::Disconnected)?;
        let stdout = child.stdout.take().ok_or(RecognitionError::Disconnected)?;

        let reader = thread::spawn(move || read_results(BufReader::new(stdout), &store));

        // One frame in flight; newer frames are dropped while the helper is busy
        let (tx, rx) = crossbeam_channel::bounded::<Frame>(1);
        let writer = thread::spawn(move || write_frames(stdin, rx));

        Ok(Self {
            child,
            frames: Some(tx),
            writer: Some(writer),
            reader: Some(reader),
            dropped_frames: 0,
        })
    }

    /// Frames skipped because the helper had not taken the previous one yet
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }
}

impl Recognizer for SubprocessRecognizer {
    fn recognize_async(&mut self, frame: &Frame) -> Result<(), RecognitionError> {
        let tx = self.frames.as_ref().ok_or(RecognitionError::Disconnected)?;
        match tx.try_send(frame.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped_frames += 1;
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(RecognitionError::Disconnected),
        }
    }
}

impl Drop for SubprocessRecognizer {
    fn drop(&mut self) {
        // The writer may be blocked on a full pipe, so stop the helper first
        self.frames.take();
        let _ = self.child.kill();
        let _ = self.child.wait();

        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        tracing::info!(
            "Recognizer helper stopped ({} frames dropped)",
            self.dropped_frames
        );
    }
}

fn write_frames(mut stdin: ChildStdin, frames: crossbeam_channel::Receiver<Frame>) {
    for frame in frames {
        if let Err(e) = frame.write_request(&mut stdin) {
            tracing::warn!("Recognizer helper stopped accepting frames: {}", e);
            break;
        }
    }
}

fn read_results<R: BufRead>(reader: R, store: &ResultStore) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!("Failed to read from recognizer helper: {}", e);
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if !line.starts_with('{') {
            tracing::debug!("Recognizer helper: {}", line);
            continue;
        }

        store.apply(Classification::from_json_line(line));
    }
    tracing::debug!("Recognizer result stream closed");
}
