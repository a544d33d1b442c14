//! Gesture loop integration tests for gesturectl.
//!
//! Drives the full pipeline (result store, hold detection, tracking,
//! dispatch) from a scripted recognizer against a recording pointer and a
//! fixed monitor layout.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use gesturectl_lib::config::Config;
use gesturectl_lib::display::{select_monitor, MonitorBox, MonitorGeometry, ScreenGeometry};
use gesturectl_lib::gestures::ActionKind;
use gesturectl_lib::input::{MediaControl, PointerControl};
use gesturectl_lib::pipeline::{run_loop, ExitReason, GesturePipeline};
use gesturectl_lib::recognition::{
    landmarks, Classification, Frame, Landmark, RecognitionError, Recognizer, ResultStore,
    TickFrameSource,
};

// =============================================================================
// Test Doubles
// =============================================================================

#[derive(Default)]
struct RecordingPointer {
    calls: Mutex<Vec<String>>,
}

impl RecordingPointer {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

impl PointerControl for RecordingPointer {
    fn move_cursor_absolute(&self, x: i32, y: i32) -> bool {
        self.calls.lock().unwrap().push(format!("move {} {}", x, y));
        true
    }

    fn press_button_hold(&self) -> bool {
        self.calls.lock().unwrap().push("press".to_string());
        true
    }

    fn release_button_hold(&self) -> bool {
        self.calls.lock().unwrap().push("release".to_string());
        true
    }

    fn is_holding(&self) -> bool {
        false
    }
}

/// Two monitors side by side, the right one selected by name
struct TwoMonitors;

impl ScreenGeometry for TwoMonitors {
    fn monitor_box(&self) -> Option<MonitorBox> {
        let monitors = vec![
            MonitorGeometry {
                name: "HDMI-1".to_string(),
                width: 1920,
                height: 1080,
                offset_x: 0,
                offset_y: 0,
                is_primary: true,
            },
            MonitorGeometry {
                name: "DP-1".to_string(),
                width: 2560,
                height: 1440,
                offset_x: 1920,
                offset_y: 0,
                is_primary: false,
            },
        ];
        select_monitor(&monitors, Some("DP-1"), true).map(MonitorGeometry::as_box)
    }

    fn virtual_screen(&self) -> MonitorBox {
        MonitorBox::screen(4480, 1440)
    }
}

enum Step {
    Result(Classification),
    Garbage,
    Disconnect,
    Quit,
}

/// Recognizer that answers each frame with the next scripted step
struct ScriptedRecognizer {
    store: Arc<ResultStore>,
    steps: VecDeque<Step>,
    quit: Arc<AtomicBool>,
}

impl Recognizer for ScriptedRecognizer {
    fn recognize_async(&mut self, _frame: &Frame) -> Result<(), RecognitionError> {
        match self.steps.pop_front() {
            Some(Step::Result(result)) => self.store.apply(Ok(result)),
            Some(Step::Garbage) => self
                .store
                .apply(Err(RecognitionError::Malformed("bad line".to_string()))),
            Some(Step::Disconnect) => return Err(RecognitionError::Disconnected),
            Some(Step::Quit) => self.quit.store(true, Ordering::SeqCst),
            None => {}
        }
        Ok(())
    }
}

fn hand(tip_x: f32, tip_y: f32) -> Vec<Landmark> {
    let mut lm = vec![Landmark::new(0.5, 0.5); landmarks::COUNT];
    lm[landmarks::INDEX_FINGER_TIP] = Landmark::new(tip_x, tip_y);
    lm
}

fn one_hand(gesture: Option<&str>) -> Step {
    Step::Result(Classification {
        gestures: vec![gesture.map(String::from)],
        handedness: vec![Some("Right".to_string())],
        landmarks: vec![hand(0.5, 0.5)],
    })
}

fn test_config() -> Config {
    let mut config = Config::default();
    let mut actions = BTreeMap::new();
    actions.insert("Victory".to_string(), ActionKind::Quit);
    actions.insert("OK".to_string(), ActionKind::Log);
    config.gestures.actions = actions;
    config
}

struct Harness {
    pointer: Arc<RecordingPointer>,
    store: Arc<ResultStore>,
    quit: Arc<AtomicBool>,
    pipeline: GesturePipeline,
}

impl Harness {
    fn new(config: &Config) -> Self {
        let pointer = Arc::new(RecordingPointer::default());
        let media = MediaControl::new(5, Duration::from_millis(100));
        let geometry: Arc<dyn ScreenGeometry> = Arc::new(TwoMonitors);
        let pipeline =
            GesturePipeline::from_config(config, pointer.clone(), Some(geometry), &media);
        Self {
            pointer,
            store: Arc::new(ResultStore::new()),
            quit: Arc::new(AtomicBool::new(false)),
            pipeline,
        }
    }

    fn run(&mut self, steps: Vec<Step>, frame_limit: u64) -> ExitReason {
        let mut recognizer = ScriptedRecognizer {
            store: self.store.clone(),
            steps: steps.into(),
            quit: self.quit.clone(),
        };
        let mut frames = TickFrameSource::new(1000).with_limit(frame_limit);
        run_loop(
            &mut self.pipeline,
            &mut frames,
            &mut recognizer,
            &self.store,
            &self.quit,
        )
    }
}

// =============================================================================
// Loop Behaviour
// =============================================================================

#[test]
fn test_full_session_tracks_holds_and_exits() {
    let mut h = Harness::new(&test_config());
    let steps = vec![
        one_hand(None),
        one_hand(Some("06_index")),
        one_hand(Some("03_fist")),
        one_hand(Some("03_fist")),
        one_hand(Some("03_fist")),
        one_hand(None),
        one_hand(Some("Victory")),
    ];

    let reason = h.run(steps, 100);

    assert_eq!(reason, ExitReason::GestureExit);
    // Centre of DP-1 (2560x1440 at +1920+0)
    assert_eq!(h.pointer.calls()[0], "move 3199 719");
    assert_eq!(h.pointer.count("press"), 1);

    let calls = h.pointer.calls();
    let press = calls.iter().position(|c| c == "press").unwrap();
    let release = calls.iter().position(|c| c == "release").unwrap();
    assert!(press < release);
}

#[test]
fn test_quit_flag_releases_held_button() {
    let mut h = Harness::new(&test_config());
    let steps = vec![one_hand(Some("03_fist")), Step::Quit];

    let reason = h.run(steps, 100);

    assert_eq!(reason, ExitReason::QuitRequested);
    assert_eq!(h.pointer.calls(), vec!["press", "release"]);
}

#[test]
fn test_exhausted_source_stops_loop() {
    let mut h = Harness::new(&test_config());

    let reason = h.run(vec![one_hand(Some("OK"))], 3);

    assert_eq!(reason, ExitReason::SourceClosed);
    // Only the cleanup release, nothing was held
    assert_eq!(h.pointer.calls(), vec!["release"]);
}

#[test]
fn test_disconnected_recognizer_stops_loop() {
    let mut h = Harness::new(&test_config());

    let reason = h.run(vec![one_hand(Some("03_fist")), Step::Disconnect], 100);

    assert_eq!(reason, ExitReason::RecognizerGone);
    assert_eq!(h.pointer.calls(), vec!["press", "release"]);
}

#[test]
fn test_malformed_result_clears_store() {
    let mut h = Harness::new(&test_config());

    let reason = h.run(vec![one_hand(Some("03_fist")), Step::Garbage], 4);

    assert_eq!(reason, ExitReason::SourceClosed);
    assert!(h.store.snapshot().is_empty());
    // The hand disappeared with the bad result, so the hold ended there
    assert_eq!(h.pointer.calls(), vec!["press", "release", "release"]);
}

#[test]
fn test_disabled_hold_and_tracking() {
    let mut config = test_config();
    config.hold.enabled = false;
    config.tracking.enabled = false;
    let mut h = Harness::new(&config);

    let steps = vec![one_hand(Some("06_index")), one_hand(Some("03_fist"))];
    let reason = h.run(steps, 3);

    assert_eq!(reason, ExitReason::SourceClosed);
    assert!(h.pointer.calls().is_empty());
}
