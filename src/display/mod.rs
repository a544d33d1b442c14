//! Monitor geometry discovery and selection
//!
//! Discovers connected monitors from the compositor (`hyprctl`), X11
//! (`xrandr`), or the whole-screen size (`xdpyinfo`), and picks the monitor
//! that normalized pointer coordinates map onto.

pub mod parse;

pub use parse::{parse_hyprctl_monitors, parse_xdpyinfo, parse_xrandr};

use parking_lot::Mutex;
use std::time::{Duration, Instant};

use crate::config::DisplayConfig;
use crate::platform::{self, CommandError};

/// Screen size assumed when nothing can be queried
pub const DEFAULT_SCREEN: MonitorBox = MonitorBox {
    width: 1920,
    height: 1080,
    offset_x: 0,
    offset_y: 0,
};

/// Errors from monitor discovery
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Failed to parse monitor layout: {0}")]
    Parse(String),

    #[error("No monitors reported by {0}")]
    NoMonitors(&'static str),
}

/// One connected monitor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorGeometry {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub is_primary: bool,
}

impl MonitorGeometry {
    pub fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn as_box(&self) -> MonitorBox {
        MonitorBox {
            width: self.width,
            height: self.height,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
        }
    }
}

/// Target rectangle in virtual-screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorBox {
    pub width: u32,
    pub height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl MonitorBox {
    /// Whole-screen box at the origin.
    pub fn screen(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            offset_x: 0,
            offset_y: 0,
        }
    }

    /// Map a normalized coordinate in [0, 1] to an absolute pixel.
    pub fn to_pixel(&self, nx: f64, ny: f64) -> (i32, i32) {
        let span = |dim: u32| f64::from(dim.saturating_sub(1));
        (
            self.offset_x + (nx * span(self.width)) as i32,
            self.offset_y + (ny * span(self.height)) as i32,
        )
    }
}

impl std::fmt::Display for MonitorBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}+{}+{}",
            self.width, self.height, self.offset_x, self.offset_y
        )
    }
}

/// Pick the monitor to map onto.
///
/// Order: exact `target` name, primary (when `prefer_primary`), the monitor
/// at (0, 0), then the largest by area.
pub fn select_monitor<'a>(
    monitors: &'a [MonitorGeometry],
    target: Option<&str>,
    prefer_primary: bool,
) -> Option<&'a MonitorGeometry> {
    if let Some(target) = target {
        if let Some(m) = monitors.iter().find(|m| m.name == target) {
            return Some(m);
        }
    }

    if prefer_primary {
        if let Some(m) = monitors.iter().find(|m| m.is_primary) {
            return Some(m);
        }
    }

    monitors
        .iter()
        .find(|m| m.offset_x == 0 && m.offset_y == 0)
        .or_else(|| monitors.iter().max_by_key(|m| m.area()))
}

/// Bounding box around every monitor, anchored at the origin.
pub fn bounding_box(monitors: &[MonitorGeometry]) -> Option<MonitorBox> {
    let right = monitors
        .iter()
        .map(|m| i64::from(m.offset_x) + i64::from(m.width))
        .max()?;
    let bottom = monitors
        .iter()
        .map(|m| i64::from(m.offset_y) + i64::from(m.height))
        .max()?;

    let width = u32::try_from(right).ok().filter(|w| *w > 0)?;
    let height = u32::try_from(bottom).ok().filter(|h| *h > 0)?;
    Some(MonitorBox::screen(width, height))
}

/// Source of screen geometry for pointer mapping.
pub trait ScreenGeometry {
    /// Geometry of the selected monitor, `None` when detection fails.
    fn monitor_box(&self) -> Option<MonitorBox>;

    /// Size of the whole virtual screen at (0, 0).
    fn virtual_screen(&self) -> MonitorBox;
}

/// Runs a layout tool and returns its stdout.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, CommandError>;
}

/// Runs layout tools as child processes with a timeout.
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, CommandError> {
        platform::run_command(program, args, self.timeout)
    }
}

struct Cached {
    monitors: Vec<MonitorGeometry>,
    fetched_at: Instant,
}

/// Monitor resolver backed by the desktop's layout tools.
///
/// Detection results are cached for `refresh_interval`.
pub struct MonitorResolver {
    target: Option<String>,
    prefer_primary: bool,
    refresh_interval: Duration,
    runner: Box<dyn CommandRunner>,
    hyprland: bool,
    cache: Mutex<Option<Cached>>,
}

impl MonitorResolver {
    pub fn new(config: &DisplayConfig, command_timeout: Duration) -> Self {
        Self::with_runner(
            config,
            Box::new(SystemRunner::new(command_timeout)),
            platform::is_hyprland(),
        )
    }

    /// Resolver over a custom runner. `hyprland` enables the `hyprctl` query.
    pub fn with_runner(
        config: &DisplayConfig,
        runner: Box<dyn CommandRunner>,
        hyprland: bool,
    ) -> Self {
        Self {
            target: config.target_monitor.clone().filter(|t| !t.is_empty()),
            prefer_primary: config.prefer_primary,
            refresh_interval: Duration::from_millis(config.refresh_interval_ms),
            runner,
            hyprland,
            cache: Mutex::new(None),
        }
    }

    /// All detected monitors, from cache when fresh.
    pub fn monitors(&self) -> Vec<MonitorGeometry> {
        let mut cache = self.cache.lock();
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.refresh_interval {
                return cached.monitors.clone();
            }
        }

        let monitors = self.detect_monitors();
        *cache = Some(Cached {
            monitors: monitors.clone(),
            fetched_at: Instant::now(),
        });
        monitors
    }

    /// Drop cached geometry so the next query re-detects.
    pub fn invalidate(&self) {
        *self.cache.lock() = None;
    }

    fn detect_monitors(&self) -> Vec<MonitorGeometry> {
        if self.hyprland {
            match self.query_hyprctl() {
                Ok(monitors) => return monitors,
                Err(e) => tracing::debug!("hyprctl monitor query failed: {}", e),
            }
        }

        match self.query_xrandr() {
            Ok(monitors) => return monitors,
            Err(e) => tracing::debug!("xrandr monitor query failed: {}", e),
        }

        match self.query_xdpyinfo() {
            Ok(monitors) => monitors,
            Err(e) => {
                tracing::debug!("xdpyinfo query failed: {}", e);
                Vec::new()
            }
        }
    }

    fn query_hyprctl(&self) -> Result<Vec<MonitorGeometry>, DisplayError> {
        let out = self.runner.run("hyprctl", &["-j", "monitors"])?;
        non_empty(parse_hyprctl_monitors(&out)?, "hyprctl")
    }

    fn query_xrandr(&self) -> Result<Vec<MonitorGeometry>, DisplayError> {
        let out = self.runner.run("xrandr", &["--query"])?;
        non_empty(parse_xrandr(&out), "xrandr")
    }

    fn query_xdpyinfo(&self) -> Result<Vec<MonitorGeometry>, DisplayError> {
        let out = self.runner.run("xdpyinfo", &[])?;
        let (width, height) = parse_xdpyinfo(&out).ok_or(DisplayError::NoMonitors("xdpyinfo"))?;
        Ok(vec![MonitorGeometry {
            name: "screen".to_string(),
            width,
            height,
            offset_x: 0,
            offset_y: 0,
            is_primary: true,
        }])
    }
}

fn non_empty(
    monitors: Vec<MonitorGeometry>,
    source: &'static str,
) -> Result<Vec<MonitorGeometry>, DisplayError> {
    if monitors.is_empty() {
        Err(DisplayError::NoMonitors(source))
    } else {
        Ok(monitors)
    }
}

impl ScreenGeometry for MonitorResolver {
    fn monitor_box(&self) -> Option<MonitorBox> {
        let monitors = self.monitors();
        let selected = select_monitor(&monitors, self.target.as_deref(), self.prefer_primary)?;
        tracing::debug!(
            "Selected monitor {} ({})",
            selected.name,
            selected.as_box()
        );
        Some(selected.as_box())
    }

    fn virtual_screen(&self) -> MonitorBox {
        if let Some((width, height)) = platform::virtual_screen_size() {
            return MonitorBox::screen(width, height);
        }
        bounding_box(&self.monitors()).unwrap_or_else(|| {
            tracing::warn!(
                "Could not determine screen size, assuming {}",
                DEFAULT_SCREEN
            );
            DEFAULT_SCREEN
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Runner with canned stdout per program; unknown programs are missing
    #[derive(Default)]
    struct FakeRunner {
        outputs: HashMap<&'static str, &'static str>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeRunner {
        fn with(mut self, program: &'static str, stdout: &'static str) -> Self {
            self.outputs.insert(program, stdout);
            self
        }
    }

    impl CommandRunner for FakeRunner {
        fn run(&self, program: &str, _args: &[&str]) -> Result<String, CommandError> {
            self.calls.lock().push(program.to_string());
            self.outputs
                .get(program)
                .map(|out| out.to_string())
                .ok_or_else(|| CommandError::NotFound(program.to_string()))
        }
    }

    const HYPRCTL: &str = r#"[{"name": "eDP-1", "width": 1920, "height": 1200, "x": 0, "y": 0, "focused": true}]"#;
    const XRANDR: &str = "HDMI-1 connected primary 1920x1080+0+0 (normal)\nDP-1 connected 2560x1440+1920+0 (normal)\n";
    const XDPYINFO: &str = "screen #0:\n  dimensions:    3000x2000 pixels (794x529 millimeters)\n";

    fn resolver(runner: FakeRunner, hyprland: bool) -> (Arc<Mutex<Vec<String>>>, MonitorResolver) {
        let calls = runner.calls.clone();
        let resolver =
            MonitorResolver::with_runner(&DisplayConfig::default(), Box::new(runner), hyprland);
        (calls, resolver)
    }

    fn monitor(name: &str, w: u32, h: u32, x: i32, y: i32, primary: bool) -> MonitorGeometry {
        MonitorGeometry {
            name: name.to_string(),
            width: w,
            height: h,
            offset_x: x,
            offset_y: y,
            is_primary: primary,
        }
    }

    fn layout() -> Vec<MonitorGeometry> {
        vec![
            monitor("HDMI-1", 1920, 1080, 0, 0, true),
            monitor("DP-1", 2560, 1440, 1920, 0, false),
        ]
    }

    #[test]
    fn test_select_target_name() {
        let monitors = layout();
        let selected = select_monitor(&monitors, Some("DP-1"), true).unwrap();
        assert_eq!(
            selected.as_box(),
            MonitorBox {
                width: 2560,
                height: 1440,
                offset_x: 1920,
                offset_y: 0
            }
        );
    }

    #[test]
    fn test_select_target_over_primary() {
        let monitors = vec![
            monitor("HDMI-1", 1920, 1080, 0, 0, false),
            monitor("DP-1", 2560, 1440, 1920, 0, true),
        ];
        let selected = select_monitor(&monitors, Some("DP-1"), true).unwrap();
        let b = selected.as_box();
        assert_eq!(
            (b.width, b.height, b.offset_x, b.offset_y),
            (2560, 1440, 1920, 0)
        );
    }

    #[test]
    fn test_select_missing_target_falls_back_to_primary() {
        let monitors = vec![
            monitor("DP-1", 2560, 1440, 0, 0, false),
            monitor("HDMI-1", 1920, 1080, 2560, 0, true),
        ];
        let selected = select_monitor(&monitors, Some("DP-9"), true).unwrap();
        assert_eq!(selected.name, "HDMI-1");
    }

    #[test]
    fn test_select_origin_when_primary_not_preferred() {
        let monitors = vec![
            monitor("DP-1", 2560, 1440, 1920, 0, true),
            monitor("HDMI-1", 1920, 1080, 0, 0, false),
        ];
        let selected = select_monitor(&monitors, None, false).unwrap();
        assert_eq!(selected.name, "HDMI-1");
    }

    #[test]
    fn test_select_largest_area_last() {
        let monitors = vec![
            monitor("A", 1280, 720, 100, 0, false),
            monitor("B", 3840, 2160, 1380, 0, false),
        ];
        let selected = select_monitor(&monitors, None, true).unwrap();
        assert_eq!(selected.name, "B");
    }

    #[test]
    fn test_select_empty() {
        assert!(select_monitor(&[], Some("DP-1"), true).is_none());
    }

    #[test]
    fn test_pixel_mapping_corners() {
        let screen = MonitorBox::screen(1920, 1080);
        assert_eq!(screen.to_pixel(0.0, 0.0), (0, 0));
        assert_eq!(screen.to_pixel(1.0, 1.0), (1919, 1079));
    }

    #[test]
    fn test_pixel_mapping_with_offset() {
        let right = MonitorBox {
            width: 2560,
            height: 1440,
            offset_x: 1920,
            offset_y: 0,
        };
        assert_eq!(right.to_pixel(0.0, 0.0), (1920, 0));
        assert_eq!(right.to_pixel(0.5, 0.5), (1920 + 1279, 719));
    }

    #[test]
    fn test_pixel_mapping_degenerate_box() {
        let empty = MonitorBox::screen(0, 0);
        assert_eq!(empty.to_pixel(1.0, 1.0), (0, 0));
    }

    #[test]
    fn test_bounding_box() {
        assert_eq!(bounding_box(&layout()), Some(MonitorBox::screen(4480, 1440)));
        assert_eq!(bounding_box(&[]), None);
    }

    #[test]
    fn test_monitor_box_display() {
        let b = MonitorBox {
            width: 2560,
            height: 1440,
            offset_x: 1920,
            offset_y: 0,
        };
        assert_eq!(b.to_string(), "2560x1440+1920+0");
    }

    #[test]
    fn test_hyprctl_queried_first_on_hyprland() {
        let runner = FakeRunner::default()
            .with("hyprctl", HYPRCTL)
            .with("xrandr", XRANDR);
        let (calls, resolver) = resolver(runner, true);

        let monitors = resolver.monitors();
        assert_eq!(monitors.len(), 1);
        assert_eq!(monitors[0].name, "eDP-1");
        assert_eq!(*calls.lock(), vec!["hyprctl"]);
    }

    #[test]
    fn test_hyprctl_skipped_off_hyprland() {
        let runner = FakeRunner::default()
            .with("hyprctl", HYPRCTL)
            .with("xrandr", XRANDR);
        let (calls, resolver) = resolver(runner, false);

        assert_eq!(resolver.monitors().len(), 2);
        assert_eq!(*calls.lock(), vec!["xrandr"]);
    }

    #[test]
    fn test_failed_hyprctl_falls_through_to_xrandr() {
        let runner = FakeRunner::default().with("xrandr", XRANDR);
        let (calls, resolver) = resolver(runner, true);

        let selected = resolver.monitor_box().unwrap();
        assert_eq!(selected, MonitorBox::screen(1920, 1080));
        assert_eq!(*calls.lock(), vec!["hyprctl", "xrandr"]);
    }

    #[test]
    fn test_empty_sources_fall_through_to_xdpyinfo() {
        let runner = FakeRunner::default()
            .with("hyprctl", "[]")
            .with("xrandr", "Screen 0: minimum 8 x 8\nDP-2 disconnected (normal)\n")
            .with("xdpyinfo", XDPYINFO);
        let (calls, resolver) = resolver(runner, true);

        assert_eq!(resolver.monitor_box(), Some(MonitorBox::screen(3000, 2000)));
        assert_eq!(*calls.lock(), vec!["hyprctl", "xrandr", "xdpyinfo"]);
    }

    #[test]
    fn test_monitor_box_none_when_every_source_fails() {
        let (calls, resolver) = resolver(FakeRunner::default(), true);

        assert_eq!(resolver.monitor_box(), None);
        assert_eq!(*calls.lock(), vec!["hyprctl", "xrandr", "xdpyinfo"]);
    }

    #[test]
    fn test_monitors_cached_until_invalidated() {
        let runner = FakeRunner::default().with("xrandr", XRANDR);
        let (calls, resolver) = resolver(runner, false);

        resolver.monitors();
        resolver.monitors();
        assert_eq!(calls.lock().len(), 1);

        resolver.invalidate();
        resolver.monitors();
        assert_eq!(calls.lock().len(), 2);
    }

    #[test]
    fn test_resolver_virtual_screen_is_positive() {
        let resolver = MonitorResolver::new(&DisplayConfig::default(), Duration::from_millis(500));
        let screen = resolver.virtual_screen();
        assert!(screen.width > 0);
        assert!(screen.height > 0);
    }
}
