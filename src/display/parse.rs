//! Parsers for monitor layout tool output

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

use super::{DisplayError, MonitorGeometry};

/// `WxH+X+Y` geometry as printed by xrandr
static GEOMETRY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)x(\d+)\+(-?\d+)\+(-?\d+)").unwrap());

/// Parse `xrandr --query` output.
///
/// Only lines for connected outputs with an active mode (`WxH+X+Y`) are
/// returned; disabled outputs have no geometry and are skipped.
pub fn parse_xrandr(output: &str) -> Vec<MonitorGeometry> {
    output
        .lines()
        .filter(|line| line.contains(" connected"))
        .filter_map(|line| {
            let mut parts = line.trim().splitn(2, char::is_whitespace);
            let name = parts.next()?;
            let rest = parts.next().unwrap_or_default();
            let caps = GEOMETRY_PATTERN.captures(rest)?;

            Some(MonitorGeometry {
                name: name.to_string(),
                width: caps[1].parse().ok()?,
                height: caps[2].parse().ok()?,
                offset_x: caps[3].parse().ok()?,
                offset_y: caps[4].parse().ok()?,
                is_primary: rest.split_whitespace().any(|w| w == "primary"),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct HyprMonitor {
    name: String,
    x: i32,
    y: i32,
    width: u32,
    height: u32,
    #[serde(default)]
    focused: bool,
}

/// Parse `hyprctl -j monitors`. The focused monitor counts as primary.
pub fn parse_hyprctl_monitors(json: &str) -> Result<Vec<MonitorGeometry>, DisplayError> {
    let monitors: Vec<HyprMonitor> =
        serde_json::from_str(json).map_err(|e| DisplayError::Parse(e.to_string()))?;

    Ok(monitors
        .into_iter()
        .filter(|m| m.width > 0 && m.height > 0)
        .map(|m| MonitorGeometry {
            name: m.name,
            width: m.width,
            height: m.height,
            offset_x: m.x,
            offset_y: m.y,
            is_primary: m.focused,
        })
        .collect())
}

/// Parse the `dimensions:` line of `xdpyinfo` into a whole-screen size.
pub fn parse_xdpyinfo(output: &str) -> Option<(u32, u32)> {
    let line = output.lines().find(|l| l.contains("dimensions:"))?;
    let dims = line.split_whitespace().nth(1)?;
    let (w, h) = dims.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}
