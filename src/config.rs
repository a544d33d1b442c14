//! Configuration management for gesturectl
//!
//! Provides persistent settings storage with schema versioning and migrations.
//! Configuration is stored in `~/.gesturectl/config.json` (or the file named
//! by `GESTURECTL_CONFIG`) and cached in memory after the first load.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::gestures::ActionKind;

/// Current config schema version
const CURRENT_VERSION: u32 = 1;

/// Environment variable that overrides the config file location
pub const CONFIG_PATH_ENV: &str = "GESTURECTL_CONFIG";

/// Global config instance for caching
static CONFIG: OnceLock<RwLock<Config>> = OnceLock::new();

/// Errors from loading or saving configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unknown config version: {0}")]
    UnknownVersion(u32),
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Schema version for migrations
    pub version: u32,
    /// Gesture recognizer helper settings
    pub recognizer: RecognizerConfig,
    /// Fingertip cursor tracking
    pub tracking: TrackingConfig,
    /// Press-and-hold gesture
    pub hold: HoldConfig,
    /// Monitor selection
    pub display: DisplayConfig,
    /// OS command execution
    pub backend: BackendConfig,
    /// Gesture cooldowns and action bindings
    pub gestures: GestureConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            recognizer: RecognizerConfig::default(),
            tracking: TrackingConfig::default(),
            hold: HoldConfig::default(),
            display: DisplayConfig::default(),
            backend: BackendConfig::default(),
            gestures: GestureConfig::default(),
        }
    }
}

/// Recognizer helper configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognizerConfig {
    /// Helper program and its arguments
    pub helper_command: Vec<String>,
    /// Path to the gesture model asset (.task)
    pub model_path: PathBuf,
    /// Maximum number of hands to detect
    pub num_hands: u32,
    /// Frame submission rate
    pub frame_rate: u32,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            helper_command: vec![
                "python3".to_string(),
                get_config_dir()
                    .join("gesture_helper.py")
                    .to_string_lossy()
                    .into_owned(),
            ],
            model_path: get_config_dir()
                .join("models")
                .join("gesture_recognizer.task"),
            num_hands: 2,
            frame_rate: 30,
        }
    }
}

/// Cursor tracking configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub enabled: bool,
    /// EMA weight of the newest sample, in (0, 1]
    pub smoothing_alpha: f64,
    /// Movement amplification around the frame centre
    pub sensitivity: f64,
    pub invert_y: bool,
    /// Gesture that enables tracking
    pub track_gesture: String,
    /// Only track while the tracking gesture is shown
    pub require_gesture: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smoothing_alpha: 0.6,
            sensitivity: 1.2,
            invert_y: false,
            track_gesture: "06_index".to_string(),
            require_gesture: true,
        }
    }
}

/// Hold (drag) gesture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    pub enabled: bool,
    /// Gesture that holds the left button down
    pub gesture: String,
    /// Minimum time between press attempts per hand
    pub restart_cooldown_ms: u64,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gesture: "03_fist".to_string(),
            restart_cooldown_ms: 100,
        }
    }
}

/// Monitor selection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Output name to map the cursor onto (e.g. "DP-1")
    pub target_monitor: Option<String>,
    pub prefer_primary: bool,
    /// How long detected geometry is reused
    pub refresh_interval_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            target_monitor: None,
            prefer_primary: true,
            refresh_interval_ms: 2000,
        }
    }
}

/// OS command configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Subprocess timeout
    pub command_timeout_ms: u64,
    /// Volume change per gesture
    pub volume_step_percent: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 1000,
            volume_step_percent: 5,
        }
    }
}

/// Gesture cooldowns (seconds) and bound actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub cooldowns: BTreeMap<String, f64>,
    pub actions: BTreeMap<String, ActionKind>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        let cooldowns = [
            ("Open_Palm", 1.0),
            ("Closed_Fist", 1.0),
            ("Thumb_Up", 0.0),
            ("Thumb_Down", 0.0),
            ("Peace", 0.0),
            ("02_l", 0.0),
            ("03_fist", 0.1),
        ];
        let actions = [
            ("Open_Palm", ActionKind::Log),
            ("Closed_Fist", ActionKind::MediaPlayPause),
            ("Thumb_Up", ActionKind::VolumeUp),
            ("Thumb_Down", ActionKind::VolumeDown),
            ("Victory", ActionKind::Quit),
            ("02_l", ActionKind::Log),
            ("03_fist", ActionKind::Log),
            ("OK", ActionKind::Log),
        ];

        Self {
            cooldowns: cooldowns
                .into_iter()
                .map(|(name, secs)| (name.to_string(), secs))
                .collect(),
            actions: actions
                .into_iter()
                .map(|(name, kind)| (name.to_string(), kind))
                .collect(),
        }
    }
}

impl Config {
    /// Replace out-of-range values with usable ones, logging each fix.
    pub fn sanitize(&mut self) {
        let defaults = Config::default();

        let alpha = self.tracking.smoothing_alpha;
        if alpha.is_nan() || alpha <= 0.0 {
            tracing::warn!(
                "smoothing_alpha {} must be above 0, using {}",
                alpha,
                defaults.tracking.smoothing_alpha
            );
            self.tracking.smoothing_alpha = defaults.tracking.smoothing_alpha;
        } else if alpha > 1.0 {
            tracing::warn!("smoothing_alpha {} above 1, clamping", alpha);
            self.tracking.smoothing_alpha = 1.0;
        }

        let sensitivity = self.tracking.sensitivity;
        if !sensitivity.is_finite() || sensitivity <= 0.0 {
            tracing::warn!(
                "sensitivity {} must be a positive number, using {}",
                sensitivity,
                defaults.tracking.sensitivity
            );
            self.tracking.sensitivity = defaults.tracking.sensitivity;
        }

        if self.tracking.track_gesture.trim().is_empty() {
            tracing::warn!("Empty track_gesture, using {}", defaults.tracking.track_gesture);
            self.tracking.track_gesture = defaults.tracking.track_gesture;
        }

        if self.hold.gesture.trim().is_empty() {
            tracing::warn!("Empty hold gesture, using {}", defaults.hold.gesture);
            self.hold.gesture = defaults.hold.gesture;
        }

        if self.recognizer.num_hands == 0 {
            tracing::warn!("num_hands must be at least 1");
            self.recognizer.num_hands = 1;
        }

        if !(1..=120).contains(&self.recognizer.frame_rate) {
            tracing::warn!(
                "frame_rate {} out of range, clamping to 1..=120",
                self.recognizer.frame_rate
            );
            self.recognizer.frame_rate = self.recognizer.frame_rate.clamp(1, 120);
        }

        if self.backend.command_timeout_ms == 0 {
            tracing::warn!(
                "command_timeout_ms must be above 0, using {}",
                defaults.backend.command_timeout_ms
            );
            self.backend.command_timeout_ms = defaults.backend.command_timeout_ms;
        }

        if !(1..=100).contains(&self.backend.volume_step_percent) {
            tracing::warn!(
                "volume_step_percent {} out of range, clamping to 1..=100",
                self.backend.volume_step_percent
            );
            self.backend.volume_step_percent = self.backend.volume_step_percent.clamp(1, 100);
        }

        for (gesture, secs) in self.gestures.cooldowns.iter_mut() {
            if !secs.is_finite() || *secs < 0.0 {
                tracing::warn!("Cooldown {} for {} is invalid, using 0", secs, gesture);
                *secs = 0.0;
            }
        }
    }
}

/// Get the path to the config directory (~/.gesturectl)
pub fn get_config_dir() -> PathBuf {
    home_dir_or_fallback().join(".gesturectl")
}

/// Get the path to the config file
pub fn get_config_path() -> PathBuf {
    match std::env::var_os(CONFIG_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => get_config_dir().join("config.json"),
    }
}

/// Get the home directory, falling back to /tmp if unavailable
fn home_dir_or_fallback() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        tracing::error!("Could not determine home directory, using /tmp");
        PathBuf::from("/tmp")
    })
}

/// Load configuration from a file, migrating and sanitising it.
///
/// A missing file yields the defaults.
pub fn load_from_path(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::info!("Config file {} not found, using defaults", path.display());
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: Config = serde_json::from_str(&contents)?;

    let mut migrated = migrate_config(config, path)?;
    migrated.sanitize();
    Ok(migrated)
}

/// Save configuration to a file, creating parent directories.
pub fn save_to_path(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let contents = serde_json::to_string_pretty(config)?;
    fs::write(path, contents).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    tracing::info!("Config saved to {}", path.display());
    Ok(())
}

/// Migrate configuration from older schema versions
fn migrate_config(mut config: Config, path: &Path) -> Result<Config, ConfigError> {
    let original_version = config.version;

    // Apply migrations sequentially
    while config.version < CURRENT_VERSION {
        config = apply_migration(config)?;
    }

    if config.version > CURRENT_VERSION {
        return Err(ConfigError::UnknownVersion(config.version));
    }

    if config.version != original_version {
        tracing::info!(
            "Migrated config from version {} to {}",
            original_version,
            config.version
        );
        save_to_path(&config, path)?;
    }

    Ok(config)
}

/// Apply a single migration step
fn apply_migration(config: Config) -> Result<Config, ConfigError> {
    match config.version {
        // Version 0 -> 1: unversioned files predate the schema field
        0 => {
            let mut migrated = config;
            migrated.version = 1;
            Ok(migrated)
        }
        v => Err(ConfigError::UnknownVersion(v)),
    }
}

/// Get the global config instance
fn get_config_instance() -> &'static RwLock<Config> {
    CONFIG.get_or_init(|| {
        let path = get_config_path();
        let config = load_from_path(&path).unwrap_or_else(|e| {
            tracing::error!("Failed to load config, using defaults: {}", e);
            Config::default()
        });
        tracing::info!("Config loaded from {}", path.display());
        RwLock::new(config)
    })
}

/// Get the current configuration
///
/// The config is cached in memory and loaded from disk on first access.
pub fn get_config() -> Config {
    get_config_instance().read().clone()
}

/// Replace the configuration and persist it to disk.
pub fn set_config(mut config: Config) -> Result<(), ConfigError> {
    config.version = CURRENT_VERSION;
    config.sanitize();

    save_to_path(&config, &get_config_path())?;

    *get_config_instance().write() = config;
    tracing::info!("Configuration updated");
    Ok(())
}

/// Reset configuration to defaults and persist them.
pub fn reset_config() -> Result<Config, ConfigError> {
    let default_config = Config::default();
    save_to_path(&default_config, &get_config_path())?;

    *get_config_instance().write() = default_config.clone();

    tracing::info!("Configuration reset to defaults");
    Ok(default_config)
}
