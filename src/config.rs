//! Configuration for the airdrum hit pipeline.

use crate::core::{Classifier, KinematicsConfig, LevelTable, PeakConfig, ZoneLayout};
use crate::dispatch::PlaybackConfig;
use crate::pipeline::PipelineSettings;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// One pipeline is started per device
    pub devices: Vec<DeviceConfig>,

    /// Time between cycles of each pipeline
    #[serde(with = "duration_serde")]
    pub poll_interval: Duration,

    /// Samples kept per device window, `null` for unbounded
    pub window_capacity: Option<usize>,

    pub kinematics: KinematicsConfig,

    pub peaks: PeakConfig,

    /// Zone rectangles in evaluation order plus the z gate
    pub zones: ZoneLayout,

    /// Ascending intensity thresholds
    pub levels: LevelTable,

    pub playback: PlaybackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            devices: vec![
                DeviceConfig::new("drum1", "drum1.csv"),
                DeviceConfig::new("drum2", "drum2.csv"),
            ],
            poll_interval: Duration::from_secs(1),
            window_capacity: Some(100),
            kinematics: KinematicsConfig::default(),
            peaks: PeakConfig::default(),
            zones: ZoneLayout::dual_device(),
            levels: LevelTable::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl Config {
    /// Preset for a single sensor worn on one hand.
    ///
    /// The single-sensor rig never resets velocity or position and keeps
    /// every sample, so both reset intervals are 0 and the window is
    /// unbounded.
    pub fn single_device() -> Self {
        Self {
            devices: vec![DeviceConfig::new("drum", "drum.csv")],
            window_capacity: None,
            kinematics: KinematicsConfig {
                velocity_reset_interval: 0,
                displacement_reset_interval: 0,
                ..KinematicsConfig::default()
            },
            peaks: PeakConfig {
                height_threshold: 5.0,
                ..PeakConfig::default()
            },
            zones: ZoneLayout::single_device(),
            levels: LevelTable::single_device(),
            ..Self::default()
        }
    }

    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("airdrum")
            .join("config.json")
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.devices.is_empty() {
            return Err(invalid("at least one device is required"));
        }
        let mut names = HashSet::new();
        for device in &self.devices {
            if device.name.trim().is_empty() {
                return Err(invalid("device name is empty"));
            }
            if !names.insert(device.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "device {:?} is declared twice",
                    device.name
                )));
            }
        }

        if self.poll_interval.is_zero() {
            return Err(invalid("poll_interval must be positive"));
        }
        if self.window_capacity == Some(0) {
            return Err(invalid("window_capacity must be positive"));
        }

        let dt = self.kinematics.delta_t;
        if !dt.is_finite() || dt <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "delta_t must be a positive number, got {dt}"
            )));
        }

        if !self.peaks.height_threshold.is_finite() {
            return Err(invalid("peak height_threshold must be finite"));
        }
        if self.peaks.min_distance == 0 {
            return Err(invalid("peak min_distance must be at least 1"));
        }

        self.zones.validate()?;
        self.levels.validate()?;

        if self.playback.queue_capacity == 0 {
            return Err(invalid("playback queue_capacity must be positive"));
        }
        if self.playback.workers == 0 {
            return Err(invalid("playback workers must be positive"));
        }
        if matches!(&self.playback.command, Some(command) if command.is_empty()) {
            return Err(invalid("playback command is empty"));
        }

        Ok(())
    }

    /// Settings that are legal but probably wrong.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let reset = self.kinematics.max_reset_interval();
        if let Some(capacity) = self.window_capacity {
            if capacity < reset {
                warnings.push(format!(
                    "window_capacity {capacity} is smaller than the largest reset interval {reset}; \
                     integration never reaches a reset boundary"
                ));
            }
        }
        if self.window_capacity.is_none() {
            warnings.push(
                "window_capacity is unbounded; per-cycle work grows with the log".to_string(),
            );
        }
        if self.zones.boundaries.is_empty() {
            warnings.push("no zones configured; every peak will be a miss".to_string());
        }

        warnings
    }

    /// The processing parameters shared by every device pipeline.
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            window_capacity: self.window_capacity,
            kinematics: self.kinematics,
            peaks: self.peaks,
            classifier: Classifier::new(self.zones.clone(), self.levels.clone()),
        }
    }
}

/// One sensor and the log its acquisition process appends to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    pub log_path: PathBuf,
    /// Whether the first line of the log is a column header
    #[serde(default = "default_has_header")]
    pub has_header: bool,
}

impl DeviceConfig {
    pub fn new(name: impl Into<String>, log_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            log_path: log_path.into(),
            has_header: true,
        }
    }
}

fn default_has_header() -> bool {
    true
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration, stored as milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
