//! Engine configuration
//!
//! Every tunable of the analysis pipeline lives here with its documented
//! default. Configs are plain serde values so an embedding application can
//! persist them as JSON; missing fields fall back to the defaults.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Samples per analysis window
pub const DEFAULT_BUFFER_SIZE: usize = 2048;
/// Milliseconds of pitch history retained
pub const DEFAULT_HISTORY_WINDOW_MS: u64 = 30_000;
/// Lower bound of the detectable band, Hz
pub const DEFAULT_MIN_FREQUENCY: f32 = 60.0;
/// Upper bound of the detectable band, Hz
pub const DEFAULT_MAX_FREQUENCY: f32 = 2000.0;
/// CMNDF absolute threshold
pub const DEFAULT_YIN_THRESHOLD: f32 = 0.1;
/// Age below which the latest history entry counts as the live pitch, ms
pub const DEFAULT_LIVENESS_TIMEOUT_MS: u64 = 200;
/// RMS below which pitch detection is skipped
pub const DEFAULT_NOISE_GATE: f32 = 0.01;
/// Decibel value reported for silence
pub const DEFAULT_DB_FLOOR: f32 = -60.0;
/// One-pole smoothing factor for the display levels
pub const DEFAULT_LEVEL_SMOOTHING: f32 = 0.8;
/// Target interval between analysis frames, ms
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field is outside its valid range
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Frame analysis parameters
    pub analysis: AnalysisConfig,
    /// Microphone selection parameters
    pub selection: SelectionConfig,
    /// Target interval between analysis frames, in milliseconds
    pub frame_interval_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            selection: SelectionConfig::default(),
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to JSON
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every field against its documented range
    pub fn validate(&self) -> ConfigResult<()> {
        if self.frame_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "frame_interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        self.analysis.validate()?;
        self.selection.validate()
    }
}

/// Frame analysis parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Samples per analysis window (power of two)
    pub buffer_size: usize,
    /// Milliseconds of pitch history retained
    pub history_window_ms: u64,
    /// Lower bound of the detectable band, Hz
    pub min_frequency: f32,
    /// Upper bound of the detectable band, Hz
    pub max_frequency: f32,
    /// CMNDF absolute threshold
    pub yin_threshold: f32,
    /// Age below which the latest history entry is the live pitch, ms
    pub liveness_timeout_ms: u64,
    /// RMS below which pitch detection is skipped (0.001 - 0.1)
    pub noise_gate: f32,
    /// Decibel value reported for silence
    pub db_floor: f32,
    /// One-pole smoothing factor for display levels (0 disables)
    pub level_smoothing: f32,
    /// Stereo detection parameters
    pub stereo: StereoConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            history_window_ms: DEFAULT_HISTORY_WINDOW_MS,
            min_frequency: DEFAULT_MIN_FREQUENCY,
            max_frequency: DEFAULT_MAX_FREQUENCY,
            yin_threshold: DEFAULT_YIN_THRESHOLD,
            liveness_timeout_ms: DEFAULT_LIVENESS_TIMEOUT_MS,
            noise_gate: DEFAULT_NOISE_GATE,
            db_floor: DEFAULT_DB_FLOOR,
            level_smoothing: DEFAULT_LEVEL_SMOOTHING,
            stereo: StereoConfig::default(),
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !self.buffer_size.is_power_of_two() || self.buffer_size < 64 {
            return Err(ConfigError::InvalidValue {
                field: "buffer_size",
                reason: format!("{} is not a power of two >= 64", self.buffer_size),
            });
        }
        if !(0.001..=0.1).contains(&self.noise_gate) {
            return Err(ConfigError::InvalidValue {
                field: "noise_gate",
                reason: format!("{} is outside 0.001..=0.1", self.noise_gate),
            });
        }
        if self.min_frequency <= 0.0 || self.min_frequency >= self.max_frequency {
            return Err(ConfigError::InvalidValue {
                field: "min_frequency",
                reason: format!(
                    "band [{}, {}] is not a valid range",
                    self.min_frequency, self.max_frequency
                ),
            });
        }
        if !(0.0..1.0).contains(&self.yin_threshold) || self.yin_threshold == 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "yin_threshold",
                reason: format!("{} is outside (0, 1)", self.yin_threshold),
            });
        }
        if !(0.0..1.0).contains(&self.level_smoothing) {
            return Err(ConfigError::InvalidValue {
                field: "level_smoothing",
                reason: format!("{} is outside [0, 1)", self.level_smoothing),
            });
        }
        self.stereo.validate()
    }
}

/// Stereo detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StereoConfig {
    /// Frames without a stereo verdict before the session locks mono
    pub check_frames: u32,
    /// Minimum left/right difference for a sample to count
    pub sample_threshold: f32,
    /// Share of differing samples required for a stereo frame
    pub difference_ratio: f32,
    /// Leading samples of the window eligible for checking
    pub max_samples: usize,
    /// Check every n-th sample
    pub stride: usize,
}

impl Default for StereoConfig {
    fn default() -> Self {
        Self {
            check_frames: 10,
            sample_threshold: 0.005,
            difference_ratio: 1.0 / 50.0,
            max_samples: 200,
            stride: 5,
        }
    }
}

impl StereoConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.check_frames == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stereo.check_frames",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.stride == 0 {
            return Err(ConfigError::InvalidValue {
                field: "stereo.stride",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Microphone selection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Cap on the recent-selection list
    pub max_recent: usize,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_recent: crate::audio::selection::DEFAULT_MAX_RECENT,
        }
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_recent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "selection.max_recent",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
