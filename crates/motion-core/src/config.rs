use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),
    #[error("config parse error: {0}")]
    ParseError(String),
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Tuning for sampling, filtering and classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Sampling
    pub sample_rate_hz: u32,
    pub poll_interval_ms: u64,

    // Classification
    pub filter_alpha: f32,
    pub axis_threshold: f32,
    pub quiescent_threshold: u32,
    pub max_run_length: u32,
    pub history_length: usize,

    // Lifecycle
    pub init_timeout_ms: u64,

    // Gesture definitions; builtin set when absent
    pub gesture_file: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 100,
            poll_interval_ms: 10,
            filter_alpha: 0.1,
            axis_threshold: 2.0,
            quiescent_threshold: 16,
            max_run_length: 25,
            history_length: 100,
            init_timeout_ms: 5000,
            gesture_file: None,
        }
    }
}

impl EngineConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileNotFound(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `MOTION_*` environment variables.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn load_from_env() -> Self {
        let mut config = Self::default();

        if let Some(rate) = env_parse::<u32>("MOTION_SAMPLE_RATE_HZ") {
            config.sample_rate_hz = rate;
        }
        if let Some(alpha) = env_parse::<f32>("MOTION_FILTER_ALPHA") {
            config.filter_alpha = alpha;
        }
        if let Some(threshold) = env_parse::<f32>("MOTION_AXIS_THRESHOLD") {
            config.axis_threshold = threshold;
        }
        if let Some(timeout) = env_parse::<u64>("MOTION_INIT_TIMEOUT_MS") {
            config.init_timeout_ms = timeout;
        }
        if let Ok(path) = std::env::var("MOTION_GESTURE_FILE") {
            config.gesture_file = Some(PathBuf::from(path));
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 || self.sample_rate_hz > 1000 {
            return Err(ConfigError::ValidationError(
                "sample_rate_hz must be between 1 and 1000".to_string(),
            ));
        }
        if !(self.filter_alpha > 0.0 && self.filter_alpha <= 1.0) {
            return Err(ConfigError::ValidationError(
                "filter_alpha must be in (0, 1]".to_string(),
            ));
        }
        if !self.axis_threshold.is_finite() || self.axis_threshold <= 0.0 {
            return Err(ConfigError::ValidationError(
                "axis_threshold must be a positive number".to_string(),
            ));
        }
        if self.max_run_length == 0 {
            return Err(ConfigError::ValidationError(
                "max_run_length must be at least 1".to_string(),
            ));
        }
        // Runs saturate at max_run_length, so a larger threshold is never reached.
        if self.quiescent_threshold == 0 || self.quiescent_threshold > self.max_run_length {
            return Err(ConfigError::ValidationError(
                "quiescent_threshold must be between 1 and max_run_length".to_string(),
            ));
        }
        if self.history_length < 2 {
            return Err(ConfigError::ValidationError(
                "history_length must be at least 2".to_string(),
            ));
        }
        if self.init_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "init_timeout_ms must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.sample_rate_hz.max(1)))
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
