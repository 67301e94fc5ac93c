//! TOML configuration loader with validation.
//!
//! Validation enforces the loop's preconditions before the thread starts:
//! nonzero sample period, nonzero counts-per-revolution, an ordered
//! saturation range, and finite gains. None of these are re-checked on
//! the hot path.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Configuration loading/validation error.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// File could not be read.
    #[error("config I/O: {0}")]
    Io(String),

    /// TOML parse error.
    #[error("config parse: {0}")]
    Parse(String),

    /// Parameter bounds violated.
    #[error("config validation: {0}")]
    Validation(String),
}

/// Complete validated loop configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoopConfig {
    /// Operator name recorded in the capture file.
    #[serde(default = "default_operator")]
    pub operator: String,

    /// Initial sample period BTI [ms]. Live-tunable afterwards.
    #[serde(default = "default_period_ms")]
    pub period_ms: f64,

    /// Initial proportional gain [V·s/rad].
    #[serde(default = "default_kp")]
    pub kp: f64,

    /// Initial integral gain [V/rad].
    #[serde(default = "default_ki")]
    pub ki: f64,

    /// Initial reference velocity [rpm].
    #[serde(default)]
    pub reference_rpm: f64,

    /// Encoder counts per motor revolution.
    #[serde(default = "default_counts_per_rev")]
    pub counts_per_rev: f64,

    /// Actuator saturation floor [V].
    #[serde(default = "default_v_min")]
    pub v_min: f64,

    /// Actuator saturation ceiling [V].
    #[serde(default = "default_v_max")]
    pub v_max: f64,
}

fn default_operator() -> String {
    "unknown".to_string()
}
fn default_period_ms() -> f64 {
    5.0
}
fn default_kp() -> f64 {
    0.104
}
fn default_ki() -> f64 {
    2.07
}
fn default_counts_per_rev() -> f64 {
    2048.0
}
fn default_v_min() -> f64 {
    -10.0
}
fn default_v_max() -> f64 {
    10.0
}

impl Default for LoopConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config must deserialize from defaults")
    }
}

impl LoopConfig {
    /// Initial period in seconds.
    #[inline]
    pub fn period_s(&self) -> f64 {
        self.period_ms / 1e3
    }

    /// Check all loop preconditions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.period_ms > 0.0) {
            return Err(ConfigError::Validation(format!(
                "period_ms must be positive, got {}",
                self.period_ms
            )));
        }
        if !(self.counts_per_rev > 0.0) {
            return Err(ConfigError::Validation(format!(
                "counts_per_rev must be positive, got {}",
                self.counts_per_rev
            )));
        }
        if !(self.v_min < self.v_max) {
            return Err(ConfigError::Validation(format!(
                "saturation range is empty: [{}, {}]",
                self.v_min, self.v_max
            )));
        }
        if !self.kp.is_finite() || !self.ki.is_finite() || !self.reference_rpm.is_finite() {
            return Err(ConfigError::Validation(
                "gains and reference must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load and validate a loop configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<LoopConfig, ConfigError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("failed to read {}: {e}", path.display())))?;
    let config: LoopConfig =
        toml::from_str(&text).map_err(|e| ConfigError::Parse(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

// ─── Tests ──────────────────────────────────────────────────────────
