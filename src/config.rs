//! Configuration management
//!
//! Handles loading and parsing of JSON configuration files with environment
//! variable support for the data directory. Every field has a default, so a
//! partial (or empty) JSON object is a valid configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, AnalysisResult};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub data: DataConfig,
}

impl Config {
    /// Load configuration from JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;

        config.apply_env();
        config
            .analysis
            .validate()
            .context("Invalid analysis configuration")?;

        Ok(config)
    }

    /// Overlay environment overrides
    pub fn apply_env(&mut self) {
        if let Ok(data_dir) = std::env::var("IV_REGIME_DATA_DIR") {
            self.data.data_dir = data_dir;
        }
    }
}

/// Numeric knobs of the analytics engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Periods per year; daily bars use 252 trading days
    pub annualization_factor: f64,
    /// Trailing window for the percentile rank
    pub percentile_window: usize,
    /// Length of the forward averaging window
    pub forward_window: usize,
    /// Minimum values a (possibly truncated) forward window must hold
    pub min_forward_periods: usize,
    /// Minimum eligible rows before any regression is attempted
    pub min_analysis_rows: usize,
    /// A regime is fitted only when it holds more than this many rows
    pub min_regime_rows: usize,
    pub thresholds: RegimeThresholds,
    pub reversion: BandThresholds,
    pub highlight: BandThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            annualization_factor: 252.0,
            percentile_window: 252,
            forward_window: 30,
            min_forward_periods: 1,
            min_analysis_rows: 30,
            min_regime_rows: 10,
            thresholds: RegimeThresholds::default(),
            reversion: BandThresholds {
                upper: 0.8,
                lower: 0.2,
            },
            highlight: BandThresholds {
                upper: 0.75,
                lower: 0.25,
            },
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> AnalysisResult<()> {
        if !(self.annualization_factor.is_finite() && self.annualization_factor > 0.0) {
            return Err(AnalysisError::InvalidConfig(format!(
                "annualization_factor must be positive, got {}",
                self.annualization_factor
            )));
        }
        if self.percentile_window == 0 {
            return Err(AnalysisError::InvalidConfig(
                "percentile_window must be at least 1".to_string(),
            ));
        }
        if self.forward_window == 0 {
            return Err(AnalysisError::InvalidConfig(
                "forward_window must be at least 1".to_string(),
            ));
        }
        if self.min_forward_periods == 0 || self.min_forward_periods > self.forward_window {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_forward_periods must be in 1..={}, got {}",
                self.forward_window, self.min_forward_periods
            )));
        }
        if self.min_analysis_rows < 3 {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_analysis_rows must be at least 3, got {}",
                self.min_analysis_rows
            )));
        }
        self.thresholds.validate()?;
        self.reversion.validate("reversion")?;
        self.highlight.validate("highlight")?;
        Ok(())
    }
}

/// Lower bounds (exclusive) of the five percentile regimes, most extreme first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegimeThresholds {
    pub high: f64,
    pub above_avg: f64,
    pub normal: f64,
    pub below_avg: f64,
}

impl Default for RegimeThresholds {
    fn default() -> Self {
        RegimeThresholds {
            high: 0.8,
            above_avg: 0.6,
            normal: 0.4,
            below_avg: 0.2,
        }
    }
}

impl RegimeThresholds {
    fn validate(&self) -> AnalysisResult<()> {
        let ordered = [1.0, self.high, self.above_avg, self.normal, self.below_avg, 0.0];
        if ordered.windows(2).all(|w| w[0] > w[1]) {
            Ok(())
        } else {
            Err(AnalysisError::InvalidConfig(format!(
                "regime thresholds must be strictly descending inside (0, 1): {:?}",
                self
            )))
        }
    }
}

/// Two-sided band: readings above `upper` or below `lower` are extreme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub upper: f64,
    pub lower: f64,
}

impl BandThresholds {
    fn validate(&self, name: &str) -> AnalysisResult<()> {
        if (0.0..=1.0).contains(&self.lower)
            && (0.0..=1.0).contains(&self.upper)
            && self.lower < self.upper
        {
            Ok(())
        } else {
            Err(AnalysisError::InvalidConfig(format!(
                "{} band must satisfy 0 <= lower < upper <= 1, got {:?}",
                name, self
            )))
        }
    }
}

/// Data collaborator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub data_dir: String,
    /// Seconds to wait for historical bars before giving up
    pub fetch_timeout_secs: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            data_dir: "data".to_string(),
            fetch_timeout_secs: 15,
        }
    }
}
