//! Core data types used across the analytics pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for volatility bar data
#[derive(Debug, Error, PartialEq)]
pub enum BarValidationError {
    #[error("high ({high}) must be >= low ({low})")]
    HighLessThanLow { high: f64, low: f64 },

    #[error("close ({0}) must be >= 0")]
    NegativeClose(f64),

    #[error("close ({close}) must be between low ({low}) and high ({high})")]
    CloseOutOfRange { close: f64, low: f64, high: f64 },

    #[error("values must be finite: open={open}, high={high}, low={low}, close={close}")]
    NonFiniteValue {
        open: f64,
        high: f64,
        low: f64,
        close: f64,
    },
}

/// Daily implied-volatility bar.
///
/// Values are unannualized per-period volatility; `close` is the implied-vol
/// proxy. Volume is carried as reported by the feed (IV feeds commonly report
/// `-1` when no volume is available).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl Bar {
    /// Create a new bar with validation
    pub fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    ) -> Result<Self, BarValidationError> {
        let bar = Self::new_unchecked(date, open, high, low, close, volume);
        bar.validate()?;
        Ok(bar)
    }

    /// Create a bar without validation (for trusted sources or synthetic series)
    pub fn new_unchecked(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: i64,
    ) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Bar whose OHLC values all equal `close`
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        Self::new_unchecked(date, close, close, close, close, -1)
    }

    /// Validate the bar data
    pub fn validate(&self) -> Result<(), BarValidationError> {
        if ![self.open, self.high, self.low, self.close]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(BarValidationError::NonFiniteValue {
                open: self.open,
                high: self.high,
                low: self.low,
                close: self.close,
            });
        }

        if self.close < 0.0 {
            return Err(BarValidationError::NegativeClose(self.close));
        }

        if self.high < self.low {
            return Err(BarValidationError::HighLessThanLow {
                high: self.high,
                low: self.low,
            });
        }

        if self.close < self.low || self.close > self.high {
            return Err(BarValidationError::CloseOutOfRange {
                close: self.close,
                low: self.low,
                high: self.high,
            });
        }

        Ok(())
    }
}

/// Instrument symbol using Arc<str> for cheap cloning
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(#[serde(with = "arc_str_serde")] std::sync::Arc<str>);

mod arc_str_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::sync::Arc;

    pub fn serialize<S>(value: &Arc<str>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Arc<str>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Arc::from(s.as_str()))
    }
}

impl Symbol {
    /// Symbols are normalized to upper case
    pub fn new(s: impl AsRef<str>) -> Self {
        Symbol(std::sync::Arc::from(s.as_ref().trim().to_uppercase().as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Annualized implied volatility at one date
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolPoint {
    pub date: NaiveDate,
    pub vol: f64,
}

/// Rolling percentile rank at one date; `None` during the warmup window
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentilePoint {
    pub date: NaiveDate,
    pub percentile: Option<f64>,
}

/// One eligible observation for the forward-volatility regressions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRow {
    pub date: NaiveDate,
    pub current_vol: f64,
    pub forward_vol: f64,
    /// `forward_vol - current_vol`
    pub vol_diff: f64,
    pub vol_percentile: f64,
}
