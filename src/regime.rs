//! Percentile regime classification
//!
//! Maps the current percentile rank to one of five volatility regimes and,
//! independently, to a two-sided mean-reversion signal and a display
//! highlight. The three use their own thresholds; none is derived from
//! another.

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};

/// Volatility regime relative to the trailing percentile window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolRegime {
    HighIv,
    AboveAvgIv,
    NormalVol,
    BelowAvgIv,
    LowIv,
}

impl VolRegime {
    pub fn label(&self) -> &'static str {
        match self {
            Self::HighIv => "HIGH IV",
            Self::AboveAvgIv => "ABOVE AVG IV",
            Self::NormalVol => "NORMAL VOL",
            Self::BelowAvgIv => "BELOW AVG IV",
            Self::LowIv => "LOW IV",
        }
    }
}

impl std::fmt::Display for VolRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Expected direction of mean reversion from an extreme reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReversionSignal {
    ExpectReversionDown,
    Neutral,
    ExpectReversionUp,
}

impl ReversionSignal {
    pub fn label(&self) -> &'static str {
        match self {
            Self::ExpectReversionDown => "EXPECT MEAN REVERSION DOWN",
            Self::Neutral => "NEUTRAL",
            Self::ExpectReversionUp => "EXPECT MEAN REVERSION UP",
        }
    }
}

impl std::fmt::Display for ReversionSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Coarse hot/cold flag for presenting the current reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VolHighlight {
    Elevated,
    Neutral,
    Depressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeClassification {
    pub percentile: f64,
    pub regime: VolRegime,
    pub signal: ReversionSignal,
    pub highlight: VolHighlight,
}

/// Regime section of a report; `NoData` is rendered as a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegimeReading {
    Classified(RegimeClassification),
    NoData,
}

impl RegimeReading {
    pub fn classification(&self) -> Option<&RegimeClassification> {
        match self {
            RegimeReading::Classified(c) => Some(c),
            RegimeReading::NoData => None,
        }
    }
}

/// Classify a percentile reading. Rules apply most extreme first.
pub fn classify(
    percentile: Option<f64>,
    config: &AnalysisConfig,
) -> AnalysisResult<RegimeClassification> {
    let percentile = match percentile {
        Some(p) if p.is_finite() => p,
        _ => return Err(AnalysisError::NoData),
    };

    let t = &config.thresholds;
    let regime = if percentile > t.high {
        VolRegime::HighIv
    } else if percentile > t.above_avg {
        VolRegime::AboveAvgIv
    } else if percentile > t.normal {
        VolRegime::NormalVol
    } else if percentile > t.below_avg {
        VolRegime::BelowAvgIv
    } else {
        VolRegime::LowIv
    };

    let signal = if percentile > config.reversion.upper {
        ReversionSignal::ExpectReversionDown
    } else if percentile < config.reversion.lower {
        ReversionSignal::ExpectReversionUp
    } else {
        ReversionSignal::Neutral
    };

    let highlight = if percentile > config.highlight.upper {
        VolHighlight::Elevated
    } else if percentile < config.highlight.lower {
        VolHighlight::Depressed
    } else {
        VolHighlight::Neutral
    };

    Ok(RegimeClassification {
        percentile,
        regime,
        signal,
        highlight,
    })
}

/// Same as [`classify`], folding `NoData` into [`RegimeReading::NoData`]
pub fn read(percentile: Option<f64>, config: &AnalysisConfig) -> RegimeReading {
    match classify(percentile, config) {
        Ok(c) => RegimeReading::Classified(c),
        Err(_) => RegimeReading::NoData,
    }
}
