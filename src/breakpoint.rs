//! Breakpoint regime regressions
//!
//! Fits `forward_vol ~ current_vol` over every row, takes the point where
//! that line crosses `y = x` as the regime breakpoint, splits the rows at it,
//! and fits `vol_diff ~ current_vol` separately on each side.
//!
//! When the unconditional slope is exactly 1 the fitted line is parallel to
//! `y = x` and never crosses it; the breakpoint then falls back to the median
//! current volatility and the report records which path was taken.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult, RegimeSide};
use crate::indicators;
use crate::regression::{linregress, RegressionResult};
use crate::types::AnalysisRow;

/// How the breakpoint was derived
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakpointMethod {
    /// `intercept / (1 - slope)`
    IdentityIntersection,
    /// Median current volatility, used when the slope is exactly 1
    MedianFallback,
}

/// Rows split at the breakpoint
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeSplit {
    pub breakpoint: f64,
    pub method: BreakpointMethod,
    /// `current_vol > breakpoint`
    pub high: Vec<AnalysisRow>,
    /// `current_vol <= breakpoint`
    pub low: Vec<AnalysisRow>,
}

/// Outcome of fitting one regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegimeFit {
    Fitted {
        fit: RegressionResult,
        /// Range of current volatility covered by the regime
        min_vol: f64,
        max_vol: f64,
    },
    InsufficientData {
        rows: usize,
        required: usize,
    },
    Degenerate {
        rows: usize,
    },
}

impl RegimeFit {
    pub fn fit(&self) -> Option<&RegressionResult> {
        match self {
            RegimeFit::Fitted { fit, .. } => Some(fit),
            _ => None,
        }
    }

    pub fn rows(&self) -> usize {
        match self {
            RegimeFit::Fitted { fit, .. } => fit.sample_size,
            RegimeFit::InsufficientData { rows, .. } | RegimeFit::Degenerate { rows } => *rows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakpointAnalysis {
    /// `forward_vol ~ current_vol` over all rows
    pub unconditional: RegressionResult,
    /// `vol_diff ~ current_vol` over all rows
    pub diff: RegressionResult,
    pub breakpoint: f64,
    pub method: BreakpointMethod,
    pub high: RegimeFit,
    pub low: RegimeFit,
}

impl BreakpointAnalysis {
    pub fn used_fallback(&self) -> bool {
        self.method == BreakpointMethod::MedianFallback
    }
}

/// Intersection of the unconditional line with `y = x`.
pub fn locate_breakpoint(
    unconditional: &RegressionResult,
    rows: &[AnalysisRow],
) -> AnalysisResult<(f64, BreakpointMethod)> {
    if unconditional.slope != 1.0 {
        let crossing = unconditional.intercept / (1.0 - unconditional.slope);
        if crossing.is_finite() {
            return Ok((crossing, BreakpointMethod::IdentityIntersection));
        }
    }

    let current: Vec<f64> = rows.iter().map(|r| r.current_vol).collect();
    let median = indicators::median(&current)
        .ok_or(AnalysisError::DegenerateRegression { rows: rows.len() })?;
    Ok((median, BreakpointMethod::MedianFallback))
}

/// Every row lands in exactly one side.
pub fn partition(rows: &[AnalysisRow], breakpoint: f64) -> (Vec<AnalysisRow>, Vec<AnalysisRow>) {
    rows.iter().partition(|r| r.current_vol > breakpoint)
}

pub fn split(rows: &[AnalysisRow], unconditional: &RegressionResult) -> AnalysisResult<RegimeSplit> {
    let (breakpoint, method) = locate_breakpoint(unconditional, rows)?;
    let (high, low) = partition(rows, breakpoint);
    Ok(RegimeSplit {
        breakpoint,
        method,
        high,
        low,
    })
}

/// Fit `vol_diff ~ current_vol` inside one regime
pub fn fit_regime(side: RegimeSide, rows: &[AnalysisRow], min_rows: usize) -> RegimeFit {
    if rows.len() <= min_rows {
        let err = AnalysisError::InsufficientRegimeData {
            regime: side,
            rows: rows.len(),
            required: min_rows,
        };
        warn!("{}", err);
        return RegimeFit::InsufficientData {
            rows: rows.len(),
            required: min_rows,
        };
    }

    let (x, y) = columns(rows, |r| r.vol_diff);
    match linregress(&x, &y) {
        Ok(fit) => {
            let (min_vol, max_vol) = indicators::min_max(&x).unwrap_or((f64::NAN, f64::NAN));
            RegimeFit::Fitted {
                fit,
                min_vol,
                max_vol,
            }
        }
        Err(e) => {
            warn!("{} volatility regime: {}", side, e);
            RegimeFit::Degenerate { rows: rows.len() }
        }
    }
}

/// Run the full breakpoint analysis over an analysis table.
pub fn analyze(rows: &[AnalysisRow], config: &AnalysisConfig) -> AnalysisResult<BreakpointAnalysis> {
    let (x, forward) = columns(rows, |r| r.forward_vol);
    let diff_y: Vec<f64> = rows.iter().map(|r| r.vol_diff).collect();

    let unconditional = linregress(&x, &forward)?;
    let diff = linregress(&x, &diff_y)?;

    let regimes = split(rows, &unconditional)?;
    match regimes.method {
        BreakpointMethod::IdentityIntersection => info!(
            "Breakpoint {:.4} (slope {:.4}, intercept {:.4})",
            regimes.breakpoint, unconditional.slope, unconditional.intercept
        ),
        BreakpointMethod::MedianFallback => warn!(
            "Unconditional slope is 1, breakpoint falls back to median {:.4}",
            regimes.breakpoint
        ),
    }

    let high = fit_regime(RegimeSide::High, &regimes.high, config.min_regime_rows);
    let low = fit_regime(RegimeSide::Low, &regimes.low, config.min_regime_rows);
    info!(
        "Regime rows: high {} / low {}",
        regimes.high.len(),
        regimes.low.len()
    );

    Ok(BreakpointAnalysis {
        unconditional,
        diff,
        breakpoint: regimes.breakpoint,
        method: regimes.method,
        high,
        low,
    })
}

fn columns(rows: &[AnalysisRow], y: impl Fn(&AnalysisRow) -> f64) -> (Vec<f64>, Vec<f64>) {
    rows.iter().map(|r| (r.current_vol, y(r))).unzip()
}
