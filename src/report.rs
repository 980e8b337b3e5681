//! Analysis report
//!
//! Aggregates the pipeline stages into one immutable value for the
//! presentation layer, and derives the qualitative insights from the
//! unconditional regressions.

use serde::{Deserialize, Serialize};

use crate::breakpoint::BreakpointAnalysis;
use crate::regime::RegimeReading;
use crate::series::CurrentState;
use crate::types::Symbol;

/// Behaviour implied by the `forward_vol ~ current_vol` slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForwardBehavior {
    /// slope < 1
    MeanReverting,
    /// slope >= 1
    Trending,
}

/// Behaviour implied by the `vol_diff ~ current_vol` slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiffBehavior {
    /// slope < 0: high volatility now predicts lower volatility later
    MeanReversion,
    /// slope >= 0
    Momentum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insights {
    pub forward: ForwardBehavior,
    pub diff: DiffBehavior,
}

impl Insights {
    pub fn from_analysis(analysis: &BreakpointAnalysis) -> Self {
        let forward = if analysis.unconditional.slope < 1.0 {
            ForwardBehavior::MeanReverting
        } else {
            ForwardBehavior::Trending
        };
        let diff = if analysis.diff.slope < 0.0 {
            DiffBehavior::MeanReversion
        } else {
            DiffBehavior::Momentum
        };
        Insights { forward, diff }
    }

    pub fn forward_message(&self) -> &'static str {
        match self.forward {
            ForwardBehavior::MeanReverting => {
                "Forward volatility tends to mean-revert (slope < 1)"
            }
            ForwardBehavior::Trending => "Forward volatility tends to trend (slope >= 1)",
        }
    }

    pub fn diff_message(&self) -> &'static str {
        match self.diff {
            DiffBehavior::MeanReversion => {
                "High current volatility predicts lower future volatility (mean reversion)"
            }
            DiffBehavior::Momentum => {
                "High current volatility predicts higher future volatility (momentum)"
            }
        }
    }
}

/// Regression section of a report
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegressionOutcome {
    Completed {
        rows: usize,
        analysis: BreakpointAnalysis,
        insights: Insights,
    },
    /// Too few eligible rows after windowing; no regression attempted
    InsufficientHistory { rows: usize, required: usize },
    /// Current volatility never varies across the eligible rows
    Degenerate { rows: usize },
}

impl RegressionOutcome {
    pub fn completed(rows: usize, analysis: BreakpointAnalysis) -> Self {
        RegressionOutcome::Completed {
            rows,
            analysis,
            insights: Insights::from_analysis(&analysis),
        }
    }

    pub fn analysis(&self) -> Option<&BreakpointAnalysis> {
        match self {
            RegressionOutcome::Completed { analysis, .. } => Some(analysis),
            _ => None,
        }
    }

    pub fn insights(&self) -> Option<&Insights> {
        match self {
            RegressionOutcome::Completed { insights, .. } => Some(insights),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<Symbol>,
    pub current: CurrentState,
    pub regime: RegimeReading,
    pub regression: RegressionOutcome,
}

impl Report {
    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }
}

pub fn summarize(
    current: CurrentState,
    regime: RegimeReading,
    regression: RegressionOutcome,
) -> Report {
    Report {
        symbol: None,
        current,
        regime,
        regression,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakpoint::{BreakpointMethod, RegimeFit};
    use crate::regression::RegressionResult;

    fn fit(slope: f64) -> RegressionResult {
        RegressionResult {
            slope,
            intercept: 0.1,
            r: 0.5,
            p_value: 0.01,
            std_err: 0.02,
            intercept_std_err: 0.01,
            sample_size: 50,
        }
    }

    fn analysis(slope1: f64, slope2: f64) -> BreakpointAnalysis {
        BreakpointAnalysis {
            unconditional: fit(slope1),
            diff: fit(slope2),
            breakpoint: 0.2,
            method: BreakpointMethod::IdentityIntersection,
            high: RegimeFit::InsufficientData { rows: 5, required: 10 },
            low: RegimeFit::InsufficientData { rows: 45, required: 10 },
        }
    }

    #[test]
    fn test_insights_mean_reverting() {
        let insights = Insights::from_analysis(&analysis(0.6, -0.4));
        assert_eq!(insights.forward, ForwardBehavior::MeanReverting);
        assert_eq!(insights.diff, DiffBehavior::MeanReversion);
    }

    #[test]
    fn test_insights_boundaries() {
        let insights = Insights::from_analysis(&analysis(1.0, 0.0));
        assert_eq!(insights.forward, ForwardBehavior::Trending);
        assert_eq!(insights.diff, DiffBehavior::Momentum);
    }

    #[test]
    fn test_outcome_accessors() {
        let done = RegressionOutcome::completed(50, analysis(0.6, -0.4));
        assert!(done.analysis().is_some());
        assert_eq!(done.insights().unwrap().forward, ForwardBehavior::MeanReverting);

        let skipped = RegressionOutcome::InsufficientHistory { rows: 3, required: 30 };
        assert!(skipped.analysis().is_none());
        assert!(skipped.insights().is_none());
    }

    #[test]
    fn test_outcome_serializes_with_status() {
        let skipped = RegressionOutcome::InsufficientHistory { rows: 3, required: 30 };
        let json = serde_json::to_value(skipped).unwrap();
        assert_eq!(json["status"], "insufficient_history");
        assert_eq!(json["rows"], 3);
    }
}
