//! Analytics error taxonomy
//!
//! Only [`AnalysisError::InsufficientData`] and [`AnalysisError::InvalidConfig`]
//! stop a pipeline run. The other variants are produced by individual stages
//! and folded into the report as "stage skipped" outcomes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which side of the breakpoint a regime fit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegimeSide {
    High,
    Low,
}

impl std::fmt::Display for RegimeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegimeSide::High => write!(f, "high"),
            RegimeSide::Low => write!(f, "low"),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("no bars supplied")]
    InsufficientData,

    #[error("only {rows} eligible analysis rows, need at least {required}")]
    InsufficientHistory { rows: usize, required: usize },

    #[error("no percentile reading available")]
    NoData,

    #[error("{regime} volatility regime has {rows} rows, need more than {required}")]
    InsufficientRegimeData {
        regime: RegimeSide,
        rows: usize,
        required: usize,
    },

    #[error("regressor has zero variance across {rows} rows")]
    DegenerateRegression { rows: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
