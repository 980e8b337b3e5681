//! Implied Volatility Regime Analytics
//!
//! Turns a daily implied-volatility series into a current reading, a rolling
//! percentile rank, a five-way regime classification, and a pair of
//! regime-conditioned regressions of forward volatility on current
//! volatility split at the point where the unconditional fit crosses `y = x`.
//!
//! The engine (`series` through `pipeline`) is pure and synchronous. Data
//! loading lives in [`data`], and the `iv-regime` binary renders reports.
//!
//! ```no_run
//! use iv_regime::{data, pipeline, Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let bars = data::load_csv("data/SPY_1d.csv")?;
//!     let report = pipeline::run(&bars, &config.analysis)?;
//!     println!("{}", serde_json::to_string_pretty(&report)?);
//!     Ok(())
//! }
//! ```

pub mod breakpoint;
pub mod config;
pub mod data;
pub mod error;
pub mod forward;
pub mod indicators;
pub mod pipeline;
pub mod regime;
pub mod regression;
pub mod report;
pub mod series;
pub mod types;

pub use config::{AnalysisConfig, Config};
pub use error::{AnalysisError, AnalysisResult};
pub use report::Report;
pub use types::*;
