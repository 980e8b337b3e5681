//! Analysis entry point
//!
//! Runs every stage from raw bars to [`Report`]. Stateless: each call
//! recomputes everything from the bars it is given.

use tracing::{info, warn};

use crate::breakpoint;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::forward;
use crate::regime::{self, RegimeReading};
use crate::report::{self, RegressionOutcome, Report};
use crate::series::{self, CurrentState, PercentileSeries, VolatilitySeries};
use crate::types::Bar;

/// Derived series kept alongside the report for callers that chart them
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub vols: VolatilitySeries,
    pub percentiles: PercentileSeries,
    pub report: Report,
}

/// Run the full pipeline.
///
/// Only an empty input or an invalid configuration is an error; every later
/// shortfall is recorded in the report.
pub fn run(bars: &[Bar], config: &AnalysisConfig) -> AnalysisResult<Report> {
    run_with_series(bars, config).map(|out| out.report)
}

pub fn run_with_series(bars: &[Bar], config: &AnalysisConfig) -> AnalysisResult<PipelineOutput> {
    config.validate()?;

    let (vols, percentiles) = transform(bars, config)?;
    let current = CurrentState::from_series(&vols, &percentiles)?;
    info!(
        "Current IV {:.4} ({:.2}%) on {}, range {:.4} - {:.4}",
        current.current_vol,
        current.current_vol * 100.0,
        current.date,
        current.min_vol,
        current.max_vol
    );

    let regime = regime::read(current.current_percentile, config);
    match &regime {
        RegimeReading::Classified(c) => info!(
            "Regime {} at percentile {:.1}%, {}",
            c.regime,
            c.percentile * 100.0,
            c.signal
        ),
        RegimeReading::NoData => warn!(
            "No percentile reading: {} observations, window {}",
            vols.len(),
            config.percentile_window
        ),
    }

    let regression = regress(&vols, &percentiles, config);
    let report = report::summarize(current, regime, regression);

    Ok(PipelineOutput {
        vols,
        percentiles,
        report,
    })
}

/// Annualize and rank.
pub fn transform(
    bars: &[Bar],
    config: &AnalysisConfig,
) -> AnalysisResult<(VolatilitySeries, PercentileSeries)> {
    let vols = series::annualize(bars, config.annualization_factor)?;
    let percentiles = series::rolling_percentile(&vols, config.percentile_window);
    info!(
        "Annualized {} bars with sqrt({}) factor",
        vols.len(),
        config.annualization_factor
    );
    Ok((vols, percentiles))
}

fn regress(
    vols: &VolatilitySeries,
    percentiles: &PercentileSeries,
    config: &AnalysisConfig,
) -> RegressionOutcome {
    let rows = match forward::build(vols, percentiles, config) {
        Ok(rows) => rows,
        Err(AnalysisError::InsufficientHistory { rows, required }) => {
            warn!(
                "Insufficient IV data for analysis: {} rows, need {}",
                rows, required
            );
            return RegressionOutcome::InsufficientHistory { rows, required };
        }
        Err(e) => {
            warn!("Forward analysis failed: {}", e);
            return RegressionOutcome::InsufficientHistory {
                rows: 0,
                required: config.min_analysis_rows,
            };
        }
    };

    match breakpoint::analyze(&rows, config) {
        Ok(analysis) => RegressionOutcome::completed(rows.len(), analysis),
        Err(e) => {
            warn!("Regression skipped: {}", e);
            RegressionOutcome::Degenerate { rows: rows.len() }
        }
    }
}
