//! Annualized volatility and percentile series
//!
//! Turns raw per-bar volatility into annualized implied volatility and a
//! trailing percentile rank, plus the summary snapshot of the latest reading.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};
use crate::indicators;
use crate::types::{Bar, PercentilePoint, VolPoint};

/// Annualized implied volatility, in bar order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySeries {
    points: Vec<VolPoint>,
    annualization_factor: f64,
}

impl VolatilitySeries {
    pub fn points(&self) -> &[VolPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.vol).collect()
    }

    pub fn annualization_factor(&self) -> f64 {
        self.annualization_factor
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&VolPoint> {
        self.points.last()
    }
}

/// Rolling percentile rank aligned index-for-index with a [`VolatilitySeries`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentileSeries {
    points: Vec<PercentilePoint>,
    window: usize,
}

impl PercentileSeries {
    pub fn points(&self) -> &[PercentilePoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.percentile).collect()
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Latest percentile; `None` while the window is still warming up
    pub fn current(&self) -> Option<f64> {
        self.points.last().and_then(|p| p.percentile)
    }
}

/// Scale each closing value by `sqrt(factor)`.
pub fn annualize(bars: &[Bar], factor: f64) -> AnalysisResult<VolatilitySeries> {
    if bars.is_empty() {
        return Err(AnalysisError::InsufficientData);
    }

    let scale = factor.sqrt();
    let points = bars
        .iter()
        .map(|bar| VolPoint {
            date: bar.date,
            vol: bar.close * scale,
        })
        .collect();

    Ok(VolatilitySeries {
        points,
        annualization_factor: factor,
    })
}

pub fn rolling_percentile(series: &VolatilitySeries, window: usize) -> PercentileSeries {
    let ranks = indicators::rolling_percentile_rank(&series.values(), window);
    let points: Vec<PercentilePoint> = series
        .points()
        .iter()
        .zip(ranks)
        .map(|(p, percentile)| PercentilePoint {
            date: p.date,
            percentile,
        })
        .collect();

    debug!(
        "Percentile window {}: {} of {} points defined",
        window,
        points.iter().filter(|p| p.percentile.is_some()).count(),
        points.len()
    );

    PercentileSeries { points, window }
}

/// Snapshot of the latest reading and full-history statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentState {
    pub date: NaiveDate,
    pub current_vol: f64,
    pub current_percentile: Option<f64>,
    pub mean_vol: f64,
    pub min_vol: f64,
    pub max_vol: f64,
    /// 25th percentile of the full annualized series
    pub q25_vol: f64,
    /// 75th percentile of the full annualized series
    pub q75_vol: f64,
    pub observations: usize,
    pub first_date: NaiveDate,
    pub annualization_factor: f64,
}

impl CurrentState {
    pub fn from_series(
        series: &VolatilitySeries,
        percentiles: &PercentileSeries,
    ) -> AnalysisResult<Self> {
        let (first, last) = match (series.points().first(), series.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(AnalysisError::InsufficientData),
        };

        let values = series.values();
        let (min_vol, max_vol) =
            indicators::min_max(&values).ok_or(AnalysisError::InsufficientData)?;
        let mean_vol = indicators::mean(&values).ok_or(AnalysisError::InsufficientData)?;
        let q25_vol = indicators::quantile(&values, 0.25).ok_or(AnalysisError::InsufficientData)?;
        let q75_vol = indicators::quantile(&values, 0.75).ok_or(AnalysisError::InsufficientData)?;

        Ok(CurrentState {
            date: last.date,
            current_vol: last.vol,
            current_percentile: percentiles.current(),
            mean_vol,
            min_vol,
            max_vol,
            q25_vol,
            q75_vol,
            observations: values.len(),
            first_date: first.date,
            annualization_factor: series.annualization_factor(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::from_close(start + Duration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn test_annualize_scales_close() {
        let input = bars(&[0.01, 0.02, 0.0]);
        let series = annualize(&input, 252.0).unwrap();

        assert_eq!(series.len(), 3);
        for (point, bar) in series.points().iter().zip(&input) {
            assert_eq!(point.date, bar.date);
            assert_relative_eq!(point.vol, bar.close * 252f64.sqrt());
            assert!(point.vol >= 0.0);
        }
    }

    #[test]
    fn test_annualize_empty() {
        assert_eq!(annualize(&[], 252.0), Err(AnalysisError::InsufficientData));
    }

    #[test]
    fn test_rolling_percentile_shape() {
        let closes: Vec<f64> = (1..=20).map(|i| i as f64 * 0.001).collect();
        let series = annualize(&bars(&closes), 252.0).unwrap();
        let percentiles = rolling_percentile(&series, 5);

        assert_eq!(percentiles.len(), 20);
        for (i, p) in percentiles.points().iter().enumerate() {
            if i < 4 {
                assert_eq!(p.percentile, None);
            } else {
                assert_eq!(p.percentile, Some(1.0));
            }
        }
        assert_eq!(percentiles.current(), Some(1.0));
    }

    #[test]
    fn test_current_state() {
        let series = annualize(&bars(&[1.0, 3.0, 2.0, 4.0]), 1.0).unwrap();
        let percentiles = rolling_percentile(&series, 10);
        let state = CurrentState::from_series(&series, &percentiles).unwrap();

        assert_eq!(state.current_vol, 4.0);
        assert_eq!(state.current_percentile, None);
        assert_eq!(state.mean_vol, 2.5);
        assert_eq!(state.min_vol, 1.0);
        assert_eq!(state.max_vol, 4.0);
        assert_eq!(state.q25_vol, 1.75);
        assert_eq!(state.q75_vol, 3.25);
        assert_eq!(state.observations, 4);
        assert_eq!(state.first_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }
}
