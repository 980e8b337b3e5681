//! Forward-volatility analysis table
//!
//! Pairs each reading with the average volatility of a later window. For a
//! forward window `W`, row `i` looks at `[i + W, i + 2W)` clipped to the
//! series end: the leading mean at `i + W`, pulled back `W` rows. The last
//! `W` rows of the series therefore never produce an analysis row.

use tracing::debug;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::indicators;
use crate::series::{PercentileSeries, VolatilitySeries};
use crate::types::AnalysisRow;

/// Build the analysis table, requiring `config.min_analysis_rows` rows.
pub fn build(
    vols: &VolatilitySeries,
    percentiles: &PercentileSeries,
    config: &AnalysisConfig,
) -> AnalysisResult<Vec<AnalysisRow>> {
    let rows = build_unchecked(
        vols,
        percentiles,
        config.forward_window,
        config.min_forward_periods,
    );

    if rows.len() < config.min_analysis_rows {
        return Err(AnalysisError::InsufficientHistory {
            rows: rows.len(),
            required: config.min_analysis_rows,
        });
    }

    Ok(rows)
}

/// Build every eligible row without the minimum-size check.
pub fn build_unchecked(
    vols: &VolatilitySeries,
    percentiles: &PercentileSeries,
    forward_window: usize,
    min_forward_periods: usize,
) -> Vec<AnalysisRow> {
    let values = vols.values();
    let leading = indicators::leading_mean(&values, forward_window, min_forward_periods);
    let forward = indicators::shift_back(&leading, forward_window);

    let rows: Vec<AnalysisRow> = vols
        .points()
        .iter()
        .zip(percentiles.points())
        .zip(forward)
        .filter_map(|((point, pct), forward_vol)| {
            let forward_vol = forward_vol?;
            let vol_percentile = pct.percentile?;
            if !(point.vol.is_finite() && forward_vol.is_finite()) {
                return None;
            }
            Some(AnalysisRow {
                date: point.date,
                current_vol: point.vol,
                forward_vol,
                vol_diff: forward_vol - point.vol,
                vol_percentile,
            })
        })
        .collect();

    debug!(
        "Forward window {} (min {}): {} eligible rows from {} points",
        forward_window,
        min_forward_periods,
        rows.len(),
        values.len()
    );

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{annualize, rolling_percentile};
    use crate::types::Bar;
    use approx::assert_abs_diff_eq;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64], window: usize) -> (VolatilitySeries, PercentileSeries) {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::from_close(start + Duration::days(i as i64), c))
            .collect();
        let vols = annualize(&bars, 1.0).unwrap();
        let pct = rolling_percentile(&vols, window);
        (vols, pct)
    }

    #[test]
    fn test_hand_computed_alignment() {
        // n = 10, W = 3, percentile window 1 (always defined)
        // forward[i] = mean(v[i+3 .. min(i+6, 10)])
        let closes: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let (vols, pct) = series(&closes, 1);
        let rows = build_unchecked(&vols, &pct, 3, 1);

        // Rows 0..=6 have a forward window; 7, 8, 9 do not
        assert_eq!(rows.len(), 7);
        let expected = [4.0, 5.0, 6.0, 7.0, 8.0, 8.5, 9.0];
        for (i, (row, want)) in rows.iter().zip(expected).enumerate() {
            assert_abs_diff_eq!(row.current_vol, i as f64);
            assert_abs_diff_eq!(row.forward_vol, want, epsilon = 1e-12);
            assert_abs_diff_eq!(row.vol_diff, want - i as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_min_forward_periods_drops_short_windows() {
        let closes: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let (vols, pct) = series(&closes, 1);
        let rows = build_unchecked(&vols, &pct, 3, 3);

        // Only i + 6 <= 10 keeps a full window
        assert_eq!(rows.len(), 5);
        assert_abs_diff_eq!(rows[4].forward_vol, 8.0);
    }

    #[test]
    fn test_constant_series() {
        let closes = vec![0.02; 120];
        let (vols, pct) = series(&closes, 20);
        let rows = build_unchecked(&vols, &pct, 30, 1);

        assert!(!rows.is_empty());
        for row in &rows {
            assert_abs_diff_eq!(row.forward_vol, 0.02, epsilon = 1e-12);
            assert_abs_diff_eq!(row.vol_diff, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_percentile_warmup_excluded() {
        let closes: Vec<f64> = (0..100).map(|i| 0.01 + i as f64 * 1e-4).collect();
        let (vols, pct) = series(&closes, 50);
        let rows = build_unchecked(&vols, &pct, 30, 1);

        // Indices 49..70 have both a percentile and a forward window
        assert_eq!(rows.len(), 21);
        assert_eq!(rows[0].date, vols.points()[49].date);
    }

    #[test]
    fn test_insufficient_history() {
        let closes = vec![0.02; 10];
        let (vols, pct) = series(&closes, 252);
        let err = build(&vols, &pct, &AnalysisConfig::default()).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::InsufficientHistory {
                rows: 0,
                required: 30
            }
        );
    }
}
