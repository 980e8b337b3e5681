//! Windowed series statistics
//!
//! Rolling and summary statistics over plain `f64` slices. Rolling functions
//! return one entry per input value, `None` where the window is not yet
//! satisfied, in the same shape as a moving average.

use itertools::{Itertools, MinMaxResult};
use ordered_float::OrderedFloat;

// =============================================================================
// Rolling windows
// =============================================================================

/// Rolling percentile rank over a trailing window (inclusive of `i`).
///
/// Ties share the average rank, so the rank of `values[i]` within its window
/// is `less + (equal + 1) / 2` and the result is that rank divided by the
/// window length. A strictly increasing window ends at exactly 1.0.
pub fn rolling_percentile_rank(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut result = Vec::with_capacity(values.len());

    for i in 0..values.len() {
        if window == 0 || i + 1 < window {
            result.push(None);
            continue;
        }

        let current = values[i];
        let (less, equal) = values[i + 1 - window..=i]
            .iter()
            .fold((0usize, 0usize), |(less, equal), &v| {
                if v < current {
                    (less + 1, equal)
                } else if v == current {
                    (less, equal + 1)
                } else {
                    (less, equal)
                }
            });

        let rank = less as f64 + (equal as f64 + 1.0) / 2.0;
        result.push(Some(rank / window as f64));
    }

    result
}

/// Mean over the leading window `[i, i + window)` clipped to the series end.
///
/// Truncated windows near the end still count when they hold at least
/// `min_periods` values.
pub fn leading_mean(values: &[f64], window: usize, min_periods: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let mut result = Vec::with_capacity(n);

    for i in 0..n {
        let end = i.saturating_add(window).min(n);
        let count = end - i;
        if count == 0 || count < min_periods {
            result.push(None);
        } else {
            let sum: f64 = values[i..end].iter().sum();
            result.push(Some(sum / count as f64));
        }
    }

    result
}

/// Pull values `periods` steps back: `out[i] = values[i + periods]`.
///
/// The last `periods` entries have nothing to pull and become `None`.
pub fn shift_back<T: Copy>(values: &[Option<T>], periods: usize) -> Vec<Option<T>> {
    (0..values.len())
        .map(|i| {
            i.checked_add(periods)
                .and_then(|j| values.get(j))
                .copied()
                .flatten()
        })
        .collect()
}

// =============================================================================
// Summary statistics
// =============================================================================

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Smallest and largest value
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    match values.iter().copied().map(OrderedFloat).minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some((v.0, v.0)),
        MinMaxResult::MinMax(lo, hi) => Some((lo.0, hi.0)),
    }
}

/// Quantile with linear interpolation between the closest ranks
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }

    let sorted: Vec<f64> = values
        .iter()
        .copied()
        .map(OrderedFloat)
        .sorted()
        .map(|v| v.0)
        .collect();

    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn median(values: &[f64]) -> Option<f64> {
    quantile(values, 0.5)
}

// =============================================================================
// Tests
// =============================================================================
