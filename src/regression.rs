//! Ordinary least squares with the usual diagnostics
//!
//! Single-regressor OLS: slope, intercept, Pearson r, the two-sided p-value
//! of the slope under a Student t with `n - 2` degrees of freedom, and the
//! standard errors of both coefficients.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::error::{AnalysisError, AnalysisResult};
use crate::indicators;

/// Keeps the t statistic finite when |r| == 1
const TINY: f64 = 1e-20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    /// Pearson correlation coefficient
    pub r: f64,
    /// Two-sided p-value for a zero slope
    pub p_value: f64,
    /// Standard error of the slope
    pub std_err: f64,
    pub intercept_std_err: f64,
    pub sample_size: usize,
}

impl RegressionResult {
    /// Headline goodness of fit
    pub fn r_squared(&self) -> f64 {
        self.r * self.r
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fit `y ~ x`. Fails when fewer than three points are given or `x` has no
/// variance.
pub fn linregress(x: &[f64], y: &[f64]) -> AnalysisResult<RegressionResult> {
    let n = x.len().min(y.len());
    if n < 3 {
        return Err(AnalysisError::DegenerateRegression { rows: n });
    }
    let (x, y) = (&x[..n], &y[..n]);
    let nf = n as f64;

    // A summed mean of identical values is off by rounding, so constant
    // columns are detected from their range
    let x_mean = match indicators::min_max(x) {
        Some((lo, hi)) if lo < hi => x.iter().sum::<f64>() / nf,
        _ => return Err(AnalysisError::DegenerateRegression { rows: n }),
    };
    let y_mean = match indicators::min_max(y) {
        Some((lo, hi)) if lo == hi => lo,
        _ => y.iter().sum::<f64>() / nf,
    };

    let (mut ssxm, mut ssym, mut ssxym) = (0.0, 0.0, 0.0);
    for (&xi, &yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        let dy = yi - y_mean;
        ssxm += dx * dx;
        ssym += dy * dy;
        ssxym += dx * dy;
    }
    ssxm /= nf;
    ssym /= nf;
    ssxym /= nf;

    let r_den = (ssxm * ssym).sqrt();
    let r = if r_den == 0.0 {
        0.0
    } else {
        (ssxym / r_den).clamp(-1.0, 1.0)
    };

    let slope = ssxym / ssxm;
    let intercept = y_mean - slope * x_mean;

    let df = nf - 2.0;
    let t = r * (df / ((1.0 - r + TINY) * (1.0 + r + TINY))).sqrt();
    let p_value = StudentsT::new(0.0, 1.0, df)
        .map(|dist| 2.0 * dist.sf(t.abs()))
        .unwrap_or(f64::NAN);

    let std_err = ((1.0 - r * r) * ssym / ssxm / df).sqrt();
    let intercept_std_err = std_err * (ssxm + x_mean * x_mean).sqrt();

    Ok(RegressionResult {
        slope,
        intercept,
        r,
        p_value,
        std_err,
        intercept_std_err,
        sample_size: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_exact_line() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 1.0).collect();
        let fit = linregress(&x, &y).unwrap();

        assert_relative_eq!(fit.slope, 2.0, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 1.0, epsilon = 1e-12);
        assert_relative_eq!(fit.r, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(fit.std_err, 0.0, epsilon = 1e-6);
        assert!(fit.p_value < 1e-10);
        assert_eq!(fit.sample_size, 20);
    }

    #[test]
    fn test_known_fit() {
        // x = 1..5, y = [2, 4, 5, 4, 5]
        // slope 0.6, intercept 2.2, r = 0.7745966692414834
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 5.0, 4.0, 5.0];
        let fit = linregress(&x, &y).unwrap();

        assert_relative_eq!(fit.slope, 0.6, epsilon = 1e-12);
        assert_relative_eq!(fit.intercept, 2.2, epsilon = 1e-12);
        assert_relative_eq!(fit.r, 0.7745966692414834, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared(), 0.6, epsilon = 1e-12);
        // residual SS = 2.4, s^2 = 0.8, Sxx = 10 -> se = sqrt(0.08)
        assert_relative_eq!(fit.std_err, 0.08f64.sqrt(), epsilon = 1e-12);
        // t = 0.6 / 0.2828 = 2.1213 on 3 df
        assert_abs_diff_eq!(fit.p_value, 0.1240, epsilon = 1e-3);
    }

    #[test]
    fn test_flat_response() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [3.0; 4];
        let fit = linregress(&x, &y).unwrap();

        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r, 0.0);
        assert_relative_eq!(fit.p_value, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_variance_regressor() {
        let x = [2.0; 5];
        let y = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(
            linregress(&x, &y),
            Err(AnalysisError::DegenerateRegression { rows: 5 })
        );
    }

    #[test]
    fn test_constant_regressor_with_rounding() {
        // 0.3 summed 40 times does not divide back to exactly 0.3
        let x = [0.3; 40];
        assert_eq!(
            linregress(&x, &x),
            Err(AnalysisError::DegenerateRegression { rows: 40 })
        );

        let x = [0.02 * 252f64.sqrt(); 151];
        let y: Vec<f64> = (0..151).map(|i| i as f64).collect();
        assert!(linregress(&x, &y).is_err());
    }

    #[test]
    fn test_flat_response_with_rounding() {
        let x: Vec<f64> = (0..40).map(|i| i as f64).collect();
        let y = [0.1; 40];
        let fit = linregress(&x, &y).unwrap();

        assert_eq!(fit.slope, 0.0);
        assert_eq!(fit.r, 0.0);
        assert_eq!(fit.intercept, 0.1);
    }

    #[test]
    fn test_too_few_points() {
        assert!(linregress(&[1.0, 2.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_predict() {
        let fit = linregress(&[0.0, 1.0, 2.0], &[1.0, 3.0, 5.0]).unwrap();
        assert_relative_eq!(fit.predict(10.0), 21.0, epsilon = 1e-9);
    }
}
