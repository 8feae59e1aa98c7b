//! Rolling and regression statistics over `f64` series.
//!
//! Rolling helpers return one entry per input point. Positions whose window
//! has too few observations are `None`, never NaN.

#![allow(clippy::cast_precision_loss)]

/// Map NaN and infinities to `None`.
#[must_use]
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Arithmetic mean.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    finite(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (ddof = 1).
#[must_use]
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let variance_sum: f64 = values.iter().map(|v| (v - avg) * (v - avg)).sum();
    finite((variance_sum / (values.len() - 1) as f64).sqrt())
}

/// Rolling mean with `min_periods = window`.
#[must_use]
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, mean)
}

/// Rolling sample standard deviation with `min_periods = window`.
///
/// A window whose values are all identical has a standard deviation of
/// exactly zero.
#[must_use]
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling(values, window, |slice| {
        if is_constant(slice) {
            Some(0.0)
        } else {
            std_dev(slice)
        }
    })
}

/// Rolling z-score: `(value - rolling_mean) / rolling_std`.
///
/// Undefined during the first `window - 1` points and wherever the window
/// has zero variance.
#[must_use]
pub fn rolling_zscore(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_mean(values, window)
        .into_iter()
        .zip(rolling_std(values, window))
        .zip(values)
        .map(|((avg, std), value)| match (avg, std) {
            (Some(avg), Some(std)) if std > 0.0 => finite((value - avg) / std),
            _ => None,
        })
        .collect()
}

/// Last defined entry of a rolling series.
#[must_use]
pub fn last_defined(series: &[Option<f64>]) -> Option<f64> {
    series.iter().rev().find_map(|v| *v)
}

/// Simple percentage returns `v[t] / v[t-1] - 1`; the first entry is `None`.
#[must_use]
pub fn pct_change(values: &[f64]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if values.is_empty() {
        return out;
    }
    out.push(None);
    out.extend(values.windows(2).map(|w| finite(w[1] / w[0] - 1.0)));
    out
}

/// Pearson correlation of two equal-length samples.
#[must_use]
pub fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 || is_constant(a) || is_constant(b) {
        return None;
    }
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;
    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        let (dx, dy) = (x - mean_a, y - mean_b);
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    finite(cov / (var_a * var_b).sqrt())
}

/// Pearson correlation of the trailing `window` positions, over
/// pairwise-complete observations.
///
/// Needs at least `min_periods` (and never fewer than two) positions where
/// both sides are defined.
#[must_use]
pub fn trailing_correlation(
    a: &[Option<f64>],
    b: &[Option<f64>],
    window: usize,
    min_periods: usize,
) -> Option<f64> {
    let len = a.len().min(b.len());
    let start = len.saturating_sub(window.max(1));
    let (xs, ys): (Vec<f64>, Vec<f64>) = a[start..len]
        .iter()
        .zip(&b[start..len])
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    if xs.len() < min_periods.max(2) {
        return None;
    }
    pearson(&xs, &ys)
}

/// OLS slope of `y` on `x` with an intercept.
///
/// `None` when the inputs differ in length, hold fewer than two points, or
/// `x` has zero variance.
#[must_use]
pub fn hedge_ratio(y: &[f64], x: &[f64]) -> Option<f64> {
    if y.len() != x.len() || x.len() < 2 || is_constant(x) {
        return None;
    }
    let mean_x = mean(x)?;
    let mean_y = mean(y)?;
    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        sxy += (xi - mean_x) * (yi - mean_y);
        sxx += (xi - mean_x) * (xi - mean_x);
    }
    finite(sxy / sxx)
}

// =============================================================================
// Multiple Regression
// =============================================================================

/// Result of an ordinary least squares fit.
#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// Coefficients, in regressor order.
    pub params: Vec<f64>,
    /// Standard errors of the coefficients.
    pub std_errors: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    /// Number of observations.
    pub nobs: usize,
}

impl OlsFit {
    /// t-statistic of coefficient `index`.
    #[must_use]
    pub fn t_value(&self, index: usize) -> Option<f64> {
        let se = *self.std_errors.get(index)?;
        if se > 0.0 {
            finite(self.params[index] / se)
        } else {
            None
        }
    }

    /// Akaike information criterion under Gaussian errors.
    #[must_use]
    pub fn aic(&self) -> Option<f64> {
        let n = self.nobs as f64;
        let k = self.params.len() as f64;
        if self.ssr <= 0.0 {
            return None;
        }
        let log_likelihood = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        finite(-2.0 * log_likelihood + 2.0 * k)
    }
}

/// Fit `y = X·β` by least squares, with `X` given as columns.
///
/// Solves the normal equations with Gauss-Jordan elimination. Returns `None`
/// when the design matrix is rank deficient or there are no residual degrees
/// of freedom.
#[must_use]
pub fn ols(y: &[f64], columns: &[Vec<f64>]) -> Option<OlsFit> {
    let n = y.len();
    let k = columns.len();
    if k == 0 || n <= k || columns.iter().any(|c| c.len() != n) {
        return None;
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for i in 0..k {
        for j in i..k {
            let dot: f64 = columns[i].iter().zip(&columns[j]).map(|(a, b)| a * b).sum();
            xtx[i][j] = dot;
            xtx[j][i] = dot;
        }
        xty[i] = columns[i].iter().zip(y).map(|(a, b)| a * b).sum();
    }

    let inverse = invert(xtx)?;
    let params: Vec<f64> = inverse
        .iter()
        .map(|row| row.iter().zip(&xty).map(|(a, b)| a * b).sum())
        .collect();

    let ssr: f64 = (0..n)
        .map(|r| {
            let fitted: f64 = columns.iter().zip(&params).map(|(c, b)| c[r] * b).sum();
            (y[r] - fitted).powi(2)
        })
        .sum();
    let sigma2 = ssr / (n - k) as f64;
    let std_errors = (0..k).map(|i| (sigma2 * inverse[i][i]).max(0.0).sqrt()).collect();

    if !ssr.is_finite() || params.iter().any(|p| !p.is_finite()) {
        return None;
    }

    Some(OlsFit {
        params,
        std_errors,
        ssr,
        nobs: n,
    })
}

fn invert(mut matrix: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let k = matrix.len();
    let scale = matrix
        .iter()
        .flatten()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 {
        return None;
    }
    let tolerance = scale * 1e-12;

    let mut inverse: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..k {
        let pivot_row = (col..k).max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))?;
        if matrix[pivot_row][col].abs() <= tolerance {
            return None;
        }
        matrix.swap(col, pivot_row);
        inverse.swap(col, pivot_row);

        let pivot = matrix[col][col];
        for j in 0..k {
            matrix[col][j] /= pivot;
            inverse[col][j] /= pivot;
        }

        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = matrix[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                matrix[row][j] -= factor * matrix[col][j];
                inverse[row][j] -= factor * inverse[col][j];
            }
        }
    }

    Some(inverse)
}

fn rolling<F>(values: &[f64], window: usize, stat: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    if window == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|end| {
            if end + 1 < window {
                None
            } else {
                stat(&values[end + 1 - window..=end])
            }
        })
        .collect()
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn finite_filters_nan_and_infinity() {
        assert_eq!(finite(1.5), Some(1.5));
        assert_eq!(finite(f64::NAN), None);
        assert_eq!(finite(f64::INFINITY), None);
    }

    #[test]
    fn sample_std_uses_ddof_one() {
        let std = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!(close(std, 2.138_089_935_299_395));
        assert_eq!(std_dev(&[1.0]), None);
    }

    #[test]
    fn rolling_mean_warms_up() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(out, vec![None, None, Some(2.0), Some(3.0)]);
    }

    #[test]
    fn zscore_of_constant_series_is_undefined() {
        let out = rolling_zscore(&[0.1; 20], 5);
        assert!(out.iter().all(Option::is_none));
        assert_eq!(last_defined(&out), None);
    }

    #[test]
    fn zscore_of_trailing_value() {
        let out = rolling_zscore(&[1.0, 2.0, 3.0, 4.0, 10.0], 5);
        assert!(out[..4].iter().all(Option::is_none));
        // mean 4, sample std sqrt(12.5)
        assert!(close(out[4].unwrap(), 6.0 / 12.5_f64.sqrt()));
    }

    #[test]
    fn pct_change_leads_with_none() {
        let out = pct_change(&[100.0, 110.0, 99.0]);
        assert_eq!(out[0], None);
        assert!(close(out[1].unwrap(), 0.1));
        assert!(close(out[2].unwrap(), -0.1));
        assert!(pct_change(&[]).is_empty());
    }

    #[test]
    fn pct_change_from_zero_is_undefined() {
        assert_eq!(pct_change(&[0.0, 1.0])[1], None);
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [4.0, 3.0, 2.0, 1.0];
        assert!(close(pearson(&a, &b).unwrap(), 1.0));
        assert!(close(pearson(&a, &c).unwrap(), -1.0));
        assert_eq!(pearson(&a, &[1.0; 4]), None);
    }

    #[test]
    fn trailing_correlation_respects_min_periods() {
        let a = pct_change(&[1.0, 2.0, 3.0, 5.0, 8.0]);
        let b = pct_change(&[2.0, 4.0, 6.0, 10.0, 16.0]);

        assert_eq!(trailing_correlation(&a, &b, 5, 5), None);
        assert!(close(trailing_correlation(&a, &b, 5, 4).unwrap(), 1.0));
    }

    #[test]
    fn trailing_correlation_ignores_older_points() {
        // Only the last three positions are in the window; they move together.
        let a = [Some(1.0), Some(-9.0), Some(1.0), Some(2.0), Some(3.0)];
        let b = [Some(-5.0), Some(7.0), Some(2.0), Some(4.0), Some(6.0)];
        assert!(close(trailing_correlation(&a, &b, 3, 3).unwrap(), 1.0));
        assert!(trailing_correlation(&a, &b, 5, 5).unwrap() < 1.0);
        assert_eq!(trailing_correlation(&a[..1], &b[..1], 3, 1), None);
    }

    #[test]
    fn hedge_ratio_recovers_slope() {
        let x: Vec<f64> = (0..50).map(|i| 10.0 + f64::from(i)).collect();
        let y: Vec<f64> = x.iter().map(|v| 3.0 + 1.5 * v).collect();
        assert!(close(hedge_ratio(&y, &x).unwrap(), 1.5));
    }

    #[test]
    fn hedge_ratio_undefined_for_constant_x() {
        assert_eq!(hedge_ratio(&[1.0, 2.0, 3.0], &[5.0, 5.0, 5.0]), None);
    }

    #[test]
    fn ols_matches_simple_regression() {
        let x: Vec<f64> = (0..20).map(f64::from).collect();
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 2.0 - 0.5 * v + if i % 2 == 0 { 0.1 } else { -0.1 })
            .collect();

        let fit = ols(&y, &[vec![1.0; 20], x.clone()]).unwrap();
        assert!(close(fit.params[1], hedge_ratio(&y, &x).unwrap()));
        assert_eq!(fit.nobs, 20);
        assert!(fit.std_errors.iter().all(|se| *se > 0.0));
        assert!(fit.t_value(1).unwrap() < 0.0);
    }

    #[test]
    fn ols_rejects_collinear_columns() {
        let x: Vec<f64> = (0..10).map(f64::from).collect();
        let doubled: Vec<f64> = x.iter().map(|v| v * 2.0).collect();
        assert_eq!(ols(&x, &[x.clone(), doubled]), None);
    }
}
