//! Augmented Dickey-Fuller stationarity test.
//!
//! Regression with a constant term; the number of lagged differences is
//! chosen by minimising AIC over `0..=maxlag`, where
//! `maxlag = min(ceil(12 * (n / 100)^(1/4)), n / 2 - 2)`. All candidate
//! regressions are fitted on the same sample (trimmed by `maxlag`), then the
//! selected lag is refitted on its own longest sample.
//!
//! p-values use MacKinnon's (1994) approximation for a single series with a
//! constant.

#![allow(clippy::cast_precision_loss)]

use serde::Serialize;

use super::stats::{OlsFit, finite, ols};

/// Minimum series length accepted by [`adf_test`].
pub const MIN_ADF_POINTS: usize = 20;

/// Significance level for the `stationary` flag.
pub const ADF_SIGNIFICANCE: f64 = 0.05;

// MacKinnon (1994) surface for N = 1, constant only.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038_269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.932_02, -0.127_45, -0.010_368];

/// Outcome of an ADF test. Every field is `None` when the test cannot run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AdfResult {
    /// t-statistic of the lagged level coefficient.
    pub statistic: Option<f64>,
    /// Approximate p-value.
    pub p_value: Option<f64>,
    /// `p_value < 0.05`.
    pub stationary: Option<bool>,
    /// Number of lagged differences selected by AIC.
    #[serde(skip)]
    pub used_lag: Option<usize>,
}

impl AdfResult {
    /// A result with every field undefined.
    #[must_use]
    pub const fn undefined() -> Self {
        Self {
            statistic: None,
            p_value: None,
            stationary: None,
            used_lag: None,
        }
    }
}

/// Run the ADF test on `series`.
#[must_use]
pub fn adf_test(series: &[f64]) -> AdfResult {
    let nobs = series.len();
    if nobs < MIN_ADF_POINTS || series.iter().any(|v| !v.is_finite()) {
        return AdfResult::undefined();
    }

    let maxlag = max_lag(nobs);
    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    let mut best: Option<(f64, usize)> = None;
    for lags in 0..=maxlag {
        let Some(aic) = fit(series, &diffs, lags, maxlag).and_then(|f| f.aic()) else {
            continue;
        };
        if best.is_none_or(|(best_aic, _)| aic < best_aic) {
            best = Some((aic, lags));
        }
    }
    let Some((_, lags)) = best else {
        return AdfResult::undefined();
    };

    let Some(statistic) = fit(series, &diffs, lags, lags).and_then(|f| f.t_value(1)) else {
        return AdfResult::undefined();
    };
    let p_value = finite(mackinnon_p_value(statistic));

    AdfResult {
        statistic: Some(statistic),
        p_value,
        stationary: p_value.map(|p| p < ADF_SIGNIFICANCE),
        used_lag: Some(lags),
    }
}

fn max_lag(nobs: usize) -> usize {
    let schwert = (12.0 * (nobs as f64 / 100.0).powf(0.25)).ceil();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let schwert = schwert as usize;
    schwert.min((nobs / 2).saturating_sub(2))
}

/// Regress `Δy_t` on `[1, y_{t-1}, Δy_{t-1}, ..., Δy_{t-lags}]` for
/// `t >= start`, indexing into the difference series.
fn fit(levels: &[f64], diffs: &[f64], lags: usize, start: usize) -> Option<OlsFit> {
    let rows = start..diffs.len();
    let dependent: Vec<f64> = rows.clone().map(|t| diffs[t]).collect();

    let mut columns = Vec::with_capacity(lags + 2);
    columns.push(vec![1.0; dependent.len()]);
    columns.push(rows.clone().map(|t| levels[t]).collect());
    for lag in 1..=lags {
        columns.push(rows.clone().map(|t| diffs[t - lag]).collect());
    }

    ols(&dependent, &columns)
}

/// MacKinnon approximate p-value for the ADF statistic (constant, N = 1).
#[must_use]
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefficients: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let z = coefficients
        .iter()
        .rev()
        .fold(0.0, |acc, c| acc * statistic + c);
    normal_cdf(z)
}

fn normal_cdf(z: f64) -> f64 {
    0.5 * libm::erfc(-z / std::f64::consts::SQRT_2)
}
