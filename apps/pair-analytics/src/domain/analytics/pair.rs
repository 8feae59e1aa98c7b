//! Pair statistics over two symbols' tick histories.

use chrono::{DateTime, Utc};

use super::adf::{AdfResult, adf_test};
use super::alignment::align;
use super::stats::{finite, hedge_ratio, last_defined, pct_change, rolling_zscore, trailing_correlation};
use crate::domain::tick::Tick;

/// Statistics for one `(y, x, window)` evaluation.
///
/// Scalar fields are `None` when undefined; no field ever holds NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct PairStatistics {
    /// OLS slope of `y` on `x`.
    pub hedge_ratio: Option<f64>,
    /// Most recent spread value.
    pub latest_spread: Option<f64>,
    /// Trailing rolling z-score of the spread.
    pub spread_zscore: Option<f64>,
    /// Trailing rolling correlation of percentage returns.
    pub rolling_correlation: Option<f64>,
    /// Stationarity test on the spread.
    pub adf: AdfResult,
    /// Aligned bucket timestamps of the evaluated window.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Spread per aligned point.
    pub spread: Vec<Option<f64>>,
    /// Rolling z-score per aligned point.
    pub zscores: Vec<Option<f64>>,
}

/// Result of a pair evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// Fewer aligned points than the requested window.
    WaitingForData {
        /// Aligned points currently available.
        aligned_points: usize,
        /// Points needed.
        required: usize,
    },
    /// Enough data to evaluate.
    Ready(Box<PairStatistics>),
}

/// Align both histories on the grid and compute pair statistics over the
/// most recent `window` points.
#[must_use]
pub fn analyze_pair(y: &[Tick], x: &[Tick], window: usize, grid_secs: i64) -> PairOutcome {
    if y.is_empty() || x.is_empty() {
        return PairOutcome::WaitingForData {
            aligned_points: 0,
            required: window,
        };
    }

    let aligned = align(y, x, grid_secs);
    if aligned.len() < window {
        return PairOutcome::WaitingForData {
            aligned_points: aligned.len(),
            required: window,
        };
    }
    let aligned = aligned.tail(window);

    let returns_y = pct_change(&aligned.y);
    let returns_x = pct_change(&aligned.x);
    let correlation =
        trailing_correlation(&returns_y, &returns_x, window, window.saturating_sub(1));

    let Some(beta) = hedge_ratio(&aligned.y, &aligned.x) else {
        return PairOutcome::Ready(Box::new(PairStatistics {
            hedge_ratio: None,
            latest_spread: None,
            spread_zscore: None,
            rolling_correlation: correlation,
            adf: AdfResult::undefined(),
            spread: vec![None; aligned.len()],
            zscores: vec![None; aligned.len()],
            timestamps: aligned.timestamps,
        }));
    };

    let spread: Vec<f64> = aligned
        .y
        .iter()
        .zip(&aligned.x)
        .map(|(y, x)| y - beta * x)
        .collect();
    let zscores = rolling_zscore(&spread, window);

    PairOutcome::Ready(Box::new(PairStatistics {
        hedge_ratio: Some(beta),
        latest_spread: spread.last().copied().and_then(finite),
        spread_zscore: last_defined(&zscores),
        rolling_correlation: correlation,
        adf: adf_test(&spread),
        spread: spread.iter().copied().map(finite).collect(),
        zscores,
        timestamps: aligned.timestamps,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn series(symbol: &str, prices: &[f64]) -> Vec<Tick> {
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| {
                Tick::new(
                    symbol,
                    Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap(),
                    *p,
                    1.0,
                )
            })
            .collect()
    }

    fn ready(outcome: PairOutcome) -> PairStatistics {
        match outcome {
            PairOutcome::Ready(stats) => *stats,
            PairOutcome::WaitingForData { .. } => panic!("expected statistics"),
        }
    }

    #[test]
    fn waits_until_window_is_filled() {
        let y = series("y", &[1.0, 2.0, 3.0]);
        let x = series("x", &[1.0, 2.0, 3.0]);
        assert_eq!(
            analyze_pair(&y, &x, 10, 1),
            PairOutcome::WaitingForData {
                aligned_points: 3,
                required: 10
            }
        );
    }

    #[test]
    fn empty_side_reports_zero_points() {
        let y = series("y", &[1.0, 2.0]);
        assert_eq!(
            analyze_pair(&y, &[], 2, 1),
            PairOutcome::WaitingForData {
                aligned_points: 0,
                required: 2
            }
        );
    }

    #[test]
    fn exact_linear_pair() {
        let xs: Vec<f64> = (0..40).map(|i| 100.0 + (f64::from(i) / 3.0).sin() * 4.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 5.0 + 2.0 * x).collect();

        let stats = ready(analyze_pair(&series("y", &ys), &series("x", &xs), 30, 1));
        assert!((stats.hedge_ratio.unwrap() - 2.0).abs() < 1e-9);
        assert!((stats.latest_spread.unwrap() - 5.0).abs() < 1e-9);
        assert_eq!(stats.timestamps.len(), 30);
        assert_eq!(stats.spread.len(), 30);
        assert!(stats.rolling_correlation.unwrap() > 0.99);
    }

    #[test]
    fn constant_x_leaves_spread_undefined() {
        let ys: Vec<f64> = (0..25).map(f64::from).collect();
        let xs = vec![50.0; 25];

        let stats = ready(analyze_pair(&series("y", &ys), &series("x", &xs), 25, 1));
        assert_eq!(stats.hedge_ratio, None);
        assert_eq!(stats.spread_zscore, None);
        assert_eq!(stats.adf, AdfResult::undefined());
        assert_eq!(stats.rolling_correlation, None);
        assert!(stats.zscores.iter().all(Option::is_none));
    }

    #[test]
    fn zscore_defined_only_at_window_end() {
        let xs: Vec<f64> = (0..60).map(|i| 50.0 + f64::from(i % 7)).collect();
        let ys: Vec<f64> = xs
            .iter()
            .enumerate()
            .map(|(i, x)| 3.0 * x + ((i * 7_919) % 13) as f64 / 13.0 - 0.5)
            .collect();

        let stats = ready(analyze_pair(&series("y", &ys), &series("x", &xs), 40, 1));
        assert!(stats.zscores[..39].iter().all(Option::is_none));
        assert_eq!(stats.zscores[39], stats.spread_zscore);
        assert!(stats.spread_zscore.is_some());
        assert!(stats.adf.statistic.is_some());
    }
}
