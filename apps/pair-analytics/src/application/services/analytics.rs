//! Analytics Query Service
//!
//! Request-time reads over the tick store. Each call snapshots what it
//! needs and computes without holding any store lock. The pair query also
//! evaluates alert rules and scores a trade decision.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::alerts::{AlertRegistry, AlertRule, NewAlertRule, TriggeredAlert};
use crate::domain::analytics::stats::{last_defined, rolling_zscore};
use crate::domain::analytics::{
    DEFAULT_GRID_SECS, PairOutcome, PairStatistics, PriceStats, analyze_pair, price_stats,
};
use crate::domain::decision::{Decision, decide};
use crate::domain::tick::{Tick, TickStore};
use crate::infrastructure::metrics;

/// Smallest window any rolling query accepts.
pub const MIN_WINDOW: usize = 2;

/// Liquidity estimate the pair query feeds the decision engine.
pub const DEFAULT_PAIR_LIQUIDITY: f64 = 0.7;

/// Tunables for [`AnalyticsService`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsSettings {
    /// Alignment grid width in seconds.
    pub grid_secs: i64,
    /// Liquidity estimate in `[0, 1]`.
    pub liquidity: f64,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            grid_secs: DEFAULT_GRID_SECS,
            liquidity: DEFAULT_PAIR_LIQUIDITY,
        }
    }
}

/// Rejected analytics requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyticsError {
    /// Window too small for a sample standard deviation.
    #[error("window must be at least {MIN_WINDOW}, got {0}")]
    InvalidWindow(usize),

    /// Threshold is NaN or infinite.
    #[error("alert threshold must be a finite number")]
    InvalidThreshold,
}

/// Single-symbol z-score query result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SymbolZScore {
    /// Fewer ticks than the window.
    WaitingForData {
        /// Ticks held.
        ticks: usize,
        /// Ticks needed.
        required: usize,
    },
    /// Trailing z-score undefined (e.g. constant prices).
    InsufficientData,
    /// Trailing z-score of the raw tick prices.
    Ready(f64),
}

/// Price statistics query result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PriceStatsReport {
    /// Fewer ticks than the window.
    WaitingForData {
        /// Ticks held.
        ticks: usize,
        /// Ticks needed.
        required: usize,
    },
    /// Statistics over the trailing window.
    Ready(PriceStats),
}

/// Full pair evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PairAnalytics {
    /// Pair statistics.
    pub statistics: PairStatistics,
    /// Scored decision.
    pub decision: Decision,
    /// Alerts fired by this evaluation.
    pub triggered_alerts: Vec<TriggeredAlert>,
}

/// Pair query result.
#[derive(Debug, Clone, PartialEq)]
pub enum PairReport {
    /// Fewer aligned points than the window.
    WaitingForData {
        /// Aligned points available.
        aligned_points: usize,
        /// Points needed.
        required: usize,
    },
    /// Evaluation result.
    Ready(Box<PairAnalytics>),
}

/// Query surface over the shared tick store and alert registry.
#[derive(Debug)]
pub struct AnalyticsService {
    store: Arc<TickStore>,
    alerts: Arc<AlertRegistry>,
    settings: AnalyticsSettings,
}

impl AnalyticsService {
    /// Create a service.
    #[must_use]
    pub const fn new(
        store: Arc<TickStore>,
        alerts: Arc<AlertRegistry>,
        settings: AnalyticsSettings,
    ) -> Self {
        Self {
            store,
            alerts,
            settings,
        }
    }

    /// Shared tick store.
    #[must_use]
    pub const fn store(&self) -> &Arc<TickStore> {
        &self.store
    }

    /// Shared alert registry.
    #[must_use]
    pub const fn alerts(&self) -> &Arc<AlertRegistry> {
        &self.alerts
    }

    /// Active settings.
    #[must_use]
    pub const fn settings(&self) -> AnalyticsSettings {
        self.settings
    }

    /// Tick history of a symbol in arrival order.
    #[must_use]
    pub fn ticks(&self, symbol: &str) -> Vec<Tick> {
        self.store.snapshot(symbol)
    }

    /// Rolling z-score of a symbol's raw tick prices.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::InvalidWindow` if `window < 2`.
    pub fn symbol_zscore(&self, symbol: &str, window: usize) -> Result<SymbolZScore, AnalyticsError> {
        validate_window(window)?;
        let prices = prices(&self.store.snapshot(symbol));
        if prices.len() < window {
            return Ok(SymbolZScore::WaitingForData {
                ticks: prices.len(),
                required: window,
            });
        }
        Ok(last_defined(&rolling_zscore(&prices, window))
            .map_or(SymbolZScore::InsufficientData, SymbolZScore::Ready))
    }

    /// Pair statistics, decision and alert evaluation.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::InvalidWindow` if `window < 2`.
    pub fn pair(&self, y: &str, x: &str, window: usize) -> Result<PairReport, AnalyticsError> {
        let statistics = match self.pair_series(y, x, window)? {
            PairOutcome::WaitingForData {
                aligned_points,
                required,
            } => {
                return Ok(PairReport::WaitingForData {
                    aligned_points,
                    required,
                });
            }
            PairOutcome::Ready(statistics) => *statistics,
        };

        let triggered_alerts = statistics
            .spread_zscore
            .map(|z| self.alerts.evaluate(y, x, window, z, Utc::now()))
            .unwrap_or_default();
        metrics::record_alerts_triggered(triggered_alerts.len());
        let decision = decide(
            statistics.spread_zscore,
            statistics.rolling_correlation,
            self.settings.liquidity,
        );

        tracing::debug!(
            y,
            x,
            window,
            zscore = ?statistics.spread_zscore,
            signal = ?decision.trade_signal,
            alerts = triggered_alerts.len(),
            "Pair evaluated"
        );

        Ok(PairReport::Ready(Box::new(PairAnalytics {
            statistics,
            decision,
            triggered_alerts,
        })))
    }

    /// Pair statistics without alert side effects.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::InvalidWindow` if `window < 2`.
    pub fn pair_series(&self, y: &str, x: &str, window: usize) -> Result<PairOutcome, AnalyticsError> {
        validate_window(window)?;
        let y_ticks = self.store.snapshot(y);
        let x_ticks = self.store.snapshot(x);
        Ok(analyze_pair(&y_ticks, &x_ticks, window, self.settings.grid_secs))
    }

    /// Price statistics over the trailing `window` ticks.
    ///
    /// # Errors
    ///
    /// Returns `AnalyticsError::InvalidWindow` if `window < 2`.
    pub fn price_stats(&self, symbol: &str, window: usize) -> Result<PriceStatsReport, AnalyticsError> {
        validate_window(window)?;
        let prices = prices(&self.store.snapshot(symbol));
        if prices.len() < window {
            return Ok(PriceStatsReport::WaitingForData {
                ticks: prices.len(),
                required: window,
            });
        }
        Ok(PriceStatsReport::Ready(price_stats(&prices[prices.len() - window..])))
    }

    /// Register an alert rule.
    ///
    /// # Errors
    ///
    /// Returns an error for a window below 2 or a non-finite threshold.
    pub fn register_alert(&self, request: NewAlertRule) -> Result<AlertRule, AnalyticsError> {
        validate_window(request.window)?;
        if !request.threshold.is_finite() {
            return Err(AnalyticsError::InvalidThreshold);
        }
        Ok(self.alerts.register(request))
    }

    /// Every registered alert rule.
    #[must_use]
    pub fn list_alerts(&self) -> Vec<AlertRule> {
        self.alerts.list()
    }
}

const fn validate_window(window: usize) -> Result<(), AnalyticsError> {
    if window < MIN_WINDOW {
        Err(AnalyticsError::InvalidWindow(window))
    } else {
        Ok(())
    }
}

fn prices(ticks: &[Tick]) -> Vec<f64> {
    ticks.iter().map(|t| t.price).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    use crate::domain::alerts::AlertDirection;
    use crate::domain::decision::TradeSignal;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn service() -> (Arc<TickStore>, AnalyticsService) {
        let store = Arc::new(TickStore::new(1_000));
        let service = AnalyticsService::new(
            Arc::clone(&store),
            Arc::new(AlertRegistry::new()),
            AnalyticsSettings::default(),
        );
        (store, service)
    }

    /// Co-moving pair with a one-off jump of `shock` on the final `y` price.
    fn feed_pair(store: &TickStore, n: i64, shock: f64) {
        for i in 0..n {
            let t = i as f64;
            let x = 100.0 + 5.0 * (t / 15.0).sin() + 0.02 * t;
            let mut y = 2.0 * x + 0.5 * (t * 1.7).sin();
            if i == n - 1 {
                y += shock;
            }
            store.on_tick("ethusdt", at(i), x, 1.0);
            store.on_tick("btcusdt", at(i), y, 1.0);
        }
    }

    #[test]
    fn rejects_tiny_windows() {
        let (_, service) = service();
        assert_eq!(service.symbol_zscore("a", 1), Err(AnalyticsError::InvalidWindow(1)));
        assert_eq!(service.pair("a", "b", 0).unwrap_err(), AnalyticsError::InvalidWindow(0));
        assert!(service.price_stats("a", 1).is_err());
    }

    #[test]
    fn symbol_zscore_waits_then_reports() {
        let (store, service) = service();
        for i in 0..3 {
            store.on_tick("a", at(i), 10.0 + i as f64, 1.0);
        }
        assert_eq!(
            service.symbol_zscore("a", 5).unwrap(),
            SymbolZScore::WaitingForData { ticks: 3, required: 5 }
        );

        store.on_tick("a", at(3), 13.0, 1.0);
        store.on_tick("a", at(4), 20.0, 1.0);
        match service.symbol_zscore("a", 5).unwrap() {
            SymbolZScore::Ready(z) => assert!(z > 1.0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn symbol_zscore_of_flat_prices_is_insufficient() {
        let (store, service) = service();
        for i in 0..5 {
            store.on_tick("a", at(i), 7.0, 1.0);
        }
        assert_eq!(service.symbol_zscore("a", 5).unwrap(), SymbolZScore::InsufficientData);
    }

    #[test]
    fn pair_waits_for_aligned_points() {
        let (store, service) = service();
        feed_pair(&store, 50, 0.0);
        assert_eq!(
            service.pair("btcusdt", "ethusdt", 300).unwrap(),
            PairReport::WaitingForData {
                aligned_points: 50,
                required: 300
            }
        );
    }

    #[test]
    fn pair_shock_sells_and_fires_alert() {
        let (store, service) = service();
        feed_pair(&store, 400, 6.0);
        let rule = service
            .register_alert(NewAlertRule {
                y: "btcusdt".to_string(),
                x: "ethusdt".to_string(),
                window: 300,
                threshold: 2.0,
                direction: AlertDirection::Above,
                cooldown_seconds: 60,
            })
            .unwrap();

        let PairReport::Ready(report) = service.pair("btcusdt", "ethusdt", 300).unwrap() else {
            panic!("expected a ready report");
        };
        assert!((report.statistics.hedge_ratio.unwrap() - 2.0).abs() < 0.05);
        assert!(report.statistics.spread_zscore.unwrap() > 2.0);
        assert!(report.statistics.rolling_correlation.unwrap() > 0.4);
        assert_eq!(report.decision.trade_signal, TradeSignal::Sell);
        assert_eq!(report.decision.confidence, 100);
        assert_eq!(report.triggered_alerts.len(), 1);
        assert_eq!(report.triggered_alerts[0].alert_id, rule.id);

        // Still breached, but cooling down.
        let PairReport::Ready(again) = service.pair("btcusdt", "ethusdt", 300).unwrap() else {
            panic!("expected a ready report");
        };
        assert!(again.triggered_alerts.is_empty());
        assert!(service.list_alerts()[0].last_triggered.is_some());
    }

    #[test]
    fn pair_series_has_no_alert_side_effects() {
        let (store, service) = service();
        feed_pair(&store, 400, 6.0);
        service
            .register_alert(NewAlertRule {
                y: "btcusdt".to_string(),
                x: "ethusdt".to_string(),
                window: 300,
                threshold: 1.0,
                direction: AlertDirection::Abs,
                cooldown_seconds: 60,
            })
            .unwrap();

        let PairOutcome::Ready(stats) = service.pair_series("btcusdt", "ethusdt", 300).unwrap() else {
            panic!("expected statistics");
        };
        assert_eq!(stats.spread.len(), 300);
        assert_eq!(stats.zscores.len(), 300);
        assert!(service.list_alerts()[0].last_triggered.is_none());
    }

    #[test]
    fn price_stats_uses_trailing_window() {
        let (store, service) = service();
        for (i, p) in [1.0, 50.0, 10.0, 11.0, 12.0].into_iter().enumerate() {
            store.on_tick("a", at(i as i64), p, 1.0);
        }
        let PriceStatsReport::Ready(stats) = service.price_stats("a", 3).unwrap() else {
            panic!("expected stats");
        };
        assert_eq!(stats.min_price, Some(10.0));
        assert_eq!(stats.max_price, Some(12.0));
        assert_eq!(stats.last_price, Some(12.0));
    }

    #[test]
    fn register_alert_rejects_nan_threshold() {
        let (_, service) = service();
        let result = service.register_alert(NewAlertRule {
            y: "a".to_string(),
            x: "b".to_string(),
            window: 10,
            threshold: f64::NAN,
            direction: AlertDirection::Abs,
            cooldown_seconds: 0,
        });
        assert_eq!(result.unwrap_err(), AnalyticsError::InvalidThreshold);
    }
}
