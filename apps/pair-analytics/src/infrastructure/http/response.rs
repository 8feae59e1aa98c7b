//! HTTP response DTOs.
//!
//! Undefined statistics serialize as `null`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::application::services::PairAnalytics;
use crate::domain::alerts::{AlertRule, TriggeredAlert};
use crate::domain::analytics::{AdfResult, PairStatistics, PriceStats};
use crate::domain::bars::Bar;
use crate::domain::decision::Decision;
use crate::infrastructure::binance::FeedStateSnapshot;

use super::health::HealthStatus;

/// `{ "status": "waiting_for_data", ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingResponse {
    /// Always `waiting_for_data`.
    pub status: String,
    /// Ticks held, for single-symbol queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticks: Option<usize>,
    /// Aligned points, for pair queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aligned_points: Option<usize>,
    /// Count needed.
    pub required: usize,
}

impl WaitingResponse {
    /// Waiting on a single symbol's ticks.
    #[must_use]
    pub fn for_ticks(ticks: usize, required: usize) -> Self {
        Self {
            status: "waiting_for_data".to_string(),
            ticks: Some(ticks),
            aligned_points: None,
            required,
        }
    }

    /// Waiting on aligned pair points.
    #[must_use]
    pub fn for_aligned(aligned_points: usize, required: usize) -> Self {
        Self {
            status: "waiting_for_data".to_string(),
            ticks: None,
            aligned_points: Some(aligned_points),
            required,
        }
    }
}

/// Bare status body, e.g. `{ "status": "insufficient_data" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Status word.
    pub status: String,
}

impl StatusResponse {
    /// `insufficient_data`.
    #[must_use]
    pub fn insufficient_data() -> Self {
        Self {
            status: "insufficient_data".to_string(),
        }
    }
}

/// Latest single-symbol z-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZScoreResponse {
    /// Symbol.
    pub symbol: String,
    /// Window used.
    pub window: usize,
    /// Trailing z-score.
    pub zscore: f64,
}

/// ADF block of the pair response.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdfResponse {
    /// Test statistic.
    pub adf_stat: Option<f64>,
    /// Approximate p-value.
    pub p_value: Option<f64>,
    /// `p_value < 0.05`.
    pub stationary: Option<bool>,
}

impl From<AdfResult> for AdfResponse {
    fn from(adf: AdfResult) -> Self {
        Self {
            adf_stat: adf.statistic,
            p_value: adf.p_value,
            stationary: adf.stationary,
        }
    }
}

/// Full pair evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairResponse {
    /// Dependent symbol.
    pub y: String,
    /// Independent symbol.
    pub x: String,
    /// Window used.
    pub window: usize,
    /// OLS slope of `y` on `x`.
    pub hedge_ratio: Option<f64>,
    /// Latest `y - beta * x`.
    pub latest_spread: Option<f64>,
    /// Latest rolling z-score of the spread.
    pub spread_zscore: Option<f64>,
    /// Latest rolling correlation of returns.
    pub rolling_correlation: Option<f64>,
    /// Stationarity test of the spread.
    pub adf_test: AdfResponse,
    /// Trade decision.
    pub decision: Decision,
    /// Alerts fired by this query.
    pub triggered_alerts: Vec<TriggeredAlert>,
}

impl PairResponse {
    /// Build from a service result.
    #[must_use]
    pub fn new(y: String, x: String, window: usize, analytics: PairAnalytics) -> Self {
        let PairAnalytics {
            statistics,
            decision,
            triggered_alerts,
        } = analytics;
        Self {
            y,
            x,
            window,
            hedge_ratio: statistics.hedge_ratio,
            latest_spread: statistics.latest_spread,
            spread_zscore: statistics.spread_zscore,
            rolling_correlation: statistics.rolling_correlation,
            adf_test: statistics.adf.into(),
            decision,
            triggered_alerts,
        }
    }
}

/// Spread and z-score series over the trailing window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSeriesResponse {
    /// Grid timestamps.
    pub ts: Vec<DateTime<Utc>>,
    /// Spread per timestamp.
    pub spread: Vec<Option<f64>>,
    /// Spread z-score per timestamp.
    pub zscore: Vec<Option<f64>>,
}

impl From<PairStatistics> for PairSeriesResponse {
    fn from(statistics: PairStatistics) -> Self {
        Self {
            ts: statistics.timestamps,
            spread: statistics.spread,
            zscore: statistics.zscores,
        }
    }
}

/// `POST /alerts` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertCreatedResponse {
    /// Always `created`.
    pub status: String,
    /// Stored rule.
    pub alert: AlertRule,
}

impl AlertCreatedResponse {
    /// Wrap a stored rule.
    #[must_use]
    pub fn new(alert: AlertRule) -> Self {
        Self {
            status: "created".to_string(),
            alert,
        }
    }
}

/// One persisted bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarResponse {
    /// Bucket start.
    pub ts: DateTime<Utc>,
    /// Last price in the bucket.
    pub price: f64,
    /// Summed size in the bucket.
    pub volume: f64,
}

impl From<&Bar> for BarResponse {
    fn from(bar: &Bar) -> Self {
        Self {
            ts: bar.bucket_start,
            price: bar.price,
            volume: bar.volume,
        }
    }
}

/// CSV export row.
#[derive(Debug, Clone, Serialize)]
pub struct BarCsvRow {
    /// RFC 3339 bucket start.
    pub ts: String,
    /// Last price in the bucket.
    pub price: f64,
    /// Summed size in the bucket.
    pub volume: f64,
}

impl From<&Bar> for BarCsvRow {
    fn from(bar: &Bar) -> Self {
        Self {
            ts: bar.bucket_start.to_rfc3339_opts(SecondsFormat::Secs, true),
            price: bar.price,
            volume: bar.volume,
        }
    }
}

/// Trailing-window price statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsResponse {
    /// Symbol.
    pub symbol: String,
    /// Window used.
    pub window: usize,
    /// Statistics.
    #[serde(flatten)]
    pub stats: PriceStats,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Seconds since start.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Symbols with tick history.
    pub tracked_symbols: Vec<String>,
    /// Per-symbol feed state.
    pub feeds: Vec<FeedStateSnapshot>,
}

/// `{ "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}
