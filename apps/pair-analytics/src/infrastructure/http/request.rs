//! HTTP request DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::bars::{ParseTimeframeError, Timeframe};

/// Default window for `/zscore`.
pub const DEFAULT_ZSCORE_WINDOW: usize = 100;

/// Default window for `/pair`, `/pair_series` and `/stats`.
pub const DEFAULT_PAIR_WINDOW: usize = 300;

/// Default row limit for `/bars`.
pub const DEFAULT_BAR_LIMIT: usize = 500;

const fn default_zscore_window() -> usize {
    DEFAULT_ZSCORE_WINDOW
}

const fn default_pair_window() -> usize {
    DEFAULT_PAIR_WINDOW
}

const fn default_bar_limit() -> usize {
    DEFAULT_BAR_LIMIT
}

fn default_timeframe() -> String {
    Timeframe::OneMinute.as_str().to_string()
}

/// `?window=` for single-symbol z-scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZScoreQuery {
    /// Rolling window in ticks.
    #[serde(default = "default_zscore_window")]
    pub window: usize,
}

/// `?window=` for price statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsQuery {
    /// Trailing window in ticks.
    #[serde(default = "default_pair_window")]
    pub window: usize,
}

/// `?y=&x=&window=` for pair queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairQuery {
    /// Dependent symbol.
    pub y: String,
    /// Independent symbol.
    pub x: String,
    /// Rolling window in aligned points.
    #[serde(default = "default_pair_window")]
    pub window: usize,
}

/// `?symbol=&timeframe=&limit=` for bar history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarsQuery {
    /// Symbol.
    pub symbol: String,
    /// Timeframe name (`1s`, `1m`, `5m`).
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    /// Most recent rows to return.
    #[serde(default = "default_bar_limit")]
    pub limit: usize,
}

impl BarsQuery {
    /// Parsed timeframe.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown timeframe name.
    pub fn timeframe(&self) -> Result<Timeframe, ParseTimeframeError> {
        self.timeframe.parse()
    }
}

/// `?symbol=&timeframe=` for CSV export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportQuery {
    /// Symbol.
    pub symbol: String,
    /// Timeframe name (`1s`, `1m`, `5m`).
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

impl ExportQuery {
    /// Parsed timeframe.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown timeframe name.
    pub fn timeframe(&self) -> Result<Timeframe, ParseTimeframeError> {
        self.timeframe.parse()
    }
}

/// Normalize a symbol from a request to the store's lower-case form.
#[must_use]
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim().to_lowercase()
}
