//! Bars and Resampling
//!
//! Compresses a tick snapshot into fixed-timeframe bars. A bar carries the
//! last trade price in its bucket and the summed trade size.
//!
//! Buckets are aligned to the Unix epoch: a tick at `t` belongs to the bucket
//! starting at `t - (t mod width)`, with sub-second precision discarded.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tick::{Symbol, Tick};

// =============================================================================
// Timeframe
// =============================================================================

/// Bar timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    /// One-second bars.
    #[serde(rename = "1s")]
    OneSecond,
    /// One-minute bars.
    #[serde(rename = "1m")]
    OneMinute,
    /// Five-minute bars.
    #[serde(rename = "5m")]
    FiveMinutes,
}

impl Timeframe {
    /// Every supported timeframe, shortest first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::OneSecond, Self::OneMinute, Self::FiveMinutes]
    }

    /// Wire name of the timeframe.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneSecond => "1s",
            Self::OneMinute => "1m",
            Self::FiveMinutes => "5m",
        }
    }

    /// Bucket width in seconds.
    #[must_use]
    pub const fn width_secs(self) -> i64 {
        match self {
            Self::OneSecond => 1,
            Self::OneMinute => 60,
            Self::FiveMinutes => 300,
        }
    }

    /// Bucket width as a duration.
    #[must_use]
    pub const fn width(self) -> Duration {
        Duration::from_secs(self.width_secs().unsigned_abs())
    }

    /// Start of the bucket containing `timestamp`.
    #[must_use]
    pub fn bucket_start(self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        truncate_to(timestamp, self.width_secs())
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown timeframe.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported timeframe '{0}' (expected one of 1s, 1m, 5m)")]
pub struct ParseTimeframeError(pub String);

impl FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1s" => Ok(Self::OneSecond),
            "1m" => Ok(Self::OneMinute),
            "5m" => Ok(Self::FiveMinutes),
            other => Err(ParseTimeframeError(other.to_string())),
        }
    }
}

/// Truncate a timestamp down to a multiple of `width_secs` since the epoch.
pub(crate) fn truncate_to(timestamp: DateTime<Utc>, width_secs: i64) -> DateTime<Utc> {
    let width = width_secs.max(1);
    let secs = timestamp.timestamp();
    let start = secs - secs.rem_euclid(width);
    DateTime::from_timestamp(start, 0).unwrap_or(timestamp)
}

// =============================================================================
// Bar
// =============================================================================

/// A timeframe-bucketed summary of ticks.
///
/// Identified by `(bucket_start, symbol, timeframe)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Start of the bucket.
    pub bucket_start: DateTime<Utc>,
    /// Symbol.
    pub symbol: Symbol,
    /// Timeframe of the bucket.
    pub timeframe: Timeframe,
    /// Price of the temporally-last tick in the bucket.
    pub price: f64,
    /// Sum of tick sizes in the bucket.
    pub volume: f64,
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    last_at: DateTime<Utc>,
    price: f64,
    volume: f64,
}

/// Resample ticks into ascending, non-empty bars for one timeframe.
///
/// Within a bucket the tick with the latest timestamp sets the price; ties
/// go to the later arrival.
#[must_use]
pub fn resample(ticks: &[Tick], timeframe: Timeframe) -> Vec<Bar> {
    let Some(first) = ticks.first() else {
        return Vec::new();
    };
    let symbol = first.symbol.clone();

    let mut buckets: BTreeMap<DateTime<Utc>, Accumulator> = BTreeMap::new();
    for tick in ticks {
        let key = timeframe.bucket_start(tick.timestamp);
        buckets
            .entry(key)
            .and_modify(|acc| {
                if tick.timestamp >= acc.last_at {
                    acc.last_at = tick.timestamp;
                    acc.price = tick.price;
                }
                acc.volume += tick.size;
            })
            .or_insert(Accumulator {
                last_at: tick.timestamp,
                price: tick.price,
                volume: tick.size,
            });
    }

    buckets
        .into_iter()
        .map(|(bucket_start, acc)| Bar {
            bucket_start,
            symbol: symbol.clone(),
            timeframe,
            price: acc.price,
            volume: acc.volume,
        })
        .collect()
}

// =============================================================================
// Resampler
// =============================================================================

/// Produces the most recent bar per configured timeframe.
#[derive(Debug, Clone)]
pub struct Resampler {
    timeframes: Vec<Timeframe>,
}

impl Default for Resampler {
    fn default() -> Self {
        Self::new(Timeframe::all().to_vec())
    }
}

impl Resampler {
    /// Create a resampler for the given timeframes.
    #[must_use]
    pub const fn new(timeframes: Vec<Timeframe>) -> Self {
        Self { timeframes }
    }

    /// Configured timeframes.
    #[must_use]
    pub fn timeframes(&self) -> &[Timeframe] {
        &self.timeframes
    }

    /// The latest (completed or in-progress) bar for every timeframe.
    ///
    /// Returns nothing for an empty snapshot.
    #[must_use]
    pub fn latest_bars(&self, ticks: &[Tick]) -> Vec<Bar> {
        self.timeframes
            .iter()
            .filter_map(|&timeframe| resample(ticks, timeframe).pop())
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
