//! Two-series alignment onto a common time grid.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::domain::bars::truncate_to;
use crate::domain::tick::Tick;

/// Default alignment grid width in seconds.
pub const DEFAULT_GRID_SECS: i64 = 1;

/// Equal-length, gap-free price series sharing one timestamp axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedSeries {
    /// Bucket start times, ascending.
    pub timestamps: Vec<DateTime<Utc>>,
    /// Prices of the dependent symbol.
    pub y: Vec<f64>,
    /// Prices of the independent symbol.
    pub x: Vec<f64>,
}

impl AlignedSeries {
    /// Number of aligned points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// Whether no bucket was shared by both sides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Keep only the most recent `n` points.
    #[must_use]
    pub fn tail(mut self, n: usize) -> Self {
        let skip = self.len().saturating_sub(n);
        self.timestamps.drain(..skip);
        self.y.drain(..skip);
        self.x.drain(..skip);
        self
    }
}

/// Last observed price per grid bucket.
#[must_use]
pub fn last_price_per_bucket(ticks: &[Tick], grid_secs: i64) -> BTreeMap<DateTime<Utc>, f64> {
    let mut buckets: BTreeMap<DateTime<Utc>, (DateTime<Utc>, f64)> = BTreeMap::new();
    for tick in ticks {
        let key = truncate_to(tick.timestamp, grid_secs);
        buckets
            .entry(key)
            .and_modify(|(last_at, price)| {
                if tick.timestamp >= *last_at {
                    *last_at = tick.timestamp;
                    *price = tick.price;
                }
            })
            .or_insert((tick.timestamp, tick.price));
    }
    buckets.into_iter().map(|(k, (_, price))| (k, price)).collect()
}

/// Resample both sides onto the grid and inner-join on bucket start.
#[must_use]
pub fn align(y: &[Tick], x: &[Tick], grid_secs: i64) -> AlignedSeries {
    let y_buckets = last_price_per_bucket(y, grid_secs);
    let x_buckets = last_price_per_bucket(x, grid_secs);

    let mut aligned = AlignedSeries::default();
    for (ts, y_price) in y_buckets {
        if let Some(&x_price) = x_buckets.get(&ts) {
            aligned.timestamps.push(ts);
            aligned.y.push(y_price);
            aligned.x.push(x_price);
        }
    }
    aligned
}
