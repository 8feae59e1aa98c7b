//! Bar Repository Port (Driven Port)
//!
//! Durable bar storage keyed on `(bucket_start, symbol, timeframe)`. Writes
//! are upserts, so replaying a bucket never duplicates it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::bars::{Bar, Timeframe};
use crate::domain::tick::Symbol;

/// Errors from bar persistence.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Could not open or configure the store.
    #[error("database connection error: {0}")]
    Connection(String),

    /// A statement failed.
    #[error("query error: {0}")]
    Query(String),

    /// A stored row could not be decoded.
    #[error("data integrity error: {0}")]
    Integrity(String),

    /// The blocking worker panicked or was cancelled.
    #[error("storage task failed: {0}")]
    TaskJoin(String),
}

/// Port for durable bar storage.
#[async_trait]
pub trait BarRepository: Send + Sync {
    /// Insert or replace the bar at its key.
    async fn put(&self, bar: &Bar) -> Result<(), PersistenceError>;

    /// The most recent `limit` bars, oldest first.
    async fn query(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, PersistenceError>;

    /// Every stored bar for the key prefix, oldest first.
    async fn query_all(&self, symbol: &str, timeframe: Timeframe)
    -> Result<Vec<Bar>, PersistenceError>;
}

type BarKey = (Symbol, Timeframe, DateTime<Utc>);

/// In-memory implementation for tests and storage-less runs.
#[derive(Debug, Default)]
pub struct InMemoryBarRepository {
    bars: RwLock<BTreeMap<BarKey, Bar>>,
}

impl InMemoryBarRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored bars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bars.read().len()
    }

    /// Whether the repository is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bars.read().is_empty()
    }

    fn range(&self, symbol: &str, timeframe: Timeframe) -> Vec<Bar> {
        let start = (symbol.to_string(), timeframe, DateTime::<Utc>::MIN_UTC);
        let end = (symbol.to_string(), timeframe, DateTime::<Utc>::MAX_UTC);
        self.bars.read().range(start..=end).map(|(_, bar)| bar.clone()).collect()
    }
}

#[async_trait]
impl BarRepository for InMemoryBarRepository {
    async fn put(&self, bar: &Bar) -> Result<(), PersistenceError> {
        let key = (bar.symbol.clone(), bar.timeframe, bar.bucket_start);
        self.bars.write().insert(key, bar.clone());
        Ok(())
    }

    async fn query(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, PersistenceError> {
        let mut bars = self.range(symbol, timeframe);
        let skip = bars.len().saturating_sub(limit);
        bars.drain(..skip);
        Ok(bars)
    }

    async fn query_all(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<Bar>, PersistenceError> {
        Ok(self.range(symbol, timeframe))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(secs: i64, timeframe: Timeframe, price: f64) -> Bar {
        Bar {
            bucket_start: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            symbol: "btcusdt".to_string(),
            timeframe,
            price,
            volume: 1.0,
        }
    }

    #[tokio::test]
    async fn upsert_keeps_one_row_with_latest_values() {
        let repo = InMemoryBarRepository::new();
        repo.put(&bar(0, Timeframe::OneSecond, 1.0)).await.unwrap();
        repo.put(&bar(0, Timeframe::OneSecond, 2.0)).await.unwrap();

        assert_eq!(repo.len(), 1);
        let bars = repo.query("btcusdt", Timeframe::OneSecond, 10).await.unwrap();
        assert_eq!(bars[0].price, 2.0);
    }

    #[tokio::test]
    async fn query_returns_most_recent_ascending() {
        let repo = InMemoryBarRepository::new();
        for i in 0..5 {
            repo.put(&bar(i, Timeframe::OneSecond, i as f64)).await.unwrap();
        }
        repo.put(&bar(0, Timeframe::OneMinute, 99.0)).await.unwrap();

        let bars = repo.query("btcusdt", Timeframe::OneSecond, 2).await.unwrap();
        let prices: Vec<f64> = bars.iter().map(|b| b.price).collect();
        assert_eq!(prices, vec![3.0, 4.0]);

        assert_eq!(repo.query_all("btcusdt", Timeframe::OneSecond).await.unwrap().len(), 5);
        assert!(repo.query_all("ethusdt", Timeframe::OneSecond).await.unwrap().is_empty());
    }
}
