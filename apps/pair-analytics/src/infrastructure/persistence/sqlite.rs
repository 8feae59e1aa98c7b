//! SQLite Bar Repository
//!
//! One `bars` table keyed on `(ts, symbol, timeframe)`. `ts` is RFC 3339 UTC
//! at second precision, so text order is time order. Every statement runs on
//! the blocking pool behind a single connection mutex.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, params};

use crate::application::ports::{BarRepository, PersistenceError};
use crate::domain::bars::{Bar, Timeframe};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bars (
    ts        TEXT NOT NULL,
    symbol    TEXT NOT NULL,
    timeframe TEXT NOT NULL,
    price     REAL NOT NULL,
    volume    REAL NOT NULL,
    PRIMARY KEY (ts, symbol, timeframe)
);
";

const UPSERT: &str = "
INSERT INTO bars (ts, symbol, timeframe, price, volume)
VALUES (?1, ?2, ?3, ?4, ?5)
ON CONFLICT(ts, symbol, timeframe) DO UPDATE SET
    price = excluded.price,
    volume = excluded.volume
";

/// SQLite-backed [`BarRepository`].
#[derive(Clone)]
pub struct SqliteBarRepository {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteBarRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBarRepository").finish_non_exhaustive()
    }
}

impl SqliteBarRepository {
    /// Open (or create) the database file and ensure the schema exists.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Connection` if the file cannot be opened
    /// or the schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|e| PersistenceError::Connection(e.to_string()))?;
        let repo = Self::from_connection(conn)?;
        tracing::info!(path = %path.display(), "Bar store opened");
        Ok(repo)
    }

    /// In-memory database, for tests.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError::Connection` if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn =
            Connection::open_in_memory().map_err(|e| PersistenceError::Connection(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, PersistenceError> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| PersistenceError::Connection(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T, PersistenceError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, PersistenceError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || f(&conn.lock()))
            .await
            .map_err(|e| PersistenceError::TaskJoin(e.to_string()))?
    }
}

fn encode_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn decode_ts(raw: &str) -> Result<DateTime<Utc>, PersistenceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| PersistenceError::Integrity(format!("bad ts {raw:?}: {e}")))
}

fn select_bars(
    conn: &Connection,
    sql: &str,
    symbol: &str,
    timeframe: Timeframe,
    limit: i64,
) -> Result<Vec<Bar>, PersistenceError> {
    let mut stmt = conn
        .prepare_cached(sql)
        .map_err(|e| PersistenceError::Query(e.to_string()))?;
    let rows = stmt
        .query_map(params![symbol, timeframe.as_str(), limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
            ))
        })
        .map_err(|e| PersistenceError::Query(e.to_string()))?;

    let mut bars = Vec::new();
    for row in rows {
        let (ts, price, volume) = row.map_err(|e| PersistenceError::Query(e.to_string()))?;
        bars.push(Bar {
            bucket_start: decode_ts(&ts)?,
            symbol: symbol.to_string(),
            timeframe,
            price,
            volume,
        });
    }
    Ok(bars)
}

#[async_trait]
impl BarRepository for SqliteBarRepository {
    async fn put(&self, bar: &Bar) -> Result<(), PersistenceError> {
        let bar = bar.clone();
        self.with_conn(move |conn| {
            conn.prepare_cached(UPSERT)
                .and_then(|mut stmt| {
                    stmt.execute(params![
                        encode_ts(bar.bucket_start),
                        bar.symbol,
                        bar.timeframe.as_str(),
                        bar.price,
                        bar.volume,
                    ])
                })
                .map(|_| ())
                .map_err(|e| PersistenceError::Query(e.to_string()))
        })
        .await
    }

    async fn query(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, PersistenceError> {
        let symbol = symbol.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut bars = self
            .with_conn(move |conn| {
                select_bars(
                    conn,
                    "SELECT ts, price, volume FROM bars
                     WHERE symbol = ?1 AND timeframe = ?2
                     ORDER BY ts DESC LIMIT ?3",
                    &symbol,
                    timeframe,
                    limit,
                )
            })
            .await?;
        bars.reverse();
        Ok(bars)
    }

    async fn query_all(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<Bar>, PersistenceError> {
        let symbol = symbol.to_string();
        self.with_conn(move |conn| {
            select_bars(
                conn,
                "SELECT ts, price, volume FROM bars
                 WHERE symbol = ?1 AND timeframe = ?2
                 ORDER BY ts ASC LIMIT ?3",
                &symbol,
                timeframe,
                -1,
            )
        })
        .await
    }
}
