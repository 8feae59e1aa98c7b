//! Tick Store
//!
//! Bounded, per-symbol history of trade ticks shared between the feed
//! ingestion path (writer) and the resampler / analytics (readers).
//!
//! # Locking
//!
//! The symbol map sits behind a `RwLock` that is only write-locked the first
//! time a symbol is seen. Each symbol's ring buffer has its own `Mutex`, so
//! appends for different symbols never contend and a snapshot is a single
//! copy taken while the buffer lock is held.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

// =============================================================================
// Types
// =============================================================================

/// A symbol string as delivered by the feed (lower-case exchange ticker).
pub type Symbol = String;

/// Default per-symbol capacity of the tick store.
pub const DEFAULT_TICK_CAPACITY: usize = 10_000;

/// A single trade event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Symbol the trade belongs to.
    pub symbol: Symbol,
    /// Exchange trade time.
    pub timestamp: DateTime<Utc>,
    /// Trade price.
    pub price: f64,
    /// Trade size.
    pub size: f64,
}

impl Tick {
    /// Create a new tick.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, timestamp: DateTime<Utc>, price: f64, size: f64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            price,
            size,
        }
    }
}

type History = Arc<Mutex<VecDeque<Tick>>>;

// =============================================================================
// Tick Store
// =============================================================================

/// Bounded, concurrency-safe recent-history buffer keyed by symbol.
///
/// Insertion order is arrival order. Once a symbol holds `capacity` ticks,
/// each append evicts the oldest one.
#[derive(Debug)]
pub struct TickStore {
    capacity: usize,
    histories: RwLock<HashMap<Symbol, History>>,
}

impl Default for TickStore {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_CAPACITY)
    }
}

impl TickStore {
    /// Create a store holding at most `capacity` ticks per symbol.
    ///
    /// A capacity of zero is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            histories: RwLock::new(HashMap::new()),
        }
    }

    /// Per-symbol capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Feed adapter entry point: record one trade event.
    pub fn on_tick(&self, symbol: &str, timestamp: DateTime<Utc>, price: f64, size: f64) {
        self.append(Tick::new(symbol, timestamp, price, size));
    }

    /// Append a tick to its symbol's history, evicting the oldest when full.
    pub fn append(&self, tick: Tick) {
        let history = self.history_for(&tick.symbol);
        let mut buffer = history.lock();
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(tick);
    }

    /// Point-in-time copy of a symbol's history in arrival order.
    ///
    /// Unknown symbols yield an empty vector.
    #[must_use]
    pub fn snapshot(&self, symbol: &str) -> Vec<Tick> {
        let Some(history) = self.histories.read().get(symbol).cloned() else {
            return Vec::new();
        };
        let buffer = history.lock();
        buffer.iter().cloned().collect()
    }

    /// Number of ticks currently held for a symbol.
    #[must_use]
    pub fn len(&self, symbol: &str) -> usize {
        self.histories
            .read()
            .get(symbol)
            .map_or(0, |history| history.lock().len())
    }

    /// Symbols that have received at least one tick, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        let mut symbols: Vec<Symbol> = self.histories.read().keys().cloned().collect();
        symbols.sort();
        symbols
    }

    fn history_for(&self, symbol: &str) -> History {
        if let Some(history) = self.histories.read().get(symbol) {
            return Arc::clone(history);
        }
        let mut histories = self.histories.write();
        Arc::clone(
            histories
                .entry(symbol.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(VecDeque::with_capacity(self.capacity)))),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
