//! Domain Layer - Tick history, bars, statistics, alerts and decisions.
//!
//! Everything here is synchronous and free of I/O. The only shared mutable
//! state in the process lives in [`tick::TickStore`] and
//! [`alerts::AlertRegistry`], both of which lock internally.

/// Pair alignment, rolling statistics and stationarity testing.
pub mod analytics;

/// Threshold alert rules with cooldown.
pub mod alerts;

/// Timeframe bars and tick resampling.
pub mod bars;

/// Rule-based trade decisions.
pub mod decision;

/// Tick records and the bounded per-symbol tick store.
pub mod tick;
