#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::cast_precision_loss,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Pair Analytics - Real-time Pair-Trading Tick Pipeline
//!
//! Maintains a bounded history of trade ticks per symbol, compresses it into
//! fixed-timeframe bars for durable storage, and answers pair-trading queries
//! (hedge ratio, spread z-score, stationarity, correlation) that drive a
//! threshold alert engine and a rule-based trade decision.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure pipeline logic and in-memory state
//!   - `tick`: Tick record and the bounded per-symbol tick store
//!   - `bars`: Timeframes, bars and resampling
//!   - `analytics`: Alignment, rolling statistics, ADF, pair statistics
//!   - `alerts`: Alert rules and the cooldown-gated registry
//!   - `decision`: Confidence-scored trade decisions
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Durable bar storage interface
//!   - `services`: Periodic resample loop, analytics query service
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `binance`: Trade stream WebSocket client
//!   - `persistence`: SQLite and in-memory bar stores
//!   - `http`: REST API, health and metrics endpoints
//!   - `config`, `metrics`, `telemetry`
//!
//! # Data Flow
//!
//! ```text
//! trade WS ──► TickStore ──┬──► ResampleLoop ──► BarRepository
//!                          │
//!                          └──► AnalyticsService ──┬──► AlertRegistry
//!                                                  └──► decide()
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Tick history, bars, statistics, alerts and decisions.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::alerts::{AlertDirection, AlertRegistry, AlertRule, NewAlertRule, TriggeredAlert};
pub use domain::analytics::{AdfResult, PairOutcome, PairStatistics, PriceStats};
pub use domain::bars::{Bar, Resampler, Timeframe};
pub use domain::decision::{Decision, MarketBias, TradeSignal, decide};
pub use domain::tick::{DEFAULT_TICK_CAPACITY, Symbol, Tick, TickStore};

// Application
pub use application::ports::{BarRepository, PersistenceError};
pub use application::services::{AnalyticsService, AnalyticsSettings, ResampleLoop};

// Infrastructure config
pub use infrastructure::config::{AppConfig, ConfigError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
