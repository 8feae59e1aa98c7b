//! Application Services
//!
//! - `ResampleLoop`: periodic tick → bar compression and persistence
//! - `AnalyticsService`: request-time queries over the tick store and alerts

mod analytics;
mod resample;

pub use analytics::{
    AnalyticsError, AnalyticsService, AnalyticsSettings, DEFAULT_PAIR_LIQUIDITY, MIN_WINDOW,
    PairAnalytics, PairReport, PriceStatsReport, SymbolZScore,
};
pub use resample::{CycleReport, DEFAULT_RESAMPLE_INTERVAL, ResampleLoop};
