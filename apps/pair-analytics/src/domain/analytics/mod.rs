//! Pair Analytics
//!
//! Alignment of two tick histories, hedge-ratio regression, spread z-score,
//! ADF stationarity and return correlation, plus single-symbol statistics.

mod adf;
mod alignment;
mod pair;
mod price_stats;
pub mod stats;

pub use adf::{ADF_SIGNIFICANCE, AdfResult, MIN_ADF_POINTS, adf_test, mackinnon_p_value};
pub use alignment::{AlignedSeries, DEFAULT_GRID_SECS, align, last_price_per_bucket};
pub use pair::{PairOutcome, PairStatistics, analyze_pair};
pub use price_stats::{PriceStats, price_stats};
