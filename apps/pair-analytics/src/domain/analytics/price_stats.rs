//! Trailing-window price statistics for a single symbol.

use serde::Serialize;

use super::stats::{finite, mean, pct_change, std_dev};

/// Summary of a price window. Undefined values are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PriceStats {
    /// Most recent price.
    pub last_price: Option<f64>,
    /// Mean simple return.
    pub mean_return: Option<f64>,
    /// Sample standard deviation of simple returns.
    pub volatility: Option<f64>,
    /// Lowest price.
    pub min_price: Option<f64>,
    /// Highest price.
    pub max_price: Option<f64>,
}

/// Compute statistics over `prices`, oldest first.
#[must_use]
pub fn price_stats(prices: &[f64]) -> PriceStats {
    let returns: Vec<f64> = pct_change(prices).into_iter().flatten().collect();

    PriceStats {
        last_price: prices.last().copied().and_then(finite),
        mean_return: mean(&returns),
        volatility: std_dev(&returns),
        min_price: prices.iter().copied().reduce(f64::min).and_then(finite),
        max_price: prices.iter().copied().reduce(f64::max).and_then(finite),
    }
}
