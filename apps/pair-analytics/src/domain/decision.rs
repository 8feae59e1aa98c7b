//! Decision Engine
//!
//! Maps a spread z-score, a return correlation and a liquidity estimate to a
//! market bias, a trade signal and a 0-100 confidence score. Pure and total.

use serde::{Deserialize, Serialize};

/// Liquidity estimate used when the caller has none.
pub const DEFAULT_LIQUIDITY: f64 = 0.5;

/// Correlation below which the pair is considered unreliable.
pub const MIN_CORRELATION: f64 = 0.4;

/// Absolute z-score beyond which the spread is overextended.
pub const ZSCORE_ENTRY: f64 = 2.0;

/// Directional view on the spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketBias {
    /// Spread expected to widen back up.
    Bullish,
    /// Spread expected to fall back.
    Bearish,
    /// No view.
    Neutral,
}

/// Suggested action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSignal {
    /// Buy the spread.
    Buy,
    /// Sell the spread.
    Sell,
    /// Stay flat.
    Hold,
}

/// Output of [`decide`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Directional view.
    pub market_bias: MarketBias,
    /// Suggested action.
    pub trade_signal: TradeSignal,
    /// Confidence in `0..=100`.
    pub confidence: u8,
    /// One explanation per contributing rule, in firing order.
    pub reasons: Vec<String>,
}

impl Decision {
    fn hold(confidence: u8, reason: &str) -> Self {
        Self {
            market_bias: MarketBias::Neutral,
            trade_signal: TradeSignal::Hold,
            confidence,
            reasons: vec![reason.to_string()],
        }
    }
}

/// Score a pair.
///
/// `liquidity` is clamped into `[0, 1]`; a non-finite value counts as zero.
#[must_use]
pub fn decide(zscore: Option<f64>, correlation: Option<f64>, liquidity: f64) -> Decision {
    let (Some(z), Some(corr)) = (
        zscore.filter(|v| v.is_finite()),
        correlation.filter(|v| v.is_finite()),
    ) else {
        return Decision::hold(20, "Insufficient data");
    };

    if corr < MIN_CORRELATION {
        return Decision::hold(25, "Low correlation – unreliable pair");
    }

    let mut confidence = 0.0;
    let mut reasons = Vec::with_capacity(3);

    let (market_bias, trade_signal) = if z > ZSCORE_ENTRY {
        confidence += (z.abs() * 30.0).min(60.0);
        reasons.push("Z-score > +2 (spread overextended)".to_string());
        (MarketBias::Bearish, TradeSignal::Sell)
    } else if z < -ZSCORE_ENTRY {
        confidence += (z.abs() * 30.0).min(60.0);
        reasons.push("Z-score < -2 (spread overextended)".to_string());
        (MarketBias::Bullish, TradeSignal::Buy)
    } else {
        reasons.push("Z-score within normal range".to_string());
        (MarketBias::Neutral, TradeSignal::Hold)
    };

    confidence += corr * 30.0;
    reasons.push(format!("Rolling correlation = {corr:.2}"));

    let liquidity = if liquidity.is_finite() {
        liquidity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    confidence += liquidity * 40.0;
    reasons.push("Sufficient liquidity".to_string());

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let confidence = confidence.clamp(0.0, 100.0) as u8;

    Decision {
        market_bias,
        trade_signal,
        confidence,
        reasons,
    }
}
