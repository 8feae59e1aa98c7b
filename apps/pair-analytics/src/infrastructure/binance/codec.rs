//! Trade event decoding.
//!
//! Turns a text frame into a core tick. The tick carries the configured
//! (lower-case) symbol, not the exchange's upper-case one.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::messages::TradeEvent;
use crate::domain::tick::Tick;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Frame is not a valid trade event.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Trade time outside the representable range.
    #[error("invalid trade timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Price not positive or not representable.
    #[error("invalid price: {0}")]
    InvalidPrice(Decimal),

    /// Quantity negative or not representable.
    #[error("invalid size: {0}")]
    InvalidSize(Decimal),
}

impl CodecError {
    /// Whether the frame failed to parse at all, as opposed to carrying bad values.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

/// Decoder for one symbol's trade stream.
#[derive(Debug, Clone)]
pub struct TradeCodec {
    symbol: String,
}

impl TradeCodec {
    /// Create a codec producing ticks for `symbol`.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
        }
    }

    /// Symbol stamped on decoded ticks.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Decode a text frame into a tick.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid JSON, a non-positive price, a negative
    /// size, or an out-of-range trade time.
    pub fn decode(&self, text: &str) -> Result<Tick, CodecError> {
        let event: TradeEvent = serde_json::from_str(text)?;
        self.to_tick(&event)
    }

    /// Convert a parsed event into a tick.
    ///
    /// # Errors
    ///
    /// Same value checks as [`TradeCodec::decode`].
    pub fn to_tick(&self, event: &TradeEvent) -> Result<Tick, CodecError> {
        let timestamp = DateTime::<Utc>::from_timestamp_millis(event.trade_time)
            .ok_or(CodecError::InvalidTimestamp(event.trade_time))?;

        let price = event
            .price
            .to_f64()
            .filter(|p| p.is_finite() && *p > 0.0)
            .ok_or(CodecError::InvalidPrice(event.price))?;

        let size = event
            .quantity
            .to_f64()
            .filter(|q| q.is_finite() && *q >= 0.0)
            .ok_or(CodecError::InvalidSize(event.quantity))?;

        Ok(Tick::new(self.symbol.clone(), timestamp, price, size))
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn frame(price: &str, qty: &str, trade_time: i64) -> String {
        format!(
            r#"{{"e":"trade","E":{trade_time},"s":"BTCUSDT","t":7,"p":"{price}","q":"{qty}","T":{trade_time},"m":false}}"#
        )
    }

    #[test]
    fn decodes_into_lowercase_tick() {
        let codec = TradeCodec::new("btcusdt");
        let tick = codec.decode(&frame("36500.5", "0.25", 1_700_000_000_250)).unwrap();
        assert_eq!(tick.symbol, "btcusdt");
        assert!((tick.price - 36_500.5).abs() < 1e-9);
        assert!((tick.size - 0.25).abs() < 1e-12);
        assert_eq!(tick.timestamp.timestamp_millis(), 1_700_000_000_250);
    }

    #[test_case("0", "1" ; "zero price")]
    #[test_case("-3.5", "1" ; "negative price")]
    #[test_case("10", "-1" ; "negative size")]
    fn rejects_bad_values(price: &str, qty: &str) {
        let codec = TradeCodec::new("btcusdt");
        let err = codec.decode(&frame(price, qty, 1_700_000_000_000)).unwrap_err();
        assert!(!err.is_malformed());
    }

    #[test]
    fn zero_size_is_accepted() {
        let codec = TradeCodec::new("btcusdt");
        assert!(codec.decode(&frame("10", "0", 1_700_000_000_000)).is_ok());
    }

    #[test]
    fn rejects_out_of_range_timestamp() {
        let codec = TradeCodec::new("btcusdt");
        let err = codec.decode(&frame("10", "1", i64::MAX)).unwrap_err();
        assert!(matches!(err, CodecError::InvalidTimestamp(_)));
    }

    #[test_case("not json" ; "garbage")]
    #[test_case(r#"{"e":"trade"}"# ; "missing fields")]
    #[test_case(r#"{"e":"trade","E":1,"s":"X","t":1,"p":"abc","q":"1","T":1}"# ; "non numeric price")]
    fn malformed_frames(text: &str) {
        let codec = TradeCodec::new("btcusdt");
        assert!(codec.decode(text).unwrap_err().is_malformed());
    }
}
