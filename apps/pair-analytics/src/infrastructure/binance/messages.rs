//! Trade stream wire format.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raw `@trade` event.
///
/// ```json
/// {"e":"trade","E":1700000000123,"s":"BTCUSDT","t":12345,
///  "p":"36500.10","q":"0.015","T":1700000000120,"m":true}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Event type (always "trade").
    #[serde(rename = "e")]
    pub event_type: String,

    /// Event time, milliseconds since epoch.
    #[serde(rename = "E")]
    pub event_time: i64,

    /// Exchange symbol, upper-case.
    #[serde(rename = "s")]
    pub symbol: String,

    /// Trade id.
    #[serde(rename = "t")]
    pub trade_id: u64,

    /// Price as a decimal string.
    #[serde(rename = "p", with = "rust_decimal::serde::str")]
    pub price: Decimal,

    /// Quantity as a decimal string.
    #[serde(rename = "q", with = "rust_decimal::serde::str")]
    pub quantity: Decimal,

    /// Trade time, milliseconds since epoch.
    #[serde(rename = "T")]
    pub trade_time: i64,

    /// Whether the buyer was the maker.
    #[serde(rename = "m", default)]
    pub buyer_is_maker: bool,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn deserializes_trade_event() {
        let json = r#"{"e":"trade","E":1700000000123,"s":"BTCUSDT","t":12345,"p":"36500.10","q":"0.015","T":1700000000120,"m":true,"M":true}"#;
        let event: TradeEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.symbol, "BTCUSDT");
        assert_eq!(event.price, Decimal::from_str("36500.10").unwrap());
        assert_eq!(event.quantity, Decimal::from_str("0.015").unwrap());
        assert_eq!(event.trade_time, 1_700_000_000_120);
        assert!(event.buyer_is_maker);
    }

    #[test]
    fn rejects_missing_price() {
        let json = r#"{"e":"trade","E":1,"s":"BTCUSDT","t":1,"q":"1","T":1}"#;
        assert!(serde_json::from_str::<TradeEvent>(json).is_err());
    }
}
