//! Binance Trade Stream Adapter
//!
//! One WebSocket per symbol on `{base}/{symbol}@trade`. Trade events are
//! decoded into core [`Tick`](crate::domain::tick::Tick)s and appended to the
//! shared tick store.

pub mod client;
pub mod codec;
pub mod messages;
pub mod reconnect;
pub mod state;

pub use client::{FeedClientError, TradeStreamClient};
pub use codec::{CodecError, TradeCodec};
pub use messages::TradeEvent;
pub use reconnect::{ReconnectConfig, ReconnectPolicy};
pub use state::{ConnectionState, FeedState, FeedStateSnapshot};
