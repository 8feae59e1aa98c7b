//! Trade Stream Client
//!
//! Connects to one symbol's trade stream and appends every decoded trade to
//! the tick store. Connection errors and close frames trigger a reconnect
//! with exponential backoff; malformed frames are dropped and counted.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::codec::{CodecError, TradeCodec};
use super::reconnect::{ReconnectConfig, ReconnectPolicy};
use super::state::{ConnectionState, FeedState};
use crate::domain::tick::TickStore;
use crate::infrastructure::metrics::{self, DropReason};

// =============================================================================
// Error Type
// =============================================================================

/// Errors that end a trade stream client.
#[derive(Debug, thiserror::Error)]
pub enum FeedClientError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Server closed the connection or the stream ended.
    #[error("connection closed")]
    ConnectionClosed,

    /// Backoff budget exhausted.
    #[error("maximum reconnection attempts exceeded")]
    MaxReconnectAttemptsExceeded,
}

// =============================================================================
// Client
// =============================================================================

/// WebSocket client for a single symbol.
pub struct TradeStreamClient {
    url: String,
    codec: TradeCodec,
    store: Arc<TickStore>,
    state: Arc<FeedState>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
}

impl TradeStreamClient {
    /// Create a client for `symbol` streaming from `url`.
    #[must_use]
    pub fn new(
        symbol: &str,
        url: String,
        store: Arc<TickStore>,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            url,
            codec: TradeCodec::new(symbol),
            store,
            state: Arc::new(FeedState::new(symbol)),
            reconnect,
            cancel,
        }
    }

    /// Shared connection state for health reporting.
    #[must_use]
    pub fn state(&self) -> Arc<FeedState> {
        Arc::clone(&self.state)
    }

    /// Run until cancelled or the reconnect budget is spent.
    ///
    /// # Errors
    ///
    /// Returns `FeedClientError::MaxReconnectAttemptsExceeded` once the
    /// backoff policy refuses another attempt.
    pub async fn run(self: Arc<Self>) -> Result<(), FeedClientError> {
        let mut policy = ReconnectPolicy::new(self.reconnect.clone());
        let symbol = self.codec.symbol();

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.state.set_state(ConnectionState::Connecting);
            let result = self.connect_and_run(&mut policy).await;
            if self.cancel.is_cancelled() {
                break;
            }

            match result {
                Ok(()) => break,
                Err(e) => {
                    tracing::warn!(symbol, error = %e, "Trade stream disconnected");
                    self.state.set_error(e.to_string());
                }
            }

            let Some(delay) = policy.next_delay() else {
                self.state.set_state(ConnectionState::Failed);
                tracing::error!(
                    symbol,
                    attempts = policy.attempt_count(),
                    "Giving up on trade stream"
                );
                return Err(FeedClientError::MaxReconnectAttemptsExceeded);
            };

            self.state.set_state(ConnectionState::Reconnecting);
            self.state.increment_reconnect_attempts();
            metrics::record_reconnect(symbol);
            tracing::info!(
                symbol,
                attempt = policy.attempt_count(),
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "Reconnecting to trade stream"
            );

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(delay) => {}
            }
        }

        self.state.set_state(ConnectionState::Disconnected);
        tracing::info!(symbol, "Trade stream client stopped");
        Ok(())
    }

    async fn connect_and_run(&self, policy: &mut ReconnectPolicy) -> Result<(), FeedClientError> {
        tracing::info!(url = %self.url, "Connecting to trade stream");
        let (ws_stream, _response) = tokio::select! {
            () = self.cancel.cancelled() => return Ok(()),
            connected = tokio_tungstenite::connect_async(self.url.as_str()) => connected?,
        };

        self.state.set_state(ConnectionState::Connected);
        policy.reset();
        tracing::info!(symbol = self.codec.symbol(), "Trade stream connected");

        let (mut write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        self.handle_frame(&text);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        write.send(Message::Pong(data)).await?;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "Server sent close frame");
                        return Err(FeedClientError::ConnectionClosed);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(FeedClientError::ConnectionClosed),
                },
            }
        }
    }

    /// Decode one text frame into the tick store. Returns whether it was accepted.
    pub fn handle_frame(&self, text: &str) -> bool {
        let symbol = self.codec.symbol();
        match self.codec.decode(text) {
            Ok(tick) => {
                self.store.append(tick);
                self.state.increment_messages();
                metrics::record_tick_ingested(symbol);
                true
            }
            Err(e) => {
                let reason = drop_reason(&e);
                tracing::warn!(symbol, error = %e, "Dropping trade event");
                self.state.increment_dropped();
                metrics::record_feed_event_dropped(symbol, reason);
                false
            }
        }
    }
}

const fn drop_reason(error: &CodecError) -> DropReason {
    if error.is_malformed() {
        DropReason::Malformed
    } else {
        DropReason::InvalidNumber
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::net::TcpListener;

    use super::*;

    fn frame(price: &str, trade_time: i64) -> String {
        format!(
            r#"{{"e":"trade","E":{trade_time},"s":"BTCUSDT","t":1,"p":"{price}","q":"0.5","T":{trade_time},"m":false}}"#
        )
    }

    fn fast_reconnect(max_attempts: u32) -> ReconnectConfig {
        ReconnectConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            multiplier: 2.0,
            jitter_factor: 0.0,
            max_attempts,
        }
    }

    fn client(url: String, store: Arc<TickStore>, max_attempts: u32) -> TradeStreamClient {
        TradeStreamClient::new(
            "btcusdt",
            url,
            store,
            fast_reconnect(max_attempts),
            CancellationToken::new(),
        )
    }

    #[test]
    fn handle_frame_appends_valid_and_drops_bad() {
        let store = Arc::new(TickStore::new(100));
        let client = client("ws://unused".to_string(), Arc::clone(&store), 0);

        assert!(client.handle_frame(&frame("100.5", 1_700_000_000_000)));
        assert!(!client.handle_frame("{oops"));
        assert!(!client.handle_frame(&frame("-1", 1_700_000_000_000)));

        assert_eq!(store.len("btcusdt"), 1);
        let state = client.state().snapshot();
        assert_eq!(state.messages_received, 1);
        assert_eq!(state.events_dropped, 2);
    }

    #[tokio::test]
    async fn streams_trades_from_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(Message::Text(frame("101.0", 1_700_000_000_000).into())).await.unwrap();
            ws.send(Message::Text("garbage".to_string().into())).await.unwrap();
            ws.send(Message::Text(frame("102.0", 1_700_000_001_000).into())).await.unwrap();
            // Hold the connection open until the client closes it.
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        });

        let store = Arc::new(TickStore::new(100));
        let client = Arc::new(client(
            format!("ws://{addr}/ws/btcusdt@trade"),
            Arc::clone(&store),
            0,
        ));
        let cancel = client.cancel.clone();
        let handle = tokio::spawn(Arc::clone(&client).run());

        tokio::time::timeout(Duration::from_secs(5), async {
            while store.len("btcusdt") < 2 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        let ticks = store.snapshot("btcusdt");
        assert_eq!(ticks[0].price, 101.0);
        assert_eq!(ticks[1].price, 102.0);
        assert!(client.state().is_connected());
        assert_eq!(client.state().snapshot().events_dropped, 1);

        cancel.cancel();
        handle.await.unwrap().unwrap();
        assert_eq!(client.state().state(), ConnectionState::Disconnected);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        // Bind then drop so the port refuses connections.
        let addr = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
        let store = Arc::new(TickStore::new(10));
        let client = Arc::new(client(format!("ws://{addr}/ws/btcusdt@trade"), store, 2));

        let result = tokio::time::timeout(Duration::from_secs(5), Arc::clone(&client).run())
            .await
            .unwrap();
        assert!(matches!(result, Err(FeedClientError::MaxReconnectAttemptsExceeded)));
        assert_eq!(client.state().state(), ConnectionState::Failed);
        assert_eq!(client.state().snapshot().reconnect_attempts, 2);
    }

    #[tokio::test]
    async fn cancelled_before_connect_returns_ok() {
        let store = Arc::new(TickStore::new(10));
        let client = Arc::new(client("ws://127.0.0.1:9/ws".to_string(), store, 0));
        client.cancel.cancel();
        assert!(Arc::clone(&client).run().await.is_ok());
    }
}
