//! Per-feed connection state, shared with the health endpoint.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

/// Connection lifecycle of a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Receiving trades.
    Connected,
    /// Waiting out a backoff delay.
    Reconnecting,
    /// Gave up.
    Failed,
}

/// Live counters for one symbol's trade stream.
#[derive(Debug)]
pub struct FeedState {
    symbol: String,
    state: RwLock<ConnectionState>,
    last_connected_at: RwLock<Option<DateTime<Utc>>>,
    last_error: RwLock<Option<String>>,
    messages_received: AtomicU64,
    events_dropped: AtomicU64,
    reconnect_attempts: AtomicU32,
}

/// Point-in-time copy of a [`FeedState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedStateSnapshot {
    /// Symbol.
    pub symbol: String,
    /// Connection state.
    pub state: ConnectionState,
    /// Whether the feed is connected.
    pub connected: bool,
    /// Last successful connect.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Last connection error.
    pub last_error: Option<String>,
    /// Trades accepted.
    pub messages_received: u64,
    /// Frames discarded as malformed.
    pub events_dropped: u64,
    /// Reconnect attempts since the last connect.
    pub reconnect_attempts: u32,
}

impl FeedState {
    /// Create a disconnected state.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            state: RwLock::new(ConnectionState::Disconnected),
            last_connected_at: RwLock::new(None),
            last_error: RwLock::new(None),
            messages_received: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            reconnect_attempts: AtomicU32::new(0),
        }
    }

    /// Symbol this feed serves.
    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Transition to `state`. Connecting clears the error and attempt count.
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        if state == ConnectionState::Connected {
            *self.last_connected_at.write() = Some(Utc::now());
            *self.last_error.write() = None;
            self.reconnect_attempts.store(0, Ordering::Relaxed);
        }
    }

    /// Record a connection error.
    pub fn set_error(&self, message: impl Into<String>) {
        *self.last_error.write() = Some(message.into());
    }

    /// Count an accepted trade.
    pub fn increment_messages(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a dropped frame.
    pub fn increment_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count a reconnect attempt.
    pub fn increment_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the feed is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Copy of all fields.
    #[must_use]
    pub fn snapshot(&self) -> FeedStateSnapshot {
        let state = self.state();
        FeedStateSnapshot {
            symbol: self.symbol.clone(),
            state,
            connected: state == ConnectionState::Connected,
            last_connected_at: *self.last_connected_at.read(),
            last_error: self.last_error.read().clone(),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
        }
    }
}
