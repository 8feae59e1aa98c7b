//! Pipeline Configuration Settings
//!
//! Configuration types loaded from `PAIRS_*` environment variables. Unset or
//! unparsable numeric values fall back to their defaults; values that parse
//! but make no sense are rejected.

use std::path::PathBuf;
use std::time::Duration;

use crate::application::services::{
    AnalyticsSettings, DEFAULT_PAIR_LIQUIDITY, DEFAULT_RESAMPLE_INTERVAL,
};
use crate::domain::analytics::DEFAULT_GRID_SECS;
use crate::domain::tick::{DEFAULT_TICK_CAPACITY, Symbol};

/// Symbols subscribed when `PAIRS_SYMBOLS` is unset.
pub const DEFAULT_SYMBOLS: &str = "btcusdt,ethusdt";

/// Trade stream base URL when `PAIRS_FEED_BASE_URL` is unset.
pub const DEFAULT_FEED_BASE_URL: &str = "wss://stream.binance.com:9443/ws";

/// Trade feed connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    /// Lower-cased symbols, one stream each.
    pub symbols: Vec<Symbol>,
    /// Base WebSocket URL; the stream path is `{base}/{symbol}@trade`.
    pub base_url: String,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Maximum reconnection attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            symbols: parse_symbols(DEFAULT_SYMBOLS),
            base_url: DEFAULT_FEED_BASE_URL.to_string(),
            reconnect_delay_initial: Duration::from_millis(500),
            reconnect_delay_max: Duration::from_secs(30),
            reconnect_delay_multiplier: 2.0,
            max_reconnect_attempts: 0, // Unlimited
        }
    }
}

impl FeedSettings {
    /// Stream URL for one symbol.
    #[must_use]
    pub fn stream_url(&self, symbol: &str) -> String {
        format!("{}/{symbol}@trade", self.base_url.trim_end_matches('/'))
    }
}

/// In-memory pipeline and analytics settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    /// Per-symbol tick history capacity.
    pub tick_capacity: usize,
    /// Resample loop period.
    pub resample_interval: Duration,
    /// Pair alignment grid width in seconds.
    pub alignment_grid_secs: i64,
    /// Liquidity estimate fed to the decision engine.
    pub liquidity_estimate: f64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            tick_capacity: DEFAULT_TICK_CAPACITY,
            resample_interval: DEFAULT_RESAMPLE_INTERVAL,
            alignment_grid_secs: DEFAULT_GRID_SECS,
            liquidity_estimate: DEFAULT_PAIR_LIQUIDITY,
        }
    }
}

impl PipelineSettings {
    /// Analytics tunables derived from these settings.
    #[must_use]
    pub const fn analytics(&self) -> AnalyticsSettings {
        AnalyticsSettings {
            grid_secs: self.alignment_grid_secs,
            liquidity: self.liquidity_estimate,
        }
    }
}

/// HTTP server and storage settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// HTTP API port (also serves health and metrics).
    pub http_port: u16,
    /// SQLite database file.
    pub db_path: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 8000,
            db_path: PathBuf::from("market_data.db"),
        }
    }
}

/// Complete process configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    /// Trade feed settings.
    pub feed: FeedSettings,
    /// Pipeline settings.
    pub pipeline: PipelineSettings,
    /// Server settings.
    pub server: ServerSettings,
}

impl AppConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the symbol list is empty or a value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let symbols = env
            .get("PAIRS_SYMBOLS")
            .map_or_else(|| parse_symbols(DEFAULT_SYMBOLS), |raw| parse_symbols(&raw));
        if symbols.is_empty() {
            return Err(ConfigError::EmptyValue("PAIRS_SYMBOLS".to_string()));
        }

        let feed_defaults = FeedSettings::default();
        let feed = FeedSettings {
            symbols,
            base_url: env
                .get("PAIRS_FEED_BASE_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(feed_defaults.base_url),
            reconnect_delay_initial: env.duration_millis(
                "PAIRS_RECONNECT_DELAY_INITIAL_MS",
                feed_defaults.reconnect_delay_initial,
            ),
            reconnect_delay_max: env.duration_secs(
                "PAIRS_RECONNECT_DELAY_MAX_SECS",
                feed_defaults.reconnect_delay_max,
            ),
            reconnect_delay_multiplier: env.parse(
                "PAIRS_RECONNECT_DELAY_MULTIPLIER",
                feed_defaults.reconnect_delay_multiplier,
            ),
            max_reconnect_attempts: env.parse(
                "PAIRS_MAX_RECONNECT_ATTEMPTS",
                feed_defaults.max_reconnect_attempts,
            ),
        };

        let pipeline_defaults = PipelineSettings::default();
        let pipeline = PipelineSettings {
            tick_capacity: env.parse("PAIRS_TICK_CAPACITY", pipeline_defaults.tick_capacity),
            resample_interval: env.duration_millis(
                "PAIRS_RESAMPLE_INTERVAL_MS",
                pipeline_defaults.resample_interval,
            ),
            alignment_grid_secs: env.parse(
                "PAIRS_ALIGNMENT_GRID_SECS",
                pipeline_defaults.alignment_grid_secs,
            ),
            liquidity_estimate: env.parse(
                "PAIRS_LIQUIDITY_ESTIMATE",
                pipeline_defaults.liquidity_estimate,
            ),
        };

        if pipeline.tick_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: "PAIRS_TICK_CAPACITY".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if pipeline.alignment_grid_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "PAIRS_ALIGNMENT_GRID_SECS".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if pipeline.resample_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "PAIRS_RESAMPLE_INTERVAL_MS".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&pipeline.liquidity_estimate) {
            return Err(ConfigError::InvalidValue {
                key: "PAIRS_LIQUIDITY_ESTIMATE".to_string(),
                reason: "must be within [0, 1]".to_string(),
            });
        }

        let server_defaults = ServerSettings::default();
        let server = ServerSettings {
            http_port: env.parse("PAIRS_HTTP_PORT", server_defaults.http_port),
            db_path: env
                .get("PAIRS_DB_PATH")
                .filter(|path| !path.trim().is_empty())
                .map_or(server_defaults.db_path, PathBuf::from),
        };

        Ok(Self {
            feed,
            pipeline,
            server,
        })
    }
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has an empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable parsed but is out of range.
    #[error("environment variable {key} is invalid: {reason}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// What is wrong with it.
        reason: String,
    },
}

fn parse_symbols(raw: &str) -> Vec<Symbol> {
    let mut symbols: Vec<Symbol> = Vec::new();
    for symbol in raw.split(',').map(|s| s.trim().to_lowercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
    }

    fn parse<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        self.get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_secs)
    }

    fn duration_millis(&self, key: &str, default: Duration) -> Duration {
        self.get(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map_or(default, Duration::from_millis)
    }
}
