//! Pair Analytics Binary
//!
//! Streams trades for the configured symbols, persists bars and serves the
//! analytics API.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin pair-analytics
//! ```
//!
//! # Environment Variables
//!
//! - `PAIRS_SYMBOLS`: Comma-separated symbols (default: btcusdt,ethusdt)
//! - `PAIRS_FEED_BASE_URL`: Trade stream base URL (default: wss://stream.binance.com:9443/ws)
//! - `PAIRS_HTTP_PORT`: HTTP API port (default: 8000)
//! - `PAIRS_DB_PATH`: SQLite file (default: market_data.db)
//! - `PAIRS_TICK_CAPACITY`, `PAIRS_RESAMPLE_INTERVAL_MS`, `PAIRS_ALIGNMENT_GRID_SECS`,
//!   `PAIRS_LIQUIDITY_ESTIMATE`: pipeline tuning
//! - `PAIRS_RECONNECT_DELAY_INITIAL_MS`, `PAIRS_RECONNECT_DELAY_MAX_SECS`,
//!   `PAIRS_RECONNECT_DELAY_MULTIPLIER`, `PAIRS_MAX_RECONNECT_ATTEMPTS`: feed backoff
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `RUST_LOG`: Log filter (default: pair_analytics=info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use pair_analytics::application::ports::BarRepository;
use pair_analytics::infrastructure::binance::{ReconnectConfig, TradeStreamClient};
use pair_analytics::infrastructure::http::{AppState, HttpServer};
use pair_analytics::infrastructure::persistence::SqliteBarRepository;
use pair_analytics::infrastructure::telemetry;
use pair_analytics::{
    AlertRegistry, AnalyticsService, AppConfig, ResampleLoop, Resampler, TickStore, init_metrics,
};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Upper bound on waiting for tasks after the stop signal.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting pair analytics");

    init_metrics().context("failed to install Prometheus recorder")?;

    let config = AppConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let store = Arc::new(TickStore::new(config.pipeline.tick_capacity));
    let alerts = Arc::new(AlertRegistry::new());
    let analytics = Arc::new(AnalyticsService::new(
        Arc::clone(&store),
        alerts,
        config.pipeline.analytics(),
    ));
    let bars: Arc<dyn BarRepository> = Arc::new(
        SqliteBarRepository::open(&config.server.db_path)
            .with_context(|| format!("opening {}", config.server.db_path.display()))?,
    );

    let mut tasks = JoinSet::new();

    let reconnect = ReconnectConfig::from_feed_settings(&config.feed);
    let mut feeds = Vec::with_capacity(config.feed.symbols.len());
    for symbol in &config.feed.symbols {
        let client = Arc::new(TradeStreamClient::new(
            symbol,
            config.feed.stream_url(symbol),
            Arc::clone(&store),
            reconnect.clone(),
            shutdown_token.clone(),
        ));
        feeds.push(client.state());

        let symbol = symbol.clone();
        tasks.spawn(async move {
            if let Err(e) = client.run().await {
                tracing::error!(symbol = %symbol, error = %e, "Trade stream client failed");
            }
        });
    }

    let resample = ResampleLoop::new(
        Arc::clone(&store),
        Arc::clone(&bars),
        Resampler::default(),
        config.pipeline.resample_interval,
        shutdown_token.clone(),
    );
    tasks.spawn(resample.run());

    let server = HttpServer::new(
        config.server.http_port,
        AppState::new(analytics, bars, feeds),
        shutdown_token.clone(),
    );
    let server_token = shutdown_token.clone();
    tasks.spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!(error = %e, "HTTP server failed");
            server_token.cancel();
        }
    });

    tokio::select! {
        () = await_shutdown() => shutdown_token.cancel(),
        () = shutdown_token.cancelled() => {}
    }

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, async { while tasks.join_next().await.is_some() {} })
        .await
        .is_err()
    {
        tracing::warn!("Shutdown timed out, aborting remaining tasks");
        tasks.abort_all();
    }

    tracing::info!("Pair analytics stopped");
    Ok(())
}

fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let Ok(cwd) = std::env::current_dir() else {
        return;
    };
    for dir in cwd.ancestors().skip(1) {
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
            return;
        }
    }
}

fn log_config(config: &AppConfig) {
    tracing::info!(
        symbols = ?config.feed.symbols,
        http_port = config.server.http_port,
        db_path = %config.server.db_path.display(),
        tick_capacity = config.pipeline.tick_capacity,
        grid_secs = config.pipeline.alignment_grid_secs,
        liquidity = config.pipeline.liquidity_estimate,
        "Configuration loaded"
    );
    tracing::debug!(base_url = %config.feed.base_url, "Trade stream endpoint");
}

/// Resolve on Ctrl+C or SIGTERM.
async fn await_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, initiating shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, initiating shutdown"),
    }
}
