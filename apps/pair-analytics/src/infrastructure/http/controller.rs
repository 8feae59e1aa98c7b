//! HTTP Controller (Driver Adapter)
//!
//! Axum routes that delegate to the analytics service and the bar store.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::application::ports::BarRepository;
use crate::application::services::{
    AnalyticsService, PairReport, PriceStatsReport, SymbolZScore,
};
use crate::domain::alerts::NewAlertRule;
use crate::domain::analytics::PairOutcome;
use crate::domain::bars::Bar;
use crate::infrastructure::binance::FeedState;

use super::error::ApiError;
use super::health::{health_handler, liveness_handler, metrics_handler, readiness_handler};
use super::request::{
    BarsQuery, ExportQuery, PairQuery, StatsQuery, ZScoreQuery, normalize_symbol,
};
use super::response::{
    AlertCreatedResponse, BarCsvRow, BarResponse, PairResponse, PairSeriesResponse,
    StatsResponse, StatusResponse, WaitingResponse, ZScoreResponse,
};

/// Application state shared across handlers.
pub struct AppState<R>
where
    R: BarRepository + ?Sized,
{
    /// Analytics queries and alert registry.
    pub analytics: Arc<AnalyticsService>,
    /// Durable bar store.
    pub bars: Arc<R>,
    /// Per-symbol feed state, for health reporting.
    pub feeds: Arc<[Arc<FeedState>]>,
    /// Application version.
    pub version: String,
    /// Process start.
    pub started_at: Instant,
}

impl<R> AppState<R>
where
    R: BarRepository + ?Sized,
{
    /// Create state with the clock started now.
    #[must_use]
    pub fn new(analytics: Arc<AnalyticsService>, bars: Arc<R>, feeds: Vec<Arc<FeedState>>) -> Self {
        Self {
            analytics,
            bars,
            feeds: feeds.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
        }
    }
}

impl<R> Clone for AppState<R>
where
    R: BarRepository + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            analytics: Arc::clone(&self.analytics),
            bars: Arc::clone(&self.bars),
            feeds: Arc::clone(&self.feeds),
            version: self.version.clone(),
            started_at: self.started_at,
        }
    }
}

/// Create the HTTP router with all endpoints.
pub fn create_router<R>(state: AppState<R>) -> Router
where
    R: BarRepository + ?Sized + 'static,
{
    Router::new()
        .route("/ticks/{symbol}", get(get_ticks::<R>))
        .route("/zscore/{symbol}", get(get_zscore::<R>))
        .route("/stats/{symbol}", get(get_stats::<R>))
        .route("/pair", get(get_pair::<R>))
        .route("/pair_series", get(get_pair_series::<R>))
        .route("/alerts", get(list_alerts::<R>).post(create_alert::<R>))
        .route("/bars", get(get_bars::<R>))
        .route("/export", get(export_bars::<R>))
        .route("/health", get(health_handler::<R>))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler::<R>))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// Tick and single-symbol analytics
// =============================================================================

async fn get_ticks<R>(State(state): State<AppState<R>>, Path(symbol): Path<String>) -> Response
where
    R: BarRepository + ?Sized,
{
    Json(state.analytics.ticks(&normalize_symbol(&symbol))).into_response()
}

async fn get_zscore<R>(
    State(state): State<AppState<R>>,
    Path(symbol): Path<String>,
    query: Result<Query<ZScoreQuery>, QueryRejection>,
) -> Result<Response, ApiError>
where
    R: BarRepository + ?Sized,
{
    let Query(query) = query?;
    let symbol = normalize_symbol(&symbol);
    let response = match state.analytics.symbol_zscore(&symbol, query.window)? {
        SymbolZScore::WaitingForData { ticks, required } => {
            Json(WaitingResponse::for_ticks(ticks, required)).into_response()
        }
        SymbolZScore::InsufficientData => Json(StatusResponse::insufficient_data()).into_response(),
        SymbolZScore::Ready(zscore) => Json(ZScoreResponse {
            symbol,
            window: query.window,
            zscore,
        })
        .into_response(),
    };
    Ok(response)
}

async fn get_stats<R>(
    State(state): State<AppState<R>>,
    Path(symbol): Path<String>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> Result<Response, ApiError>
where
    R: BarRepository + ?Sized,
{
    let Query(query) = query?;
    let symbol = normalize_symbol(&symbol);
    let response = match state.analytics.price_stats(&symbol, query.window)? {
        PriceStatsReport::WaitingForData { ticks, required } => {
            Json(WaitingResponse::for_ticks(ticks, required)).into_response()
        }
        PriceStatsReport::Ready(stats) => Json(StatsResponse {
            symbol,
            window: query.window,
            stats,
        })
        .into_response(),
    };
    Ok(response)
}

// =============================================================================
// Pair analytics
// =============================================================================

async fn get_pair<R>(
    State(state): State<AppState<R>>,
    query: Result<Query<PairQuery>, QueryRejection>,
) -> Result<Response, ApiError>
where
    R: BarRepository + ?Sized,
{
    let Query(query) = query?;
    let y = normalize_symbol(&query.y);
    let x = normalize_symbol(&query.x);
    let response = match state.analytics.pair(&y, &x, query.window)? {
        PairReport::WaitingForData {
            aligned_points,
            required,
        } => Json(WaitingResponse::for_aligned(aligned_points, required)).into_response(),
        PairReport::Ready(analytics) => {
            Json(PairResponse::new(y, x, query.window, *analytics)).into_response()
        }
    };
    Ok(response)
}

async fn get_pair_series<R>(
    State(state): State<AppState<R>>,
    query: Result<Query<PairQuery>, QueryRejection>,
) -> Result<Response, ApiError>
where
    R: BarRepository + ?Sized,
{
    let Query(query) = query?;
    let y = normalize_symbol(&query.y);
    let x = normalize_symbol(&query.x);
    let response = match state.analytics.pair_series(&y, &x, query.window)? {
        PairOutcome::WaitingForData {
            aligned_points,
            required,
        } => Json(WaitingResponse::for_aligned(aligned_points, required)).into_response(),
        PairOutcome::Ready(statistics) => {
            Json(PairSeriesResponse::from(*statistics)).into_response()
        }
    };
    Ok(response)
}

// =============================================================================
// Alerts
// =============================================================================

async fn create_alert<R>(
    State(state): State<AppState<R>>,
    body: Result<Json<NewAlertRule>, JsonRejection>,
) -> Result<Json<AlertCreatedResponse>, ApiError>
where
    R: BarRepository + ?Sized,
{
    let Json(mut request) = body?;
    request.y = normalize_symbol(&request.y);
    request.x = normalize_symbol(&request.x);
    let rule = state.analytics.register_alert(request)?;
    Ok(Json(AlertCreatedResponse::new(rule)))
}

async fn list_alerts<R>(State(state): State<AppState<R>>) -> impl IntoResponse
where
    R: BarRepository + ?Sized,
{
    Json(state.analytics.list_alerts())
}

// =============================================================================
// Bars
// =============================================================================

async fn get_bars<R>(
    State(state): State<AppState<R>>,
    query: Result<Query<BarsQuery>, QueryRejection>,
) -> Result<Json<Vec<BarResponse>>, ApiError>
where
    R: BarRepository + ?Sized,
{
    let Query(query) = query?;
    let timeframe = query.timeframe()?;
    let bars = state
        .bars
        .query(&normalize_symbol(&query.symbol), timeframe, query.limit)
        .await?;
    Ok(Json(bars.iter().map(BarResponse::from).collect()))
}

async fn export_bars<R>(
    State(state): State<AppState<R>>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, ApiError>
where
    R: BarRepository + ?Sized,
{
    let Query(query) = query?;
    let timeframe = query.timeframe()?;
    let symbol = normalize_symbol(&query.symbol);
    let bars = state.bars.query_all(&symbol, timeframe).await?;
    let body = bars_to_csv(&bars)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{symbol}_{timeframe}.csv\""),
            ),
        ],
        body,
    )
        .into_response())
}

/// Render bars as `ts,price,volume` CSV. The header is written even when
/// there are no rows.
fn bars_to_csv(bars: &[Bar]) -> Result<Vec<u8>, ApiError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(["ts", "price", "volume"])
        .map_err(|e| ApiError::Export(e.to_string()))?;
    for bar in bars {
        writer
            .serialize(BarCsvRow::from(bar))
            .map_err(|e| ApiError::Export(e.to_string()))?;
    }
    writer.into_inner().map_err(|e| ApiError::Export(e.to_string()))
}

// =============================================================================
// Tests
// =============================================================================
