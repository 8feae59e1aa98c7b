//! Health, readiness and metrics endpoints.
//!
//! - `GET /health` - JSON status with per-feed state
//! - `GET /healthz` - liveness (always OK)
//! - `GET /readyz` - ready once any feed is connected
//! - `GET /metrics` - Prometheus text format

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::application::ports::BarRepository;
use crate::infrastructure::binance::FeedStateSnapshot;
use crate::infrastructure::metrics::get_metrics_handle;

use super::controller::AppState;
use super::response::HealthResponse;

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Every feed connected.
    Healthy,
    /// Some feeds connected.
    Degraded,
    /// No feed connected.
    Unhealthy,
}

/// Status from feed connectivity. A process with no feeds is healthy.
#[must_use]
pub fn determine_health_status(feeds: &[FeedStateSnapshot]) -> HealthStatus {
    let connected = feeds.iter().filter(|feed| feed.connected).count();
    if connected == feeds.len() {
        HealthStatus::Healthy
    } else if connected > 0 {
        HealthStatus::Degraded
    } else {
        HealthStatus::Unhealthy
    }
}

pub(super) async fn health_handler<R>(State(state): State<AppState<R>>) -> impl IntoResponse
where
    R: BarRepository + ?Sized,
{
    let feeds: Vec<FeedStateSnapshot> = state.feeds.iter().map(|feed| feed.snapshot()).collect();
    let status = determine_health_status(&feeds);
    let response = HealthResponse {
        status,
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        tracked_symbols: state.analytics.store().symbols(),
        feeds,
    };
    let code = match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (code, Json(response))
}

pub(super) async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

pub(super) async fn readiness_handler<R>(State(state): State<AppState<R>>) -> impl IntoResponse
where
    R: BarRepository + ?Sized,
{
    let ready = state.feeds.is_empty() || state.feeds.iter().any(|feed| feed.is_connected());
    if ready {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

pub(super) async fn metrics_handler() -> impl IntoResponse {
    match get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [("content-type", "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::binance::{ConnectionState, FeedState};

    fn snapshot(connected: bool) -> FeedStateSnapshot {
        let feed = FeedState::new("btcusdt");
        if connected {
            feed.set_state(ConnectionState::Connected);
        }
        feed.snapshot()
    }

    #[test]
    fn status_by_connectivity() {
        assert_eq!(determine_health_status(&[]), HealthStatus::Healthy);
        assert_eq!(
            determine_health_status(&[snapshot(true), snapshot(true)]),
            HealthStatus::Healthy
        );
        assert_eq!(
            determine_health_status(&[snapshot(true), snapshot(false)]),
            HealthStatus::Degraded
        );
        assert_eq!(
            determine_health_status(&[snapshot(false)]),
            HealthStatus::Unhealthy
        );
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&HealthStatus::Degraded).unwrap(), "\"degraded\"");
    }
}
