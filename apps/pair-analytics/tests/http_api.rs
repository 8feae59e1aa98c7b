//! HTTP API Integration Tests
//!
//! Exercises the router end to end with an in-memory bar store and a tick
//! store preloaded with a correlated pair.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::cast_precision_loss)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use chrono::{TimeZone, Utc};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use pair_analytics::application::ports::InMemoryBarRepository;
use pair_analytics::infrastructure::http::{AppState, HttpServer, create_router};
use pair_analytics::{
    AlertRegistry, AnalyticsService, AnalyticsSettings, Bar, BarRepository, TickStore, Timeframe,
};

const START: i64 = 1_700_000_000;

// =============================================================================
// Fixtures
// =============================================================================

fn loaded_store() -> Arc<TickStore> {
    let store = Arc::new(TickStore::new(10_000));
    for i in 0..400_i64 {
        let t = i as f64;
        let x = 100.0 + 5.0 * (t / 15.0).sin() + 0.02 * t;
        let mut y = 2.0 * x + 0.5 * (1.7 * t).sin();
        if i == 399 {
            y += 6.0;
        }
        let ts = Utc.timestamp_opt(START + i, 0).unwrap();
        store.on_tick("ethusdt", ts, x, 1.0);
        store.on_tick("btcusdt", ts, y, 0.5);
    }
    store
}

fn state_with(store: Arc<TickStore>) -> AppState<InMemoryBarRepository> {
    let analytics = AnalyticsService::new(
        store,
        Arc::new(AlertRegistry::new()),
        AnalyticsSettings::default(),
    );
    AppState::new(
        Arc::new(analytics),
        Arc::new(InMemoryBarRepository::new()),
        Vec::new(),
    )
}

fn bar(symbol: &str, secs: i64, price: f64, volume: f64) -> Bar {
    Bar {
        bucket_start: Utc.timestamp_opt(START + secs, 0).unwrap(),
        symbol: symbol.to_string(),
        timeframe: Timeframe::OneSecond,
        price,
        volume,
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_json(app: &Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, body) = send(app, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

// =============================================================================
// Pair endpoints
// =============================================================================

#[tokio::test]
async fn pair_reports_statistics_and_decision() {
    let app = create_router(state_with(loaded_store()));
    let (status, body) = get_json(&app, "/pair?y=BTCUSDT&x=ethusdt&window=300").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["y"], "btcusdt");
    assert_eq!(body["window"], 300);
    assert!((body["hedge_ratio"].as_f64().unwrap() - 2.0).abs() < 0.05);
    assert!(body["spread_zscore"].as_f64().unwrap() > 2.0);
    assert!(body["adf_test"]["p_value"].is_number());
    assert!(body["adf_test"]["stationary"].is_boolean());
    assert_eq!(body["decision"]["trade_signal"], "SELL");
    assert_eq!(body["decision"]["market_bias"], "Bearish");
    assert_eq!(body["decision"]["confidence"], 100);
    assert_eq!(body["triggered_alerts"], json!([]));
}

#[tokio::test]
async fn pair_waits_for_enough_aligned_points() {
    let app = create_router(state_with(loaded_store()));
    let (status, body) = get_json(&app, "/pair?y=btcusdt&x=ethusdt&window=500").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "status": "waiting_for_data", "aligned_points": 400, "required": 500 })
    );
}

#[tokio::test]
async fn pair_requires_both_symbols() {
    let app = create_router(state_with(loaded_store()));
    let (status, body) = get_json(&app, "/pair?y=btcusdt").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn pair_series_covers_the_window() {
    let app = create_router(state_with(loaded_store()));
    let (status, body) = get_json(&app, "/pair_series?y=btcusdt&x=ethusdt&window=300").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ts"].as_array().unwrap().len(), 300);
    assert_eq!(body["spread"].as_array().unwrap().len(), 300);
    assert_eq!(body["zscore"].as_array().unwrap().len(), 300);
    assert_eq!(body["ts"][299], "2023-11-14T22:19:59Z");
    assert!(body["zscore"][0].is_null());
    assert!(body["zscore"][299].as_f64().unwrap() > 2.0);
}

// =============================================================================
// Alerts
// =============================================================================

#[tokio::test]
async fn registered_alert_fires_on_pair_query() {
    let app = create_router(state_with(loaded_store()));
    let (status, created) = post_json(
        &app,
        "/alerts",
        &json!({
            "y": "BTCUSDT",
            "x": "ETHUSDT",
            "window": 300,
            "threshold": 2.0,
            "direction": "above"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["status"], "created");
    assert_eq!(created["alert"]["y"], "btcusdt");
    assert_eq!(created["alert"]["cooldown_seconds"], 60);
    assert!(created["alert"]["last_triggered"].is_null());
    let id = created["alert"]["id"].clone();

    let (_, pair) = get_json(&app, "/pair?y=btcusdt&x=ethusdt&window=300").await;
    let fired = pair["triggered_alerts"].as_array().unwrap();
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0]["alert_id"], id);

    // Cooling down.
    let (_, again) = get_json(&app, "/pair?y=btcusdt&x=ethusdt&window=300").await;
    assert_eq!(again["triggered_alerts"], json!([]));

    let (_, listed) = get_json(&app, "/alerts").await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert!(listed[0]["last_triggered"].is_string());
}

#[tokio::test]
async fn pair_series_never_fires_alerts() {
    let app = create_router(state_with(loaded_store()));
    post_json(
        &app,
        "/alerts",
        &json!({ "y": "btcusdt", "x": "ethusdt", "window": 300, "threshold": 1.0, "direction": "abs" }),
    )
    .await;

    get_json(&app, "/pair_series?y=btcusdt&x=ethusdt&window=300").await;
    let (_, listed) = get_json(&app, "/alerts").await;
    assert!(listed[0]["last_triggered"].is_null());
}

#[tokio::test]
async fn alert_with_tiny_window_is_rejected() {
    let app = create_router(state_with(loaded_store()));
    let (status, body) = post_json(
        &app,
        "/alerts",
        &json!({ "y": "btcusdt", "x": "ethusdt", "window": 1, "threshold": 2.0, "direction": "below" }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("window"));
}

// =============================================================================
// Single-symbol endpoints
// =============================================================================

#[tokio::test]
async fn ticks_return_full_history() {
    let app = create_router(state_with(loaded_store()));
    let (status, body) = get_json(&app, "/ticks/ETHUSDT").await;

    assert_eq!(status, StatusCode::OK);
    let ticks = body.as_array().unwrap();
    assert_eq!(ticks.len(), 400);
    assert_eq!(ticks[0]["symbol"], "ethusdt");
    assert!((ticks[0]["price"].as_f64().unwrap() - 100.0).abs() < 1e-9);

    let (_, unknown) = get_json(&app, "/ticks/dogeusdt").await;
    assert_eq!(unknown, json!([]));
}

#[tokio::test]
async fn zscore_ready_and_waiting() {
    let app = create_router(state_with(loaded_store()));
    let (_, ready) = get_json(&app, "/zscore/btcusdt?window=100").await;
    assert_eq!(ready["symbol"], "btcusdt");
    assert_eq!(ready["window"], 100);
    assert!(ready["zscore"].as_f64().unwrap().is_finite());

    let (_, waiting) = get_json(&app, "/zscore/solusdt").await;
    assert_eq!(
        waiting,
        json!({ "status": "waiting_for_data", "ticks": 0, "required": 100 })
    );
}

#[tokio::test]
async fn stats_summarize_trailing_window() {
    let app = create_router(state_with(loaded_store()));
    let (status, body) = get_json(&app, "/stats/ethusdt?window=50").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], "ethusdt");
    assert_eq!(body["window"], 50);
    let min = body["min_price"].as_f64().unwrap();
    let max = body["max_price"].as_f64().unwrap();
    let last = body["last_price"].as_f64().unwrap();
    assert!(min <= last && last <= max);
    assert!(body["volatility"].as_f64().unwrap() > 0.0);
}

// =============================================================================
// Bars and export
// =============================================================================

#[tokio::test]
async fn bars_and_export_read_the_bar_store() {
    let state = state_with(loaded_store());
    for (secs, price) in [(0, 100.0), (1, 101.0), (2, 102.5)] {
        state.bars.put(&bar("btcusdt", secs, price, 2.0)).await.unwrap();
    }
    let app = create_router(state);

    let (status, bars) = get_json(&app, "/bars?symbol=btcusdt&timeframe=1s&limit=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        bars,
        json!([
            { "ts": "2023-11-14T22:13:21Z", "price": 101.0, "volume": 2.0 },
            { "ts": "2023-11-14T22:13:22Z", "price": 102.5, "volume": 2.0 }
        ])
    );

    let response = app
        .clone()
        .oneshot(
            Request::get("/export?symbol=BTCUSDT&timeframe=1s")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"btcusdt_1s.csv\""
    );
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(
        String::from_utf8(body.to_vec()).unwrap(),
        "ts,price,volume\n\
         2023-11-14T22:13:20Z,100.0,2.0\n\
         2023-11-14T22:13:21Z,101.0,2.0\n\
         2023-11-14T22:13:22Z,102.5,2.0\n"
    );
}

#[tokio::test]
async fn export_of_unknown_symbol_is_header_only() {
    let app = create_router(state_with(loaded_store()));
    let (status, body) = send(
        &app,
        Request::get("/export?symbol=xrpusdt&timeframe=5m")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(String::from_utf8(body).unwrap(), "ts,price,volume\n");
}

// =============================================================================
// Health and server lifecycle
// =============================================================================

#[tokio::test]
async fn health_without_feeds_is_healthy() {
    let app = create_router(state_with(loaded_store()));
    let (status, body) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    let mut tracked: Vec<String> = body["tracked_symbols"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s.as_str().unwrap().to_string())
        .collect();
    tracked.sort();
    assert_eq!(tracked, ["btcusdt", "ethusdt"]);

    let (ready, _) = send(&app, Request::get("/readyz").body(Body::empty()).unwrap()).await;
    assert_eq!(ready, StatusCode::OK);
}

#[tokio::test]
async fn server_answers_over_tcp_and_stops_on_cancel() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let server = HttpServer::new(addr.port(), state_with(loaded_store()), cancel.clone());
    let handle = tokio::spawn(server.serve(listener));

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /healthz HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    assert!(response.starts_with("HTTP/1.1 200 OK"));
    assert!(response.ends_with("OK"));

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
}
