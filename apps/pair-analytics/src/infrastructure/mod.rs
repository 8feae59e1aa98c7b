//! Infrastructure Layer
//!
//! Adapters for external systems.
//!
//! - `binance`: Trade stream WebSocket client
//! - `persistence`: SQLite bar repository
//! - `http`: REST API with health and metrics endpoints
//! - `config`: Environment-based configuration
//! - `metrics`: Prometheus metrics
//! - `telemetry`: Tracing and OpenTelemetry setup

pub mod binance;
pub mod config;
pub mod http;
pub mod metrics;
pub mod persistence;
pub mod telemetry;
