//! HTTP/REST API adapter.
//!
//! Read-only analytics queries, alert registration, bar history and CSV
//! export, plus health and Prometheus endpoints on the same port.

mod controller;
mod error;
mod health;
mod request;
mod response;
mod server;

pub use controller::{AppState, create_router};
pub use error::ApiError;
pub use health::{HealthStatus, determine_health_status};
pub use request::*;
pub use response::*;
pub use server::{HttpServer, HttpServerError};
