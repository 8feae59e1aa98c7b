//! API error mapping.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::ports::PersistenceError;
use crate::application::services::AnalyticsError;
use crate::domain::bars::ParseTimeframeError;

use super::response::ErrorResponse;

/// Request failures, rendered as `{ "error": "..." }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid analytics parameters.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    /// Unknown timeframe.
    #[error(transparent)]
    Timeframe(#[from] ParseTimeframeError),

    /// Malformed query string or body.
    #[error("{1}")]
    Rejected(StatusCode, String),

    /// Bar store failure.
    #[error(transparent)]
    Storage(#[from] PersistenceError),

    /// CSV serialization failure.
    #[error("export failed: {0}")]
    Export(String),
}

impl ApiError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Analytics(_) | Self::Timeframe(_) => StatusCode::BAD_REQUEST,
            Self::Rejected(status, _) => *status,
            Self::Storage(_) | Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Rejected(StatusCode::BAD_REQUEST, rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
