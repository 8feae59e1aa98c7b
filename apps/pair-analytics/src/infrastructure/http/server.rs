//! HTTP server lifecycle.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::ports::BarRepository;

use super::controller::{AppState, create_router};

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

/// Serves the API until cancelled.
pub struct HttpServer<R>
where
    R: BarRepository + ?Sized,
{
    port: u16,
    state: AppState<R>,
    cancel: CancellationToken,
}

impl<R> HttpServer<R>
where
    R: BarRepository + ?Sized + 'static,
{
    /// Create a server.
    #[must_use]
    pub const fn new(port: u16, state: AppState<R>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Bind and serve until the token is cancelled, then drain connections.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the server stops with an error.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError::ServerFailed` if the server stops with an error.
    pub async fn serve(self, listener: TcpListener) -> Result<(), HttpServerError> {
        let local = listener
            .local_addr()
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;
        tracing::info!(addr = %local, "HTTP server listening");

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
