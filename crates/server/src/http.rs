//! HTTP server implementation using Axum
//!
//! This module provides an HTTP server built on Axum, implementing the
//! [`Server`](crate::Server) trait for consistent lifecycle management.

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use observability::ServerMetrics;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::{Result, ServerError};
use crate::traits::Server;

/// HTTP server implementation using Axum
///
/// Wraps the application router with request tracing, a per-request
/// timeout, permissive CORS (the API is public and read-only) and request
/// metrics.
///
/// # Example
///
/// ```ignore
/// use server::{HttpServer, ServerConfig, ShutdownController};
///
/// let server = HttpServer::new(ServerConfig::new("0.0.0.0", 9999), router);
/// let shutdown = ShutdownController::with_signals();
/// server.run(shutdown.token()).await?;
/// ```
pub struct HttpServer {
    config: ServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server around an application router
    pub fn new(config: ServerConfig, router: Router) -> Self {
        let metrics = ServerMetrics::new("http");
        let router = router
            .layer(middleware::from_fn_with_state(metrics, record_metrics))
            .layer(TimeoutLayer::new(config.request_timeout))
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http());

        Self { config, router }
    }
}

async fn record_metrics(
    State(metrics): State<ServerMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let response = next.run(request).await;
    metrics.record_request(start.elapsed(), response.status().as_u16());
    response
}

#[async_trait]
impl Server for HttpServer {
    fn name(&self) -> &str {
        "http"
    }

    async fn run(&self, shutdown_token: CancellationToken) -> Result<()> {
        let addr = self.config.http_addr()?;

        info!(%addr, "Starting HTTP server");

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::bind(addr, e))?;

        let local_addr = listener.local_addr().map_err(|e| ServerError::bind(addr, e))?;
        info!(%local_addr, "HTTP server listening");

        let result = axum::serve(listener, self.router.clone())
            .with_graceful_shutdown(async move {
                shutdown_token.cancelled().await;
                info!("HTTP server received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("HTTP server shutdown complete");
                Ok(())
            }
            Err(e) => {
                error!(%e, "HTTP server error");
                Err(ServerError::Serve(e))
            }
        }
    }
}
