//! Lifecycle seam between the binary and the transport serving the API

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// A listener that serves until its token is cancelled.
///
/// [`HttpServer`](crate::http::HttpServer) is the only transport today; the
/// binary drives it through this trait and labels failures with [`name`].
///
/// [`name`]: Server::name
#[async_trait]
pub trait Server: Send + Sync + 'static {
    /// Short label used in logs and error context, e.g. `"http"`.
    fn name(&self) -> &str;

    /// Bind, serve until `shutdown` is cancelled, then drain in-flight
    /// requests before returning.
    async fn run(&self, shutdown: CancellationToken) -> Result<()>;
}
