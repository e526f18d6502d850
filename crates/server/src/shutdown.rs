//! Graceful shutdown utilities using CancellationToken
//!
//! One [`ShutdownController`] owns the root token. The HTTP server and the
//! background refresher each get a child token, so a single signal stops
//! both while either can still be cancelled on its own.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Coordinates graceful shutdown across the server and background tasks.
///
/// # Example
///
/// ```ignore
/// let shutdown = ShutdownController::with_signals();
///
/// let refresher_token = shutdown.child_token();
/// tokio::spawn(async move { refresher.run(refresher_token).await });
///
/// http_server.run(shutdown.token()).await?;
/// ```
#[derive(Clone)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Create a controller that cancels on Ctrl+C, and on SIGTERM on unix.
    pub fn with_signals() -> Self {
        let controller = Self::new();
        let token = controller.token.clone();

        tokio::spawn(async move {
            wait_for_signal().await;
            token.cancel();
        });

        controller
    }

    /// Get a child token that will be cancelled when this controller is cancelled.
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    /// Get a clone of the main token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Trigger shutdown manually
    pub fn shutdown(&self) {
        info!("Manual shutdown triggered");
        self.token.cancel();
    }
}

async fn wait_for_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown..."),
            Err(e) => {
                warn!("Failed to listen for Ctrl+C: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, initiating graceful shutdown...");
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
