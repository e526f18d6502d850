//! Server configuration

use crate::error::{Result, ServerError};
use std::net::SocketAddr;
use std::time::Duration;

/// Port the public API listens on unless configured otherwise
pub const DEFAULT_HTTP_PORT: u16 = 9999;

/// HTTP server configuration
///
/// # Example
///
/// ```
/// use server::config::ServerConfig;
///
/// let config = ServerConfig::new("127.0.0.1", 9999);
/// assert_eq!(config.http_addr().unwrap().port(), 9999);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    pub http_port: u16,
    /// Upper bound on a single request, enforced by a timeout layer
    pub request_timeout: Duration,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            http_port: port,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Get HTTP socket address
    pub fn http_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.http_port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", self.host, self.http_port)))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", DEFAULT_HTTP_PORT)
    }
}
