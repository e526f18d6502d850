//! Market data error types

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by upstream sources and the refresh pipeline
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Transport-level failure reaching the data node
    #[error("Connection error: {0}")]
    Connection(String),

    /// An upstream call exceeded its deadline
    #[error("Upstream call '{call}' timed out after {after:?}")]
    Timeout { call: &'static str, after: Duration },

    /// The data node answered with a non-success status
    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    /// The response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// The requested record does not exist upstream
    #[error("Data not available: {0}")]
    DataNotAvailable(String),

    /// A fixture file could not be read or parsed
    #[error("Fixture error: {0}")]
    Fixture(String),
}

impl From<reqwest::Error> for MarketDataError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Connection(e.to_string())
        }
    }
}
