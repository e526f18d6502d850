//! Errors surfaced while bringing up or running the HTTP listener

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    /// The listen address could not be bound or inspected.
    #[error("cannot listen on {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),

    /// The accept loop stopped with an I/O error after startup.
    #[error("HTTP listener stopped: {0}")]
    Serve(#[source] io::Error),
}

impl ServerError {
    pub fn bind(address: impl ToString, source: io::Error) -> Self {
        Self::Bind {
            address: address.to_string(),
            source,
        }
    }
}
