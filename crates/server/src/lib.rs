//! Server infrastructure for the market summary API
//!
//! This crate provides the HTTP server, health endpoints and graceful
//! shutdown handling. Application routes are built elsewhere and handed to
//! [`HttpServer::new`].
//!
//! # Architecture
//!
//! The binary drives [`HttpServer`] through the [`Server`] trait.
//! Shutdown coordination uses `CancellationToken` from `tokio_util`, so
//! cancelling the root token of a [`ShutdownController`] also stops every
//! task holding a child token.
//!
//! # Modules
//!
//! - [`config`] - Server configuration and the default port
//! - [`traits`] - `Server` trait
//! - [`http`] - HTTP server using Axum
//! - [`health`] - Health check endpoints
//! - [`shutdown`] - Graceful shutdown utilities

pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod shutdown;
pub mod traits;

pub use config::{ServerConfig, DEFAULT_HTTP_PORT};
pub use error::{Result, ServerError};
pub use health::{health_routes, HealthProbe, HealthState};
pub use http::HttpServer;
pub use shutdown::ShutdownController;
pub use traits::Server;
