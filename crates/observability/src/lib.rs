//! Observability infrastructure for the market summary API
//!
//! This crate provides:
//! - Structured logging via tracing
//! - Prometheus metrics
//! - Metric handle sets for the HTTP server and the refresh pipeline
//!
//! # Quick Start
//!
//! ```ignore
//! use observability::{init_logging, LogFormat};
//!
//! // Initialize logging
//! init_logging("mdapi", LogFormat::Pretty, "info")?;
//!
//! // Initialize metrics (optional)
//! observability::metrics::init_metrics(9090)?;
//! ```

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogFormat};
pub use metrics::{init_metrics, record_parse_failure, RefreshMetrics, ServerMetrics};
