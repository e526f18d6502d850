//! Prometheus metrics infrastructure
//!
//! This module installs the Prometheus exporter and provides the metric
//! handle sets used by the HTTP server and the refresh pipeline. Without an
//! installed exporter every handle is a no-op, so tests never need one.

use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the Prometheus metrics exporter
///
/// This starts an HTTP listener on the specified port that exposes metrics
/// at the `/metrics` endpoint.
///
/// # Example
///
/// ```ignore
/// observability::metrics::init_metrics(9090)?;
/// // Metrics available at http://localhost:9090/metrics
/// ```
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Count a field that could not be parsed and was replaced by zero.
pub fn record_parse_failure(field: &'static str) {
    counter!("market_data_parse_failures_total", "field" => field).increment(1);
}

/// HTTP server metrics
///
/// * `server_requests_total` - Total number of requests processed
/// * `server_requests_by_status` - Requests by response status
/// * `server_request_duration_seconds` - Request duration histogram
#[derive(Clone)]
pub struct ServerMetrics {
    requests_total: Counter,
    request_duration: Histogram,
    server_name: String,
}

impl ServerMetrics {
    /// Create metrics for a specific server (e.g. "http")
    pub fn new(server_name: &str) -> Self {
        let name = server_name.to_string();

        Self {
            requests_total: counter!("server_requests_total", "server" => name.clone()),
            request_duration: histogram!("server_request_duration_seconds", "server" => name.clone()),
            server_name: name,
        }
    }

    /// Record a completed request
    pub fn record_request(&self, duration: Duration, status_code: u16) {
        self.requests_total.increment(1);
        counter!(
            "server_requests_by_status",
            "server" => self.server_name.clone(),
            "status" => status_code.to_string()
        )
        .increment(1);
        self.request_duration.record(duration.as_secs_f64());
    }
}

/// Refresh pipeline metrics
///
/// * `refresh_cycles_total{outcome}` - Cycles by outcome (published, skipped, failed)
/// * `refresh_cycle_duration_seconds` - Wall time of published cycles
/// * `refresh_markets_published` - Markets in the latest published snapshot
/// * `refresh_markets_excluded_total` - Markets dropped for lack of an asset
/// * `upstream_errors_total{call}` - Failed or timed out upstream calls
#[derive(Clone)]
pub struct RefreshMetrics {
    cycle_duration: Histogram,
    markets_published: Gauge,
    markets_excluded: Counter,
}

impl Default for RefreshMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl RefreshMetrics {
    pub fn new() -> Self {
        Self {
            cycle_duration: histogram!("refresh_cycle_duration_seconds"),
            markets_published: gauge!("refresh_markets_published"),
            markets_excluded: counter!("refresh_markets_excluded_total"),
        }
    }

    /// Record a cycle that produced and published a snapshot.
    pub fn cycle_published(&self, duration: Duration, published: usize, excluded: usize) {
        counter!("refresh_cycles_total", "outcome" => "published").increment(1);
        self.cycle_duration.record(duration.as_secs_f64());
        self.markets_published.set(published as f64);
        self.markets_excluded.increment(excluded as u64);
    }

    pub fn cycle_skipped(&self) {
        counter!("refresh_cycles_total", "outcome" => "skipped").increment(1);
    }

    pub fn cycle_failed(&self) {
        counter!("refresh_cycles_total", "outcome" => "failed").increment(1);
    }

    pub fn upstream_error(&self, call: &'static str) {
        counter!("upstream_errors_total", "call" => call).increment(1);
    }
}
