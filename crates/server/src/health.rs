//! Health check endpoint

use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

/// Service-specific readiness information merged into the health response.
pub trait HealthProbe: Send + Sync {
    /// False while the service has nothing useful to serve yet.
    fn is_ready(&self) -> bool;

    /// Extra fields reported under `details`.
    fn details(&self) -> Value;
}

/// Shared state for health checks
#[derive(Clone)]
pub struct HealthState {
    pub service_name: String,
    pub start_time: Instant,
    probe: Option<Arc<dyn HealthProbe>>,
}

impl HealthState {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            start_time: Instant::now(),
            probe: None,
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn HealthProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn is_ready(&self) -> bool {
        self.probe.as_ref().map(|p| p.is_ready()).unwrap_or(true)
    }
}

/// `GET /health`: always 200 so load balancers keep routing to a warming
/// instance; `status` says whether data has been published yet.
pub async fn health_handler(State(state): State<Arc<HealthState>>) -> Json<Value> {
    let details = state
        .probe
        .as_ref()
        .map(|p| p.details())
        .unwrap_or(Value::Null);

    Json(json!({
        "status": if state.is_ready() { "ok" } else { "warming_up" },
        "service": state.service_name,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
        "uptime_seconds": state.uptime_seconds(),
        "details": details,
    }))
}

/// `GET /health/ready`: 503 until the probe reports ready.
pub async fn readiness_handler(State(state): State<Arc<HealthState>>) -> (StatusCode, Json<Value>) {
    if state.is_ready() {
        (StatusCode::OK, Json(json!({ "ready": true })))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "ready": false })))
    }
}

/// Create health check router
pub fn health_routes(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state)
}
