use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Root configuration document.
///
/// Every section except `service` may be omitted from the YAML file, in which
/// case the defaults from [`defaults`] apply.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MasterConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for MasterConfig {
    fn default() -> Self {
        generate_default_config()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

/// Where market records are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamKind {
    /// Live data node over its REST API
    #[default]
    DataNode,
    /// Static JSON fixture, for offline runs and demos
    Fixture,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub kind: UpstreamKind,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub fixture_path: Option<PathBuf>,
    /// Deadline applied to every single upstream call
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            kind: UpstreamKind::default(),
            base_url: default_base_url(),
            fixture_path: None,
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_interval_seconds")]
    pub interval_seconds: u64,
    /// Number of markets fetched in parallel within one cycle
    #[serde(default = "default_fetch_concurrency")]
    pub fetch_concurrency: usize,
    #[serde(default = "default_enabled")]
    pub run_on_startup: bool,
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_refresh_interval_seconds(),
            fetch_concurrency: default_fetch_concurrency(),
            run_on_startup: default_enabled(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}
