use crate::*;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("Service name is required")]
    MissingServiceName,

    #[error("Invalid upstream base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error("upstream.fixture_path is required when upstream.kind is 'fixture'")]
    MissingFixturePath,

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("HTTP port and metrics port are both {port}")]
    PortConflict { port: u16 },

    #[error("Invalid log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("Environment variable '{var}' is missing or invalid: {message}")]
    InvalidEnvVar { var: String, message: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct DefaultApplied {
    pub field: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
    pub defaults_applied: Vec<DefaultApplied>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
            defaults_applied: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn add_default(&mut self, field: &str, value: &str) {
        self.defaults_applied.push(DefaultApplied {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &MasterConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_service(&config.service, &mut report);
    validate_upstream(&config.upstream, &mut report);
    validate_refresh(&config.refresh, &config.upstream, &mut report);
    validate_observability(config, &mut report);

    report
}

fn validate_service(service: &ServiceConfig, report: &mut ValidationReport) {
    if service.name.trim().is_empty() {
        report.add_error(ValidationError::MissingServiceName);
    }

    if service.http_port == 0 {
        report.add_warning(
            "service.http_port",
            "Port 0 binds an ephemeral port; clients will not find the API at a fixed address",
        );
    }
}

fn validate_upstream(upstream: &UpstreamConfig, report: &mut ValidationReport) {
    for var in unresolved_env_vars(&upstream.base_url) {
        report.add_error(ValidationError::InvalidEnvVar {
            var,
            message: "referenced by upstream.base_url but not set".to_string(),
        });
    }

    match upstream.kind {
        UpstreamKind::DataNode => match Url::parse(&upstream.base_url) {
            Ok(url) if url.scheme() == "https" => {}
            Ok(url) if url.scheme() == "http" => {
                report.add_warning(
                    "upstream.base_url",
                    "Data node is reached over plain http",
                );
            }
            Ok(url) => report.add_error(ValidationError::InvalidBaseUrl {
                url: upstream.base_url.clone(),
                message: format!("unsupported scheme '{}'", url.scheme()),
            }),
            Err(e) => report.add_error(ValidationError::InvalidBaseUrl {
                url: upstream.base_url.clone(),
                message: e.to_string(),
            }),
        },
        UpstreamKind::Fixture => {
            if upstream.fixture_path.is_none() {
                report.add_error(ValidationError::MissingFixturePath);
            }
        }
    }

    if upstream.request_timeout_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "upstream.request_timeout_seconds".to_string(),
        });
    }
}

fn validate_refresh(refresh: &RefreshConfig, upstream: &UpstreamConfig, report: &mut ValidationReport) {
    if refresh.interval_seconds == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "refresh.interval_seconds".to_string(),
        });
    }

    if refresh.fetch_concurrency == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "refresh.fetch_concurrency".to_string(),
        });
    }

    if refresh.interval_seconds > 0 && refresh.interval_seconds < upstream.request_timeout_seconds {
        report.add_warning(
            "refresh.interval_seconds",
            "Refresh interval is shorter than a single upstream request timeout; cycles may be skipped",
        );
    }

    if !refresh.run_on_startup {
        report.add_warning(
            "refresh.run_on_startup",
            "The API serves an empty market list until the first scheduled refresh",
        );
    }
}

fn validate_observability(config: &MasterConfig, report: &mut ValidationReport) {
    let valid_formats = ["pretty", "json", "compact"];
    if !valid_formats.contains(&config.logging.format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(
            config.logging.format.clone(),
        ));
    }

    if config.logging.level.trim().is_empty() {
        report.add_default("logging.level", &default_log_level());
    }

    if config.metrics.enabled && config.metrics.port == config.service.http_port {
        report.add_error(ValidationError::PortConflict {
            port: config.metrics.port,
        });
    }
}
