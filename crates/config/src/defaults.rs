pub fn default_enabled() -> bool {
    true
}

// Service defaults
pub fn default_service_name() -> String {
    "market-data-api".to_string()
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_http_port() -> u16 {
    9999
}

// Upstream defaults
pub fn default_base_url() -> String {
    "https://vega-data.nodes.guru:3008".to_string()
}

pub fn default_request_timeout_seconds() -> u64 {
    10
}

// Refresh defaults
pub fn default_refresh_interval_seconds() -> u64 {
    300
}

pub fn default_fetch_concurrency() -> usize {
    1
}

// Observability defaults
pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_metrics_port() -> u16 {
    9090
}
