use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<MasterConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    parse_config(&content)
}

/// Parse a YAML document after environment substitution.
pub fn parse_config(content: &str) -> Result<MasterConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    let config: MasterConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!("Configuration loaded successfully");
    Ok(config)
}

/// Load `path` when given, otherwise fall back to the built-in defaults.
pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Result<MasterConfig> {
    match path {
        Some(path) => load_config(path),
        None => {
            info!("No configuration file given, using defaults");
            Ok(generate_default_config())
        }
    }
}

pub fn generate_default_config() -> MasterConfig {
    MasterConfig {
        service: ServiceConfig::default(),
        upstream: UpstreamConfig::default(),
        refresh: RefreshConfig::default(),
        logging: LoggingConfig::default(),
        metrics: MetricsConfig::default(),
    }
}

#[instrument(skip(config))]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &MasterConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_then_load_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdapi.yaml");

        save_config(&generate_default_config(), &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded.service.http_port, 9999);
        assert_eq!(loaded.refresh.interval_seconds, 300);
        assert_eq!(loaded.upstream.base_url, default_base_url());
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(dir.path().join("absent.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_uses_fallback_placeholder() {
        let yaml = "service:\n  http_port: ${MDAPI_TEST_UNSET_PORT:-8123}\n";
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.service.http_port, 8123);
    }

    #[test]
    fn test_load_or_default_without_path() {
        let config = load_or_default(None::<&Path>).unwrap();
        assert_eq!(config.service.name, "market-data-api");
    }
}
