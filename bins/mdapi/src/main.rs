//! Market summary API binary
//!
//! Entry point for the `mdapi` command: start the server, validate or
//! initialize a configuration file, or print a one-off snapshot.

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{generate_default_config, load_config, load_or_default, save_config, validate_config, MasterConfig};
use market_data::api::{market_routes, MarketApiState};
use market_data::{create_source, RefreshSettings, Refresher, SnapshotCache};
use observability::{init_logging, init_metrics, LogFormat};
use serde_json::{json, Value};
use server::{health_routes, HealthProbe, HealthState, HttpServer, Server, ServerConfig, ShutdownController};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();
    let log_format = cli.log_format.as_deref();

    match cli.command {
        Commands::Start { config, http } => start_command(config, http, log_format).await,
        Commands::Validate { config } => {
            init_logging("mdapi", parse_format(log_format, "pretty"), "info")?;
            validate_command(config)
        }
        Commands::Init { output } => {
            init_logging("mdapi", parse_format(log_format, "pretty"), "info")?;
            init_command(output)
        }
        Commands::Snapshot { config, pretty } => snapshot_command(config, pretty, log_format).await,
    }
}

fn parse_format(cli_value: Option<&str>, config_value: &str) -> LogFormat {
    LogFormat::parse(cli_value.unwrap_or(config_value)).unwrap_or_default()
}

fn init_logging_from(config: &MasterConfig, log_format: Option<&str>) -> Result<()> {
    init_logging(
        &config.service.name,
        parse_format(log_format, &config.logging.format),
        &config.logging.level,
    )
}

/// Reports readiness from the snapshot cache.
struct CacheProbe(Arc<SnapshotCache>);

impl HealthProbe for CacheProbe {
    fn is_ready(&self) -> bool {
        self.0.is_populated()
    }

    fn details(&self) -> Value {
        let snapshot = self.0.load();
        json!({
            "markets": snapshot.markets.len(),
            "order_books": snapshot.order_books.len(),
            "last_refresh": snapshot.published_at.map(|t| t.to_rfc3339()),
        })
    }
}

async fn start_command(config_path: Option<PathBuf>, http_override: Option<u16>, log_format: Option<&str>) -> Result<()> {
    let config = load_or_default(config_path.as_ref())?;
    init_logging_from(&config, log_format)?;

    let report = validate_config(&config);
    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }
    if !report.is_valid() {
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start due to {} configuration error(s)", report.errors.len());
    }

    if config.metrics.enabled {
        init_metrics(config.metrics.port).context("Failed to start metrics exporter")?;
    }

    let source = create_source(&config.upstream).context("Failed to create upstream source")?;
    let cache = Arc::new(SnapshotCache::new());
    let refresher = Arc::new(Refresher::new(
        source,
        cache.clone(),
        RefreshSettings::from_config(&config),
    ));

    let shutdown = ShutdownController::with_signals();
    let refresher_task = {
        let refresher = refresher.clone();
        let token = shutdown.child_token();
        tokio::spawn(async move { refresher.run(token).await })
    };

    let health = HealthState::new(config.service.name.clone()).with_probe(Arc::new(CacheProbe(cache.clone())));
    let router = market_routes(MarketApiState::new(cache)).merge(health_routes(Arc::new(health)));

    let http_port = http_override.unwrap_or(config.service.http_port);
    if http_override.is_some() {
        debug!(port = http_port, "HTTP port overridden from the command line");
    }
    let server = HttpServer::new(ServerConfig::new(config.service.host.clone(), http_port), router);

    info!(
        service = %config.service.name,
        host = %config.service.host,
        http_port,
        interval_secs = config.refresh.interval_seconds,
        "Starting market summary API"
    );

    let result = server.run(shutdown.token()).await;

    // Stop the refresher whether the server exited cleanly or not.
    shutdown.shutdown();
    if let Err(e) = refresher_task.await {
        warn!(error = %e, "Refresher task ended abnormally");
    }

    result.with_context(|| format!("{} server failed", server.name()))?;
    info!("Shutdown complete");
    Ok(())
}

async fn snapshot_command(config_path: Option<PathBuf>, pretty: bool, log_format: Option<&str>) -> Result<()> {
    let config = load_or_default(config_path.as_ref())?;
    init_logging_from(&config, log_format)?;

    let source = create_source(&config.upstream).context("Failed to create upstream source")?;
    let cache = Arc::new(SnapshotCache::new());
    let refresher = Refresher::new(source, cache.clone(), RefreshSettings::from_config(&config));

    let outcome = refresher.refresh_cycle().await.context("Refresh cycle failed")?;
    debug!(?outcome, "Snapshot refreshed");

    let markets = cache.markets();
    let output = if pretty {
        serde_json::to_string_pretty(&markets)?
    } else {
        serde_json::to_string(&markets)?
    };
    println!("{}", output);
    Ok(())
}

fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.defaults_applied.is_empty() {
        println!("Defaults Applied ({}):", report.defaults_applied.len());
        for default in &report.defaults_applied {
            println!("  [info] {} = {}", default.field, default.value);
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Service: {}", config.service.name);
    println!("Listen: {}:{}", config.service.host, config.service.http_port);
    println!("Upstream: {:?} {}", config.upstream.kind, config.upstream.base_url);
    println!("Refresh interval: {}s", config.refresh.interval_seconds);

    Ok(())
}

fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Point upstream.base_url at a data node (or use upstream.kind: fixture)");
    println!("  2. Run 'mdapi validate --config {:?}' to check configuration", output_path);
    println!("  3. Run 'mdapi start --config {:?}' to start the server", output_path);

    Ok(())
}
