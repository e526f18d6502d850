use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mdapi")]
#[command(about = "Market summary API - normalized market and order book data from a trading network data node")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log output format, overrides `logging.format`
    #[arg(long, global = true, env = "MDAPI_LOG_FORMAT", value_parser = ["pretty", "json", "compact"])]
    pub log_format: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the API server and the background refresher
    Start {
        /// Path to the configuration file; built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override HTTP port
        #[arg(long)]
        http: Option<u16>,
    },

    /// Validate configuration without starting the server
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = "mdapi.yaml")]
        config: PathBuf,
    },

    /// Initialize a new configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = "mdapi.yaml")]
        output: PathBuf,
    },

    /// Run one refresh cycle and print the contracts JSON to stdout
    Snapshot {
        /// Path to the configuration file; built-in defaults when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
