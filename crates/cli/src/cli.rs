//! CLI argument definitions using clap.

use clap::{Parser, Subcommand};
use observability::LogFormat;
use std::path::PathBuf;

/// Telemetry Router - in-memory pub/sub dispatch for telemetry envelopes
#[derive(Parser, Debug)]
#[command(
    name = "telemetry-router",
    author,
    version,
    about = "In-memory telemetry envelope router",
    long_about = "Routes telemetry envelopes to subscribed sinks.\n\n\
                  Reads envelopes from a JSON lines file, stdin or a synthetic \n\
                  generator, matches them against configured subscriptions and \n\
                  delivers them to log, file and UDP sinks."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "TELEMETRY_ROUTER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format (json, pretty, compact)
    #[arg(
        long,
        default_value = "pretty",
        global = true,
        env = "TELEMETRY_ROUTER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the router
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "router.toml",
        env = "TELEMETRY_ROUTER_CONFIG"
    )]
    pub config: PathBuf,

    /// JSON lines input file ("-" for stdin); omit to use the mock generator
    #[arg(short, long, env = "TELEMETRY_ROUTER_INPUT")]
    pub input: Option<PathBuf>,

    /// Mock generator rate in envelopes per second (0 = as fast as possible)
    #[arg(long, default_value = "100", env = "TELEMETRY_ROUTER_MOCK_RATE")]
    pub mock_rate: f64,

    /// Maximum number of envelopes to ingest (0 = unlimited)
    #[arg(long, default_value = "0", env = "TELEMETRY_ROUTER_MAX_ENVELOPES")]
    pub max_envelopes: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "TELEMETRY_ROUTER_TIMEOUT")]
    pub timeout: u64,

    /// Override the number of routing workers
    #[arg(long, env = "TELEMETRY_ROUTER_WORKERS")]
    pub workers: Option<usize>,

    /// Override the ingress buffer capacity
    #[arg(long, env = "TELEMETRY_ROUTER_BUFFER_SIZE")]
    pub buffer_size: Option<usize>,

    /// Validate configuration and exit without routing
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "TELEMETRY_ROUTER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "router.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "router.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show sink parameters
    #[arg(long)]
    pub params: bool,
}
