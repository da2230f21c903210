//! # Telemetry Router CLI
//!
//! 命令行接口入口点。
//!
//! 提供：
//! - 配置加载与验证
//! - 入口、路由 worker 与订阅者的编排
//! - 优雅关闭处理

mod cli;
mod commands;
mod error;
mod pipeline;

use anyhow::Result;
use clap::Parser;
use observability::ObservabilityConfig;
use tracing::info;

use cli::{Cli, Commands};
use commands::{run_info, run_pipeline, run_validate};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    init_logging(&cli)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Telemetry router CLI starting"
    );

    let result = match &cli.command {
        Commands::Run(args) => run_pipeline(args).await,
        Commands::Validate(args) => run_validate(args),
        Commands::Info(args) => run_info(args),
    };

    if let Err(ref e) = result {
        tracing::error!(error = %e, "Command failed");
    }

    result
}

/// Initialize logging based on CLI options
///
/// Metrics are started later by the `run` pipeline, so no port is set here.
fn init_logging(cli: &Cli) -> Result<()> {
    let config = ObservabilityConfig {
        log_format: cli.log_format,
        metrics_port: None,
        ..Default::default()
    }
    .with_verbosity(cli.verbose, cli.quiet);

    observability::init_with_config(config)
}
