//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::ensure_config_exists;
use crate::pipeline::{InputSource, Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    ensure_config_exists(&args.config)?;

    // Load and parse configuration
    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(workers) = args.workers {
        info!(workers, "Overriding routing workers from CLI");
        blueprint.router.workers = workers.max(1);
    }
    if let Some(capacity) = args.buffer_size {
        info!(capacity, "Overriding ingress capacity from CLI");
        blueprint.router.ingress_capacity = capacity.max(1);
    }

    info!(
        ingress_capacity = blueprint.router.ingress_capacity,
        workers = blueprint.router.workers,
        sinks = blueprint.sinks.len(),
        subscriptions = blueprint.subscriptions.len(),
        "Configuration loaded"
    );

    for warning in config_loader::warnings(&blueprint) {
        warn!("{}", warning);
    }

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    // Build pipeline configuration
    let pipeline_config = PipelineConfig {
        blueprint,
        input: InputSource::from_arg(args.input.as_ref(), args.mock_rate),
        max_envelopes: (args.max_envelopes > 0).then_some(args.max_envelopes),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    };

    info!("Starting pipeline...");

    let stats = Pipeline::new(pipeline_config)
        .run(shutdown_signal())
        .await
        .context("Pipeline execution failed")?;

    info!(
        outcome = %stats.outcome,
        dispatched = stats.routing.dispatched,
        unmatched = stats.routing.unmatched,
        deliveries = stats.routing.deliveries,
        duration_secs = stats.duration.as_secs_f64(),
        rate = format!("{:.2}", stats.rate()),
        "Pipeline finished"
    );

    stats.print_summary();

    info!("Telemetry router finished");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::RouterBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!("Router:");
    println!("  Ingress capacity: {}", blueprint.router.ingress_capacity);
    println!("  Workers: {}", blueprint.router.workers);

    println!("\nSinks ({}):", blueprint.sinks.len());
    for sink in &blueprint.sinks {
        println!(
            "  - {} ({:?}, queue {})",
            sink.name, sink.sink_type, sink.queue_capacity
        );
    }

    if !blueprint.subscriptions.is_empty() {
        println!("\nSubscriptions ({}):", blueprint.subscriptions.len());
        for sub in &blueprint.subscriptions {
            let group = if sub.shard_id.is_empty() {
                "broadcast".to_string()
            } else {
                format!("shard '{}'", sub.shard_id)
            };
            println!("  - {} <- {}", sub.sink, group);
        }
    }

    println!();
}
