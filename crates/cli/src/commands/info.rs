//! `info` command implementation.

use std::collections::HashMap;

use anyhow::{Context, Result};
use router::{EnvelopeCategory, Filter};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::ensure_config_exists;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    router: RouterInfo,
    sinks: Vec<SinkInfo>,
    subscriptions: Vec<SubscriptionInfo>,
}

#[derive(Serialize)]
struct RouterInfo {
    ingress_capacity: usize,
    workers: usize,
}

#[derive(Serialize)]
struct SinkInfo {
    name: String,
    sink_type: String,
    queue_capacity: usize,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    params: HashMap<String, String>,
}

#[derive(Serialize)]
struct SubscriptionInfo {
    sink: String,
    /// "" = any application
    app_id: String,
    category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    shard_id: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    ensure_config_exists(&args.config)?;

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn category_label(category: EnvelopeCategory) -> &'static str {
    match category {
        EnvelopeCategory::Any => "any",
        EnvelopeCategory::Log => "log",
        EnvelopeCategory::Metric => "metric",
    }
}

fn build_config_info(blueprint: &contracts::RouterBlueprint, args: &InfoArgs) -> ConfigInfo {
    let sinks = blueprint
        .sinks
        .iter()
        .map(|s| SinkInfo {
            name: s.name.clone(),
            sink_type: format!("{:?}", s.sink_type),
            queue_capacity: s.queue_capacity,
            params: if args.params {
                s.params.clone()
            } else {
                HashMap::new()
            },
        })
        .collect();

    // Show the filter each subscription actually registers under
    let subscriptions = blueprint
        .subscriptions
        .iter()
        .map(|s| {
            let filter = Filter::from_request(&s.to_request());
            SubscriptionInfo {
                sink: s.sink.clone(),
                app_id: filter.app_id().to_string(),
                category: category_label(filter.category()).to_string(),
                shard_id: (!s.shard_id.is_empty()).then(|| s.shard_id.clone()),
            }
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        router: RouterInfo {
            ingress_capacity: blueprint.router.ingress_capacity,
            workers: blueprint.router.workers,
        },
        sinks,
        subscriptions,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("================================================================");
    println!("               Telemetry Router Configuration");
    println!("================================================================\n");

    println!("Router");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Ingress capacity: {}", info.router.ingress_capacity);
    println!("   └─ Workers: {}", info.router.workers);

    println!("\nSinks ({})", info.sinks.len());
    for (i, sink) in info.sinks.iter().enumerate() {
        let is_last = i == info.sinks.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({}, queue {})",
            prefix, sink.name, sink.sink_type, sink.queue_capacity
        );

        let mut params: Vec<_> = sink.params.iter().collect();
        params.sort();
        for (key, value) in params {
            println!("   {}  {} = {}", child_prefix, key, value);
        }
    }

    println!("\nSubscriptions ({})", info.subscriptions.len());
    for (i, sub) in info.subscriptions.iter().enumerate() {
        let is_last = i == info.subscriptions.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let app = if sub.app_id.is_empty() {
            "*"
        } else {
            sub.app_id.as_str()
        };
        let group = match &sub.shard_id {
            Some(id) => format!("shard '{}'", id),
            None => "broadcast".to_string(),
        };

        println!(
            "   {} {} <- app={} category={} ({})",
            prefix, sub.sink, app, sub.category, group
        );
    }

    println!();
}
