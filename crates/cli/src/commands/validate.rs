//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    ingress_capacity: usize,
    workers: usize,
    sink_count: usize,
    subscription_count: usize,
    shard_groups: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = config_loader::warnings(&blueprint);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(summarize(&blueprint)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(blueprint: &contracts::RouterBlueprint) -> ConfigSummary {
    let mut groups: Vec<&str> = blueprint
        .subscriptions
        .iter()
        .filter(|s| !s.shard_id.is_empty())
        .map(|s| s.shard_id.as_str())
        .collect();
    groups.sort_unstable();
    groups.dedup();

    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        ingress_capacity: blueprint.router.ingress_capacity,
        workers: blueprint.router.workers,
        sink_count: blueprint.sinks.len(),
        subscription_count: blueprint.subscriptions.len(),
        shard_groups: groups.len(),
    }
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Ingress capacity: {}", summary.ingress_capacity);
            println!("  Workers: {}", summary.workers);
            println!("  Sinks: {}", summary.sink_count);
            println!("  Subscriptions: {}", summary.subscription_count);
            println!("  Shard groups: {}", summary.shard_groups);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
