//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::BridgeBlueprint;
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
    scenario: String,
    simulator: String,
    broker: String,
    period_ms: u64,
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

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    scenario: format!("{}/{}", blueprint.scenario.level, blueprint.scenario.name),
                    simulator: format!("{}:{}", blueprint.simulator.host, blueprint.simulator.port),
                    broker: format!("{}:{}", blueprint.broker.host, blueprint.broker.port),
                    period_ms: blueprint.publisher.period_ms,
                }),
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

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &BridgeBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.publisher.period_ms < 50 {
        warnings.push(format!(
            "publisher.period_ms = {} polls the simulator very often",
            blueprint.publisher.period_ms
        ));
    }

    let join_timeout = blueprint.publisher.join_timeout();
    if join_timeout <= blueprint.publisher.period() {
        warnings.push(format!(
            "publisher.join_timeout_ms = {} is not longer than one period, stop will usually abort the loop",
            join_timeout.as_millis()
        ));
    }

    if blueprint.broker.qos > 0 {
        warnings.push("broker.qos > 0 queues telemetry while the broker is unreachable".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Scenario: {}", summary.scenario);
            println!("  Simulator: {}", summary.simulator);
            println!("  Broker: {}", summary.broker);
            println!("  Period: {} ms", summary.period_ms);
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
