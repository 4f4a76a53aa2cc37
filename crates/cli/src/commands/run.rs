//! `run` command implementation.

use anyhow::{Context, Result};
use publisher::BrokerClient;
use simulator::SimulatorClient;
use tracing::{info, warn};

use crate::bridge::{self, Controller, Driver};
use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_bridge(args: &RunArgs) -> Result<()> {
    let blueprint = bridge::load_blueprint(args)?;

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    bridge::init_metrics(args.metrics_port)?;
    bridge::with_controller(args, &blueprint, bridge::print_status(), Headless).await?;

    info!("Telemetry bridge finished");
    Ok(())
}

/// Start, publish until a shutdown signal, shut down
struct Headless;

impl Driver for Headless {
    async fn drive<S, B>(self, controller: Controller<S, B>) -> Result<()>
    where
        S: SimulatorClient + 'static,
        B: BrokerClient + Send + Sync + 'static,
    {
        info!("Starting simulation...");
        if let Err(e) = controller.start().await {
            controller.shutdown().await;
            return Err(e).context("Failed to start simulation");
        }

        bridge::shutdown_signal().await;
        warn!("Received shutdown signal, stopping bridge...");

        controller.shutdown().await;
        let metrics = controller.metrics().snapshot();
        info!(
            cycles = metrics.cycles,
            published = metrics.published,
            poll_failures = metrics.poll_failures,
            publish_failures = metrics.publish_failures,
            "Bridge stopped"
        );
        println!("\n=== Run Summary ===\n{metrics}\n");
        Ok(())
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::BridgeBlueprint) {
    println!("\n=== Configuration Summary ===\n");
    println!(
        "Simulator: {}:{}",
        blueprint.simulator.host, blueprint.simulator.port
    );
    println!(
        "Scenario:  {}/{} (vehicle '{}', {})",
        blueprint.scenario.level,
        blueprint.scenario.name,
        blueprint.scenario.vehicle.id,
        blueprint.scenario.vehicle.model
    );
    println!(
        "Broker:    {}:{} (qos {})",
        blueprint.broker.host, blueprint.broker.port, blueprint.broker.qos
    );
    println!("Period:    {} ms", blueprint.publisher.period_ms);
    println!();
}
