//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{topics, BridgeBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    simulator: EndpointInfo,
    scenario: ScenarioInfo,
    broker: BrokerInfo,
    period_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    topics: Vec<&'static str>,
}

#[derive(Serialize)]
struct EndpointInfo {
    host: String,
    port: u16,
}

#[derive(Serialize)]
struct ScenarioInfo {
    level: String,
    name: String,
    vehicle_id: String,
    model: String,
    spawn: [f64; 3],
}

#[derive(Serialize)]
struct BrokerInfo {
    host: String,
    port: u16,
    qos: u8,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = config_loader::ConfigLoader::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

/// Topics a run with this configuration publishes to
fn published_topics(blueprint: &BridgeBlueprint) -> Vec<&'static str> {
    let mut list = vec![
        topics::FUEL,
        topics::RPM,
        topics::GEAR,
        topics::GEAR_A,
        topics::RUNNING,
        topics::TURN_SIGNAL,
        topics::SPEED_KMPH,
        topics::SPEED_MPH,
    ];
    if blueprint.publisher.publish_distance {
        list.push(topics::DISTANCE_KM);
    }
    if blueprint.publisher.extended_topics {
        list.extend([topics::RPM_TACHO, topics::STEERING]);
    }
    list
}

fn build_config_info(blueprint: &BridgeBlueprint, args: &InfoArgs) -> ConfigInfo {
    let spawn = blueprint.scenario.vehicle.spawn.position;
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        simulator: EndpointInfo {
            host: blueprint.simulator.host.clone(),
            port: blueprint.simulator.port,
        },
        scenario: ScenarioInfo {
            level: blueprint.scenario.level.clone(),
            name: blueprint.scenario.name.clone(),
            vehicle_id: blueprint.scenario.vehicle.id.clone(),
            model: blueprint.scenario.vehicle.model.clone(),
            spawn: [spawn.x, spawn.y, spawn.z],
        },
        broker: BrokerInfo {
            host: blueprint.broker.host.clone(),
            port: blueprint.broker.port,
            qos: blueprint.broker.qos,
        },
        period_ms: blueprint.publisher.period_ms,
        topics: if args.topics {
            published_topics(blueprint)
        } else {
            Vec::new()
        },
    }
}

fn print_config_info(blueprint: &BridgeBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Telemetry Bridge Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let sim = &blueprint.simulator;
    println!("🖥  Simulator");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Endpoint: {}:{}", sim.host, sim.port);
    println!(
        "   └─ Timeouts: open {} ms, load {} ms",
        sim.open_timeout_ms, sim.load_timeout_ms
    );

    let scenario = &blueprint.scenario;
    let vehicle = &scenario.vehicle;
    let pos = vehicle.spawn.position;
    println!("\n🚗 Scenario");
    println!("   ├─ Level: {}", scenario.level);
    println!("   ├─ Name: {}", scenario.name);
    println!(
        "   ├─ Vehicle: {} ({}, {}, plate '{}')",
        vehicle.id, vehicle.model, vehicle.color, vehicle.license
    );
    println!("   └─ Spawn: ({:.3}, {:.3}, {:.3})", pos.x, pos.y, pos.z);

    let broker = &blueprint.broker;
    println!("\n📤 Broker");
    println!("   ├─ Endpoint: {}:{}", broker.host, broker.port);
    println!("   ├─ QoS: {}", broker.qos);
    println!("   └─ Period: {} ms", blueprint.publisher.period_ms);

    if args.topics {
        let list = published_topics(blueprint);
        println!("\n📡 Topics ({})", list.len());
        for (i, topic) in list.iter().enumerate() {
            let prefix = if i == list.len() - 1 { "└─" } else { "├─" };
            println!("   {} {}", prefix, topic);
        }
    }

    println!();
}
