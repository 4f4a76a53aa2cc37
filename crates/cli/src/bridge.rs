//! Backend selection and controller wiring.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use contracts::BridgeBlueprint;
use controller::{ControllerStatus, LifecycleController, StatusCallback};
use publisher::{BrokerClient, LogBroker, MqttBroker};
use simulator::{MockSimulatorClient, SimulatorClient};
use tracing::{info, warn};

use crate::cli::{BrokerKind, RunArgs, SimulatorKind};

/// Controller over a concrete simulator and broker
pub type Controller<S, B> = Arc<LifecycleController<S, B>>;

/// Load the configuration and apply CLI overrides
pub fn load_blueprint(args: &RunArgs) -> Result<BridgeBlueprint> {
    info!(config = %args.config.display(), "Loading configuration");

    let mut blueprint = config_loader::ConfigLoader::load_or_default(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(ref host) = args.sim_host {
        info!(host = %host, "Overriding simulator host from CLI");
        blueprint.simulator.host = host.clone();
    }
    if let Some(port) = args.sim_port {
        info!(port = port, "Overriding simulator port from CLI");
        blueprint.simulator.port = port;
    }
    if let Some(ref host) = args.broker_host {
        info!(host = %host, "Overriding broker host from CLI");
        blueprint.broker.host = host.clone();
    }
    if let Some(port) = args.broker_port {
        info!(port = port, "Overriding broker port from CLI");
        blueprint.broker.port = port;
    }
    if let Some(period_ms) = args.period_ms {
        info!(period_ms, "Overriding publish period from CLI");
        blueprint.publisher.period_ms = period_ms;
    }

    // overrides may have broken an otherwise valid file
    config_loader::ConfigLoader::validate(&blueprint).context("Invalid configuration")?;

    info!(
        level = %blueprint.scenario.level,
        scenario = %blueprint.scenario.name,
        simulator = %format!("{}:{}", blueprint.simulator.host, blueprint.simulator.port),
        broker = %format!("{}:{}", blueprint.broker.host, blueprint.broker.port),
        period_ms = blueprint.publisher.period_ms,
        "Configuration loaded"
    );
    Ok(blueprint)
}

/// Something that drives a controller to completion
pub trait Driver {
    fn drive<S, B>(self, controller: Controller<S, B>) -> impl Future<Output = Result<()>>
    where
        S: SimulatorClient + 'static,
        B: BrokerClient + Send + Sync + 'static;
}

/// Build the controller for the selected backends and hand it to `driver`
pub async fn with_controller<D: Driver>(
    args: &RunArgs,
    blueprint: &BridgeBlueprint,
    on_status: StatusCallback,
    driver: D,
) -> Result<()> {
    match args.broker {
        BrokerKind::Mqtt => {
            let broker = Arc::new(MqttBroker::new(blueprint.broker.clone()));
            with_simulator(args, blueprint, broker, on_status, driver).await
        }
        BrokerKind::Log => {
            let broker = Arc::new(LogBroker::new("log"));
            with_simulator(args, blueprint, broker, on_status, driver).await
        }
    }
}

async fn with_simulator<B, D>(
    args: &RunArgs,
    blueprint: &BridgeBlueprint,
    broker: Arc<B>,
    on_status: StatusCallback,
    driver: D,
) -> Result<()>
where
    B: BrokerClient + Send + Sync + 'static,
    D: Driver,
{
    match args.simulator {
        SimulatorKind::Mock => {
            warn!("Using the mock simulator, telemetry is synthetic");
            let sim = Arc::new(MockSimulatorClient::new());
            driver.drive(build(sim, broker, blueprint, on_status)).await
        }
        #[cfg(feature = "beamng")]
        SimulatorKind::Beamng => {
            let sim = Arc::new(simulator::BeamngClient::default());
            driver.drive(build(sim, broker, blueprint, on_status)).await
        }
        #[cfg(not(feature = "beamng"))]
        SimulatorKind::Beamng => {
            anyhow::bail!("BeamNG support not compiled in (enable the `beamng` feature)")
        }
    }
}

fn build<S, B>(
    sim: Arc<S>,
    broker: Arc<B>,
    blueprint: &BridgeBlueprint,
    on_status: StatusCallback,
) -> Controller<S, B>
where
    S: SimulatorClient + 'static,
    B: BrokerClient + Send + Sync + 'static,
{
    Arc::new(LifecycleController::new(sim, broker, blueprint).with_status_callback(on_status))
}

/// Status callback that prints each transition on stdout
pub fn print_status() -> StatusCallback {
    Arc::new(|status: ControllerStatus| {
        if let ControllerStatus::LoadFailed(ref reason) = status {
            println!("{status} ({reason})");
        } else {
            println!("{status}");
        }
    })
}

/// Install the Prometheus exporter when a port is given
pub fn init_metrics(port: u16) -> Result<()> {
    if port != 0 {
        observability::init_metrics_only(port)?;
        info!("Metrics endpoint available on port {}", port);
    }
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
