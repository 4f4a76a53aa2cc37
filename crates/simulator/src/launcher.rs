//! Scenario launcher
//!
//! Runs the simulator start sequence (open, load, attach, start) under
//! timeouts and releases whatever was acquired when a step fails.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use contracts::{ScenarioSpec, SensorKind, SimulatorConfig};
use tracing::{error, info, instrument, warn};

use crate::client::{SimulatorClient, SimulatorEndpoint};
use crate::error::{Result, SimulatorError};

/// Timeouts for the blocking steps of the start sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchTimeouts {
    pub open: Duration,
    pub load: Duration,
}

impl LaunchTimeouts {
    pub fn from_config(config: &SimulatorConfig) -> Self {
        Self {
            open: config.open_timeout(),
            load: config.load_timeout(),
        }
    }
}

impl Default for LaunchTimeouts {
    fn default() -> Self {
        Self::from_config(&SimulatorConfig::default())
    }
}

/// Progress of a start sequence, used to decide what to release
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Acquired {
    opened: bool,
    loaded: bool,
}

/// Scenario launcher
pub struct ScenarioLauncher<S: SimulatorClient> {
    client: Arc<S>,
    timeouts: LaunchTimeouts,
}

impl<S: SimulatorClient> ScenarioLauncher<S> {
    pub fn new(client: Arc<S>, timeouts: LaunchTimeouts) -> Self {
        Self { client, timeouts }
    }

    pub fn client(&self) -> &Arc<S> {
        &self.client
    }

    /// Open the simulator and bring `scenario` to the running state
    ///
    /// On failure the scenario is stopped if it was loaded and the
    /// connection is closed if it was opened, then the error is returned.
    #[instrument(
        name = "scenario_launcher_launch",
        skip(self, scenario),
        fields(endpoint = %endpoint, scenario = %scenario.name, vehicle_id = %scenario.vehicle.id)
    )]
    pub async fn launch(&self, endpoint: &SimulatorEndpoint, scenario: &ScenarioSpec) -> Result<()> {
        let mut acquired = Acquired::default();

        match self.run_sequence(endpoint, scenario, &mut acquired).await {
            Ok(()) => {
                info!("scenario running");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, ?acquired, "launch failed, rolling back");
                self.rollback(acquired).await;
                Err(e)
            }
        }
    }

    async fn run_sequence(
        &self,
        endpoint: &SimulatorEndpoint,
        scenario: &ScenarioSpec,
        acquired: &mut Acquired,
    ) -> Result<()> {
        info!("opening simulator");
        with_timeout("open", self.timeouts.open, self.client.open(endpoint)).await?;
        acquired.opened = true;

        info!(level = %scenario.level, "loading scenario");
        with_timeout("load_scenario", self.timeouts.load, self.client.load_scenario(scenario))
            .await?;
        acquired.loaded = true;

        self.client
            .attach_sensor(&scenario.vehicle.id, SensorKind::Electrics)
            .await?;
        self.client.start_scenario().await
    }

    /// Stop the scenario and close the connection, logging failures
    #[instrument(name = "scenario_launcher_teardown", skip(self))]
    pub async fn teardown(&self) {
        info!("starting teardown");
        self.rollback(Acquired {
            opened: true,
            loaded: true,
        })
        .await;
        info!("teardown completed");
    }

    async fn rollback(&self, acquired: Acquired) {
        if acquired.loaded {
            if let Err(e) = self.client.stop_scenario().await {
                error!(error = %e, "failed to stop scenario");
            }
        }
        if acquired.opened {
            if let Err(e) = self.client.close().await {
                error!(error = %e, "failed to close simulator connection");
            }
        }
    }
}

async fn with_timeout<T>(
    operation: &str,
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(SimulatorError::timeout(operation, limit)),
    }
}
