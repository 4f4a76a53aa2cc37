//! Simulator client abstraction
//!
//! Defines the control surface the bridge needs from a vehicle simulator,
//! supporting a real implementation and mock testing.

use std::fmt;
use std::future::Future;

use contracts::{AutopilotMode, Pose, ScenarioSpec, SensorKind, TelemetrySample};

use crate::error::Result;

/// Control endpoint of the simulator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatorEndpoint {
    pub host: String,
    pub port: u16,
}

impl SimulatorEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for SimulatorEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Simulator client trait
///
/// All methods take `&self` so one client can be shared between the
/// lifecycle controller and the publishing loop.
pub trait SimulatorClient: Send + Sync {
    /// Open the control connection
    fn open(&self, endpoint: &SimulatorEndpoint) -> impl Future<Output = Result<()>> + Send;

    /// Close the control connection
    ///
    /// Idempotent: returns Ok when already closed
    fn close(&self) -> impl Future<Output = Result<()>> + Send;

    /// Build and load the scenario, spawning its vehicle at the spawn pose
    fn load_scenario(&self, scenario: &ScenarioSpec) -> impl Future<Output = Result<()>> + Send;

    /// Start the loaded scenario
    fn start_scenario(&self) -> impl Future<Output = Result<()>> + Send;

    /// Stop the running scenario
    fn stop_scenario(&self) -> impl Future<Output = Result<()>> + Send;

    /// Attach a sensor to a vehicle
    fn attach_sensor(
        &self,
        vehicle_id: &str,
        sensor: SensorKind,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Poll the vehicle's attached sensors for one telemetry sample
    fn poll_sensors(&self, vehicle_id: &str)
        -> impl Future<Output = Result<TelemetrySample>> + Send;

    /// Switch the vehicle's autopilot mode
    fn set_autopilot_mode(
        &self,
        vehicle_id: &str,
        mode: AutopilotMode,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Move the vehicle to `pose`
    fn teleport(&self, vehicle_id: &str, pose: Pose) -> impl Future<Output = Result<()>> + Send;
}
