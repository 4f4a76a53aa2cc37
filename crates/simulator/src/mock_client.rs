//! Mock simulator client
//!
//! In-memory simulator used by unit and integration tests. Every call is
//! journaled so tests can assert on ordering, and each step of the start
//! sequence can be told to fail.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{AutopilotMode, Pose, ScenarioSpec, SensorKind, TelemetrySample, TurnSignal};
use tracing::instrument;

use crate::client::{SimulatorClient, SimulatorEndpoint};
use crate::error::{Result, SimulatorError};

/// Mock client configuration (failure injection)
#[derive(Debug, Default, Clone)]
pub struct MockConfig {
    pub fail_open: bool,
    pub fail_load: bool,
    pub fail_attach: bool,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub fail_close: bool,
    pub fail_autopilot: bool,
    pub fail_teleport: bool,
    /// 1-based poll numbers that fail
    pub fail_polls: Vec<u64>,
    /// Delay applied inside `open`
    pub open_delay: Option<Duration>,
    /// Delay applied inside `load_scenario`
    pub load_delay: Option<Duration>,
    /// Delay applied inside every poll
    pub poll_delay: Option<Duration>,
    /// Samples returned in order, the last one repeats
    /// (empty = a vehicle cruising at 20 m/s)
    pub samples: Vec<TelemetrySample>,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Open(SimulatorEndpoint),
    Close,
    LoadScenario(String),
    StartScenario,
    StopScenario,
    AttachSensor(String, SensorKind),
    Poll(String),
    SetAutopilot(String, AutopilotMode),
    Teleport(String, Pose),
}

#[derive(Debug, Default)]
struct MockState {
    connected: bool,
    loaded_vehicle: Option<String>,
    scenario_running: bool,
    sensors: HashSet<(String, SensorKind)>,
    calls: Vec<MockCall>,
}

/// Mock simulator client
pub struct MockSimulatorClient {
    config: MockConfig,
    poll_count: AtomicU64,
    state: Mutex<MockState>,
}

impl MockSimulatorClient {
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    pub fn with_config(config: MockConfig) -> Self {
        Self {
            config,
            poll_count: AtomicU64::new(0),
            state: Mutex::new(MockState::default()),
        }
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Number of recorded calls matching `pred`
    pub fn count_calls(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn open_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, MockCall::Open(_)))
    }

    pub fn close_calls(&self) -> usize {
        self.count_calls(|c| matches!(c, MockCall::Close))
    }

    pub fn poll_calls(&self) -> u64 {
        self.poll_count.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.state().connected
    }

    pub fn is_scenario_running(&self) -> bool {
        self.state().scenario_running
    }

    /// Sample cruising at 20 m/s in drive
    pub fn cruising_sample() -> TelemetrySample {
        TelemetrySample {
            fuel: 0.75,
            rpm: 2100.0,
            gear: "D".to_string(),
            gear_a: "4".to_string(),
            running: true,
            turn_signal: TurnSignal::Off,
            wheel_speed_ms: 20.0,
            rpm_tacho: Some(2100.0),
            steering: Some(0.0),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: MockCall) -> MutexGuard<'_, MockState> {
        let mut state = self.state();
        state.calls.push(call);
        state
    }

    fn ensure_connected(state: &MockState) -> Result<()> {
        if state.connected {
            Ok(())
        } else {
            Err(SimulatorError::NotConnected)
        }
    }

    fn ensure_vehicle(state: &MockState, vehicle_id: &str, command: &str) -> Result<()> {
        match state.loaded_vehicle.as_deref() {
            Some(id) if id == vehicle_id => Ok(()),
            _ => Err(SimulatorError::command(
                command,
                format!("vehicle '{vehicle_id}' not in scenario"),
            )),
        }
    }

    fn sample_for(&self, poll_number: u64) -> TelemetrySample {
        let samples = &self.config.samples;
        if samples.is_empty() {
            return Self::cruising_sample();
        }
        let idx = (poll_number as usize - 1).min(samples.len() - 1);
        samples[idx].clone()
    }
}

impl Default for MockSimulatorClient {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatorClient for MockSimulatorClient {
    #[instrument(name = "mock_sim_open", skip(self), fields(endpoint = %endpoint))]
    async fn open(&self, endpoint: &SimulatorEndpoint) -> Result<()> {
        drop(self.record(MockCall::Open(endpoint.clone())));
        if let Some(delay) = self.config.open_delay {
            tokio::time::sleep(delay).await;
        }
        if self.config.fail_open {
            return Err(SimulatorError::connection(
                endpoint.to_string(),
                "mock failure",
            ));
        }
        self.state().connected = true;
        Ok(())
    }

    #[instrument(name = "mock_sim_close", skip(self))]
    async fn close(&self) -> Result<()> {
        let mut state = self.record(MockCall::Close);
        // the connection is gone even when closing reports an error
        state.connected = false;
        state.scenario_running = false;
        state.loaded_vehicle = None;
        state.sensors.clear();
        if self.config.fail_close {
            return Err(SimulatorError::connection("mock", "mock close failure"));
        }
        Ok(())
    }

    #[instrument(name = "mock_sim_load_scenario", skip(self, scenario), fields(scenario = %scenario.name))]
    async fn load_scenario(&self, scenario: &ScenarioSpec) -> Result<()> {
        {
            let state = self.record(MockCall::LoadScenario(scenario.name.clone()));
            Self::ensure_connected(&state)?;
        }
        if let Some(delay) = self.config.load_delay {
            tokio::time::sleep(delay).await;
        }
        if self.config.fail_load {
            return Err(SimulatorError::scenario_load(&scenario.name, "mock failure"));
        }
        self.state().loaded_vehicle = Some(scenario.vehicle.id.clone());
        Ok(())
    }

    #[instrument(name = "mock_sim_start_scenario", skip(self))]
    async fn start_scenario(&self) -> Result<()> {
        let mut state = self.record(MockCall::StartScenario);
        Self::ensure_connected(&state)?;
        if state.loaded_vehicle.is_none() {
            return Err(SimulatorError::scenario_load("", "no scenario loaded"));
        }
        if self.config.fail_start {
            return Err(SimulatorError::scenario_load("", "mock start failure"));
        }
        state.scenario_running = true;
        Ok(())
    }

    #[instrument(name = "mock_sim_stop_scenario", skip(self))]
    async fn stop_scenario(&self) -> Result<()> {
        let mut state = self.record(MockCall::StopScenario);
        Self::ensure_connected(&state)?;
        state.scenario_running = false;
        if self.config.fail_stop {
            return Err(SimulatorError::command("stop_scenario", "mock failure"));
        }
        Ok(())
    }

    #[instrument(name = "mock_sim_attach_sensor", skip(self), fields(vehicle_id = %vehicle_id, sensor = ?sensor))]
    async fn attach_sensor(&self, vehicle_id: &str, sensor: SensorKind) -> Result<()> {
        let mut state = self.record(MockCall::AttachSensor(vehicle_id.to_string(), sensor));
        Self::ensure_connected(&state)?;
        Self::ensure_vehicle(&state, vehicle_id, "attach_sensor")?;
        if self.config.fail_attach {
            return Err(SimulatorError::command("attach_sensor", "mock failure"));
        }
        state.sensors.insert((vehicle_id.to_string(), sensor));
        Ok(())
    }

    async fn poll_sensors(&self, vehicle_id: &str) -> Result<TelemetrySample> {
        let poll_number = self.poll_count.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let state = self.record(MockCall::Poll(vehicle_id.to_string()));
            Self::ensure_connected(&state)?;
            if !state
                .sensors
                .contains(&(vehicle_id.to_string(), SensorKind::Electrics))
            {
                return Err(SimulatorError::sensor_poll(
                    vehicle_id,
                    "electrics sensor not attached",
                ));
            }
        }
        if let Some(delay) = self.config.poll_delay {
            tokio::time::sleep(delay).await;
        }
        if self.config.fail_polls.contains(&poll_number) {
            return Err(SimulatorError::sensor_poll(
                vehicle_id,
                format!("mock failure on poll {poll_number}"),
            ));
        }
        Ok(self.sample_for(poll_number))
    }

    #[instrument(name = "mock_sim_set_autopilot", skip(self), fields(vehicle_id = %vehicle_id, mode = mode.as_str()))]
    async fn set_autopilot_mode(&self, vehicle_id: &str, mode: AutopilotMode) -> Result<()> {
        let state = self.record(MockCall::SetAutopilot(vehicle_id.to_string(), mode));
        Self::ensure_connected(&state)?;
        Self::ensure_vehicle(&state, vehicle_id, "set_autopilot_mode")?;
        if self.config.fail_autopilot {
            return Err(SimulatorError::command("set_autopilot_mode", "mock failure"));
        }
        Ok(())
    }

    #[instrument(name = "mock_sim_teleport", skip(self, pose), fields(vehicle_id = %vehicle_id))]
    async fn teleport(&self, vehicle_id: &str, pose: Pose) -> Result<()> {
        let state = self.record(MockCall::Teleport(vehicle_id.to_string(), pose));
        Self::ensure_connected(&state)?;
        Self::ensure_vehicle(&state, vehicle_id, "teleport")?;
        if self.config.fail_teleport {
            return Err(SimulatorError::command("teleport", "mock failure"));
        }
        Ok(())
    }
}
