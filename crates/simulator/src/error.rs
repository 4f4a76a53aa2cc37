//! Simulator error types

use thiserror::Error;

/// Simulator collaborator error
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// Could not open or lost the control connection
    #[error("failed to connect to simulator at {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    /// Operation issued before `open` succeeded
    #[error("simulator not connected")]
    NotConnected,

    /// Scenario could not be built, loaded or started
    #[error("failed to load scenario '{scenario}': {message}")]
    ScenarioLoad { scenario: String, message: String },

    /// Sensor attach or poll failure
    #[error("sensor poll failed for vehicle '{vehicle_id}': {message}")]
    SensorPoll { vehicle_id: String, message: String },

    /// Vehicle command (autopilot, teleport, attach) rejected
    #[error("simulator command '{command}' failed: {message}")]
    Command { command: String, message: String },

    /// Malformed or unexpected response
    #[error("simulator protocol error: {message}")]
    Protocol { message: String },

    /// Operation did not finish in time
    #[error("simulator {operation} timed out after {waited_ms}ms")]
    Timeout { operation: String, waited_ms: u64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimulatorError {
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn scenario_load(scenario: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ScenarioLoad {
            scenario: scenario.into(),
            message: message.into(),
        }
    }

    pub fn sensor_poll(vehicle_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SensorPoll {
            vehicle_id: vehicle_id.into(),
            message: message.into(),
        }
    }

    pub fn command(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    pub fn timeout(operation: impl Into<String>, waited: std::time::Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            waited_ms: waited.as_millis() as u64,
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, SimulatorError>;
