//! Controller error types

use publisher::BrokerError;
use simulator::SimulatorError;
use thiserror::Error;

/// Lifecycle operation error
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("simulator error: {0}")]
    Simulator(SimulatorError),

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    /// Operation needs a running simulation
    #[error("cannot {operation}: simulation is not running")]
    NotRunning { operation: &'static str },

    /// A bounded simulator step did not finish in time
    #[error("{operation} timed out after {waited_ms}ms")]
    Timeout { operation: String, waited_ms: u64 },
}

impl ControllerError {
    pub fn not_running(operation: &'static str) -> Self {
        Self::NotRunning { operation }
    }
}

impl From<SimulatorError> for ControllerError {
    fn from(e: SimulatorError) -> Self {
        match e {
            SimulatorError::Timeout {
                operation,
                waited_ms,
            } => Self::Timeout {
                operation,
                waited_ms,
            },
            other => Self::Simulator(other),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, ControllerError>;
