//! Status notifications for the presentation layer

use std::fmt;
use std::sync::Arc;

/// Lifecycle status reported to the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerStatus {
    /// Nothing started yet
    Idle,
    Loading,
    Loaded,
    /// Start failed; the message is the underlying error
    LoadFailed(String),
    Stopped,
    AutopilotChanged { engaged: bool },
    VehicleReset,
    /// A running-state operation (autopilot, reset) failed
    OperationFailed { operation: &'static str, message: String },
    Closed,
}

impl ControllerStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::LoadFailed(_) | Self::OperationFailed { .. })
    }
}

impl fmt::Display for ControllerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("Press 'start' to load the simulation."),
            Self::Loading => f.write_str("Loading simulation..."),
            Self::Loaded => f.write_str("Simulation Loaded!"),
            Self::LoadFailed(_) => f.write_str("Error loading simulation."),
            Self::Stopped => f.write_str("Simulation stopped."),
            Self::AutopilotChanged { engaged: true } => f.write_str("AI started."),
            Self::AutopilotChanged { engaged: false } => f.write_str("AI stopped."),
            Self::VehicleReset => f.write_str("Vehicle reset to spawn."),
            Self::OperationFailed { operation, message } => {
                write!(f, "Error during {operation}: {message}")
            }
            Self::Closed => f.write_str("Bridge closed."),
        }
    }
}

/// Receives every status transition
pub type StatusCallback = Arc<dyn Fn(ControllerStatus) + Send + Sync>;

/// Callback that drops every status
pub fn ignore_status() -> StatusCallback {
    Arc::new(|_| {})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_texts() {
        assert_eq!(ControllerStatus::Loading.to_string(), "Loading simulation...");
        assert_eq!(ControllerStatus::Loaded.to_string(), "Simulation Loaded!");
        assert_eq!(
            ControllerStatus::LoadFailed("refused".into()).to_string(),
            "Error loading simulation."
        );
    }

    #[test]
    fn test_error_statuses() {
        assert!(ControllerStatus::LoadFailed(String::new()).is_error());
        assert!(!ControllerStatus::Stopped.is_error());
    }
}
