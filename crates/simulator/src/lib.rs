//! # Simulator
//!
//! Vehicle simulator collaborator.
//!
//! Responsibilities:
//! - Define the `SimulatorClient` control surface
//! - Run the scenario start sequence with timeouts and rollback
//! - Provide a mock client for tests
//!
//! ## Feature Flags
//!
//! - `beamng` (default): TCP/MessagePack client for a BeamNG simulator

pub mod client;
pub mod error;
pub mod launcher;
pub mod mock_client;

#[cfg(feature = "beamng")]
pub mod beamng;

pub use client::{SimulatorClient, SimulatorEndpoint};
pub use error::{Result, SimulatorError};
pub use launcher::{LaunchTimeouts, ScenarioLauncher};
pub use mock_client::{MockCall, MockConfig, MockSimulatorClient};

#[cfg(feature = "beamng")]
pub use beamng::{BeamngClient, BeamngOptions};
