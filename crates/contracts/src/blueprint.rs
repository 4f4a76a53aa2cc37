//! BridgeBlueprint - Config Loader output
//!
//! Full runtime configuration: simulator endpoint, scenario, broker,
//! publishing cadence and controller timings. Every field defaults to the
//! reference deployment, so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::ScenarioSpec;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeBlueprint {
    pub version: ConfigVersion,
    pub simulator: SimulatorConfig,
    pub scenario: ScenarioSpec,
    pub broker: BrokerConfig,
    pub publisher: PublisherConfig,
    pub controller: ControllerConfig,
}

/// Simulator control endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub host: String,
    pub port: u16,
    /// Simulator installation directory, informational for the operator
    pub home: Option<String>,
    /// Simulator user directory
    pub user: Option<String>,
    /// Upper bound for opening the connection
    pub open_timeout_ms: u64,
    /// Upper bound for loading the scenario
    pub load_timeout_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 64256,
            home: None,
            user: None,
            open_timeout_ms: 30_000,
            load_timeout_ms: 120_000,
        }
    }
}

impl SimulatorConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }
}

/// MQTT broker endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    /// Client id, generated from the current time when absent
    pub client_id: Option<String>,
    /// QoS level 0, 1 or 2
    pub qos: u8,
    pub keep_alive_secs: u64,
    /// Upper bound for the initial CONNACK
    pub connect_timeout_ms: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "158.223.43.7".to_string(),
            port: 1883,
            client_id: None,
            qos: 0,
            keep_alive_secs: 20,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Publishing loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Poll and publish period
    pub period_ms: u64,
    /// Publish accumulated trip distance on `vehicle/distance_km`
    pub publish_distance: bool,
    /// Publish `vehicle/rpm_tacho` and `vehicle/steering` when reported
    pub extended_topics: bool,
    /// How long `stop` waits for the loop to exit before aborting it
    /// (None = two periods plus one second)
    pub join_timeout_ms: Option<u64>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            period_ms: 150,
            publish_distance: false,
            extended_topics: false,
            join_timeout_ms: None,
        }
    }
}

impl PublisherConfig {
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        match self.join_timeout_ms {
            Some(ms) => Duration::from_millis(ms),
            None => self.period() * 2 + Duration::from_secs(1),
        }
    }
}

/// Lifecycle controller timings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Wait after disengaging autopilot before teleporting on reset
    pub autopilot_settle_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            autopilot_settle_ms: 1_000,
        }
    }
}

impl ControllerConfig {
    pub fn autopilot_settle(&self) -> Duration {
        Duration::from_millis(self.autopilot_settle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_reference_defaults() {
        let bp: BridgeBlueprint = serde_json::from_str("{}").unwrap();
        assert_eq!(bp.broker.host, "158.223.43.7");
        assert_eq!(bp.broker.port, 1883);
        assert_eq!(bp.simulator.port, 64256);
        assert_eq!(bp.publisher.period_ms, 150);
        assert_eq!(bp.scenario.level, "italy");
    }

    #[test]
    fn test_default_join_timeout() {
        let cfg = PublisherConfig::default();
        assert_eq!(cfg.join_timeout(), Duration::from_millis(1300));
    }
}
