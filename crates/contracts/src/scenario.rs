//! Scenario description handed to the simulator at start.

use serde::{Deserialize, Serialize};

/// Position in world coordinates (meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Orientation quaternion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }
}

/// Position plus orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Position,
    pub rotation: Quaternion,
}

impl Pose {
    /// Spawn pose of the reference "italy" scenario
    pub fn reference_spawn() -> Self {
        Self {
            position: Position {
                x: -1122.145386,
                y: 1649.684448,
                z: 152.4150848,
            },
            rotation: Quaternion {
                x: -0.001342499163,
                y: -0.0001237737451,
                z: -0.1021581069,
                w: 0.9947673082,
            },
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::reference_spawn()
    }
}

/// Vehicle placed into the scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSpec {
    /// Vehicle id used for every per-vehicle call
    pub id: String,
    /// Simulator model name
    pub model: String,
    pub color: String,
    pub license: String,
    /// Spawn and reset pose
    pub spawn: Pose,
}

impl Default for VehicleSpec {
    fn default() -> Self {
        Self {
            id: "ego".to_string(),
            model: "etk800".to_string(),
            color: "Blue".to_string(),
            license: "connard".to_string(),
            spawn: Pose::reference_spawn(),
        }
    }
}

/// Level plus scenario name plus the single ego vehicle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioSpec {
    /// Level (map) name
    pub level: String,
    /// Scenario name
    pub name: String,
    pub vehicle: VehicleSpec,
}

impl Default for ScenarioSpec {
    fn default() -> Self {
        Self {
            level: "italy".to_string(),
            name: "demo_scenario".to_string(),
            vehicle: VehicleSpec::default(),
        }
    }
}

/// Simulator-provided automated driving mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutopilotMode {
    /// Drive around the map
    Span,
    Disabled,
}

impl AutopilotMode {
    /// Mode name understood by the simulator
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Span => "span",
            Self::Disabled => "disabled",
        }
    }
}

/// Sensors the bridge can attach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    Electrics,
}

impl SensorKind {
    /// Attachment name in the simulator
    pub fn name(self) -> &'static str {
        match self {
            Self::Electrics => "electrics",
        }
    }
}
