//! TelemetrySample - simulator poll output
//!
//! One snapshot of the vehicle's electrics sensor. Produced on every poll,
//! consumed immediately by the mapper, never retained.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Raw telemetry snapshot as reported by the simulator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Fuel level as reported by the electrics sensor
    pub fuel: f64,

    /// Engine RPM
    pub rpm: f64,

    /// Raw gear code ("P", "D", "R", "N", ...)
    pub gear: String,

    /// Manufacturer gear label from the automatic gearbox
    pub gear_a: String,

    /// Engine running
    pub running: bool,

    /// Turn signal state
    pub turn_signal: TurnSignal,

    /// Wheel speed in m/s
    pub wheel_speed_ms: f64,

    /// Tachometer RPM (not every vehicle reports it)
    #[serde(default)]
    pub rpm_tacho: Option<f64>,

    /// Steering input
    #[serde(default)]
    pub steering: Option<f64>,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            fuel: 0.0,
            rpm: 0.0,
            gear: Gear::Park.code().to_string(),
            gear_a: String::new(),
            running: false,
            turn_signal: TurnSignal::Off,
            wheel_speed_ms: 0.0,
            rpm_tacho: None,
            steering: None,
        }
    }
}

/// Closed set of gear selector positions the bridge understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gear {
    Park,
    Drive,
    Reverse,
    Neutral,
}

impl Gear {
    /// All known gears
    pub const ALL: [Gear; 4] = [Gear::Park, Gear::Drive, Gear::Reverse, Gear::Neutral];

    /// Parse a raw simulator gear code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim() {
            "P" => Some(Self::Park),
            "D" => Some(Self::Drive),
            "R" => Some(Self::Reverse),
            "N" => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Simulator gear code
    pub fn code(self) -> &'static str {
        match self {
            Self::Park => "P",
            Self::Drive => "D",
            Self::Reverse => "R",
            Self::Neutral => "N",
        }
    }
}

impl fmt::Display for Gear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Turn signal state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnSignal {
    #[default]
    Off,
    Left,
    Right,
}

impl TurnSignal {
    /// Decode the simulator's signed turn signal value (negative is left)
    pub fn from_raw(raw: f64) -> Self {
        if raw < 0.0 {
            Self::Left
        } else if raw > 0.0 {
            Self::Right
        } else {
            Self::Off
        }
    }

    /// Value published on the wire, in the simulator's own float form
    pub fn wire_value(self) -> f64 {
        match self {
            Self::Left => -1.0,
            Self::Off => 0.0,
            Self::Right => 1.0,
        }
    }
}
