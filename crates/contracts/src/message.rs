//! PublishedMessage - mapper output, broker input

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broker topics written by the bridge
pub mod topics {
    pub const FUEL: &str = "vehicle/fuel";
    pub const RPM: &str = "vehicle/rpm";
    pub const GEAR: &str = "vehicle/gear";
    pub const GEAR_A: &str = "vehicle/gear_a";
    pub const RUNNING: &str = "vehicle/running";
    pub const TURN_SIGNAL: &str = "vehicle/turnsignal";
    pub const SPEED_KMPH: &str = "vehicle/speed_kmph";
    pub const SPEED_MPH: &str = "vehicle/speed_mph";
    pub const DISTANCE_KM: &str = "vehicle/distance_km";
    pub const RPM_TACHO: &str = "vehicle/rpm_tacho";
    pub const STEERING: &str = "vehicle/steering";
}

/// Scalar value carried by a single message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl TopicValue {
    /// UTF-8 payload as sent to the broker
    pub fn to_payload(&self) -> Bytes {
        Bytes::from(self.to_string())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// Rendered the way existing dashboards parse it: floats always carry a
/// fractional part and booleans are capitalized.
impl fmt::Display for TopicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v:?}"),
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

/// One topic/value pair
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishedMessage {
    pub topic: &'static str,
    pub value: TopicValue,
}

impl PublishedMessage {
    pub fn new(topic: &'static str, value: TopicValue) -> Self {
        Self { topic, value }
    }
}
