//! Sample to message mapping
//!
//! Converts one `TelemetrySample` into the ordered batch of broker messages.
//! A field that fails to map is reported in `MappedBatch::errors` and left
//! out of the batch; the remaining fields are still produced.

use contracts::{topics, Gear, PublishedMessage, TelemetrySample, TopicValue};

use crate::error::MapError;

/// m/s to km/h
pub const MS_TO_KMPH: f64 = 3.6;
/// m/s to mph
pub const MS_TO_MPH: f64 = 2.237;

/// Optional topic groups
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MapperOptions {
    /// Emit `vehicle/distance_km`
    pub publish_distance: bool,
    /// Emit `vehicle/rpm_tacho` and `vehicle/steering` when present
    pub extended_topics: bool,
}

/// Result of mapping one sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedBatch {
    pub messages: Vec<PublishedMessage>,
    pub errors: Vec<MapError>,
}

impl MappedBatch {
    /// Find the message published on `topic`
    pub fn get(&self, topic: &str) -> Option<&TopicValue> {
        self.messages
            .iter()
            .find(|m| m.topic == topic)
            .map(|m| &m.value)
    }
}

/// Stateless telemetry mapper
#[derive(Debug, Clone, Copy, Default)]
pub struct TelemetryMapper {
    options: MapperOptions,
}

impl TelemetryMapper {
    pub fn new(options: MapperOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> MapperOptions {
        self.options
    }

    /// Map one sample
    ///
    /// `trip_distance_km` is only read when distance publishing is enabled.
    pub fn map(&self, sample: &TelemetrySample, trip_distance_km: f64) -> MappedBatch {
        let mut batch = MappedBatch::default();
        let mut push = |topic, value| batch.messages.push(PublishedMessage::new(topic, value));

        push(topics::FUEL, TopicValue::Float(round_fuel(sample.fuel)));
        push(topics::RPM, TopicValue::Int(truncate_rpm(sample.rpm)));

        let gear = map_gear(&sample.gear);
        if let Ok(value) = gear {
            push(topics::GEAR, TopicValue::Int(value));
        }

        push(topics::GEAR_A, TopicValue::Text(sample.gear_a.clone()));
        push(topics::RUNNING, TopicValue::Bool(sample.running));
        push(
            topics::TURN_SIGNAL,
            TopicValue::Float(sample.turn_signal.wire_value()),
        );
        push(
            topics::SPEED_KMPH,
            TopicValue::Int(speed_kmph(sample.wheel_speed_ms)),
        );
        push(
            topics::SPEED_MPH,
            TopicValue::Int(speed_mph(sample.wheel_speed_ms)),
        );

        if self.options.publish_distance {
            push(
                topics::DISTANCE_KM,
                TopicValue::Int(trip_distance_km.trunc() as i64),
            );
        }

        if self.options.extended_topics {
            if let Some(rpm_tacho) = sample.rpm_tacho {
                push(topics::RPM_TACHO, TopicValue::Int(truncate_rpm(rpm_tacho)));
            }
            if let Some(steering) = sample.steering {
                push(topics::STEERING, TopicValue::Float(steering));
            }
        }

        if let Err(e) = gear {
            batch.errors.push(e);
        }
        batch
    }
}

/// Gear to published integer
pub fn gear_value(gear: Gear) -> i64 {
    match gear {
        Gear::Drive => -1,
        Gear::Park => 0,
        Gear::Reverse => 1,
        Gear::Neutral => 2,
    }
}

/// Raw gear code to published integer
pub fn map_gear(code: &str) -> Result<i64, MapError> {
    Gear::from_code(code)
        .map(gear_value)
        .ok_or_else(|| MapError::unknown_gear(code))
}

/// Round to two decimals
pub fn round_fuel(fuel: f64) -> f64 {
    (fuel * 100.0).round() / 100.0
}

pub fn truncate_rpm(rpm: f64) -> i64 {
    rpm.trunc() as i64
}

pub fn speed_kmph(wheel_speed_ms: f64) -> i64 {
    (wheel_speed_ms * MS_TO_KMPH).round() as i64
}

pub fn speed_mph(wheel_speed_ms: f64) -> i64 {
    (wheel_speed_ms * MS_TO_MPH).round() as i64
}
