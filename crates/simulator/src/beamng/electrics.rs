//! Electrics sensor payload decoding

use contracts::{TelemetrySample, TurnSignal};
use serde_json::{Map, Value};

use crate::error::{Result, SimulatorError};

/// Build a sample from the `electrics` map of a sensor response
///
/// The simulator reports gear codes as strings for automatic gearboxes and
/// as numbers for manual ones; both are normalized to text. Flags may come
/// as booleans or as 0/1 numbers.
pub fn sample_from_electrics(vehicle_id: &str, electrics: &Value) -> Result<TelemetrySample> {
    let map = electrics
        .as_object()
        .ok_or_else(|| SimulatorError::sensor_poll(vehicle_id, "electrics payload is not a map"))?;

    let number = |key: &str| -> Result<f64> {
        map.get(key)
            .and_then(Value::as_f64)
            .ok_or_else(|| SimulatorError::sensor_poll(vehicle_id, format!("missing field '{key}'")))
    };

    Ok(TelemetrySample {
        fuel: number("fuel")?,
        rpm: number("rpm")?,
        gear: text(map, "gear").unwrap_or_default(),
        gear_a: text(map, "gear_a").unwrap_or_default(),
        running: flag(map, "running"),
        turn_signal: map
            .get("turnsignal")
            .and_then(Value::as_f64)
            .map(TurnSignal::from_raw)
            .unwrap_or_default(),
        wheel_speed_ms: number("wheelspeed")?,
        rpm_tacho: map.get("rpm_tacho").and_then(Value::as_f64),
        steering: map.get("steering").and_then(Value::as_f64),
    })
}

fn text(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(
            n.as_i64()
                .map(|i| i.to_string())
                .unwrap_or_else(|| n.to_string()),
        ),
        _ => None,
    }
}

fn flag(map: &Map<String, Value>, key: &str) -> bool {
    match map.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    }
}
