//! Configuration validation
//!
//! Rules:
//! - simulator/broker host non-empty, port non-zero
//! - open/load/connect timeouts > 0
//! - scenario level, name, vehicle id and model non-empty
//! - spawn orientation is a unit quaternion
//! - broker qos in 0..=2
//! - publisher period_ms > 0

use contracts::{BridgeBlueprint, ContractError, Pose};

/// Maximum tolerated deviation of the spawn quaternion norm from 1
const QUATERNION_TOLERANCE: f64 = 1e-3;

/// Validate a BridgeBlueprint
///
/// Returns the first error encountered.
pub fn validate(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    validate_simulator(blueprint)?;
    validate_scenario(blueprint)?;
    validate_broker(blueprint)?;
    validate_publisher(blueprint)?;
    Ok(())
}

fn validate_simulator(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let sim = &blueprint.simulator;
    require_non_empty("simulator.host", &sim.host)?;
    require_port("simulator.port", sim.port)?;
    require_positive("simulator.open_timeout_ms", sim.open_timeout_ms)?;
    require_positive("simulator.load_timeout_ms", sim.load_timeout_ms)?;
    Ok(())
}

fn validate_scenario(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let scenario = &blueprint.scenario;
    require_non_empty("scenario.level", &scenario.level)?;
    require_non_empty("scenario.name", &scenario.name)?;
    require_non_empty("scenario.vehicle.id", &scenario.vehicle.id)?;
    require_non_empty("scenario.vehicle.model", &scenario.vehicle.model)?;
    validate_pose("scenario.vehicle.spawn", &scenario.vehicle.spawn)
}

fn validate_pose(field: &str, pose: &Pose) -> Result<(), ContractError> {
    let p = &pose.position;
    if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
        return Err(ContractError::config_validation(
            format!("{field}.position"),
            "position components must be finite",
        ));
    }

    let norm = pose.rotation.norm();
    if !norm.is_finite() || (norm - 1.0).abs() > QUATERNION_TOLERANCE {
        return Err(ContractError::config_validation(
            format!("{field}.rotation"),
            format!("rotation must be a unit quaternion, norm is {norm}"),
        ));
    }
    Ok(())
}

fn validate_broker(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let broker = &blueprint.broker;
    require_non_empty("broker.host", &broker.host)?;
    require_port("broker.port", broker.port)?;
    require_positive("broker.connect_timeout_ms", broker.connect_timeout_ms)?;

    if broker.qos > 2 {
        return Err(ContractError::config_validation(
            "broker.qos",
            format!("qos must be 0, 1 or 2, got {}", broker.qos),
        ));
    }
    if matches!(&broker.client_id, Some(id) if id.is_empty()) {
        return Err(ContractError::config_validation(
            "broker.client_id",
            "client_id cannot be empty when set",
        ));
    }
    Ok(())
}

fn validate_publisher(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let publisher = &blueprint.publisher;
    require_positive("publisher.period_ms", publisher.period_ms)?;
    if let Some(ms) = publisher.join_timeout_ms {
        require_positive("publisher.join_timeout_ms", ms)?;
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), ContractError> {
    if value.trim().is_empty() {
        return Err(ContractError::config_validation(field, "cannot be empty"));
    }
    Ok(())
}

fn require_port(field: &str, port: u16) -> Result<(), ContractError> {
    if port == 0 {
        return Err(ContractError::config_validation(field, "port cannot be 0"));
    }
    Ok(())
}

fn require_positive(field: &str, value: u64) -> Result<(), ContractError> {
    if value == 0 {
        return Err(ContractError::config_validation(field, "must be > 0"));
    }
    Ok(())
}
