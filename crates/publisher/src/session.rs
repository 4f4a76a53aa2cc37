//! What the publishing loop may see of the session

/// Restricted session view handed to the publishing loop
///
/// The loop can observe whether the simulation is running and accumulate
/// trip distance. It can never change the lifecycle flags.
pub trait SessionView: Send + Sync {
    /// Whether the simulation is running
    fn simulation_running(&self) -> bool;

    /// Add `delta_km` to the trip distance and return the new total
    fn add_trip_distance(&self, delta_km: f64) -> f64;
}
