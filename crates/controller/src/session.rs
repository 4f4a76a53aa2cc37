//! Session state shared between the controller and the publishing loop

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use publisher::SessionView;

/// Lifecycle flags plus the trip distance
///
/// Only the controller changes the flags. Autopilot can only be on while
/// the simulation runs; clearing `simulation_running` clears it too.
#[derive(Debug)]
pub struct SessionState {
    simulation_running: AtomicBool,
    autopilot_running: AtomicBool,
    /// f64 bit pattern
    trip_distance_km: AtomicU64,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            simulation_running: AtomicBool::new(false),
            autopilot_running: AtomicBool::new(false),
            trip_distance_km: AtomicU64::new(0f64.to_bits()),
        }
    }

    pub fn simulation_running(&self) -> bool {
        self.simulation_running.load(Ordering::SeqCst)
    }

    pub fn autopilot_running(&self) -> bool {
        self.autopilot_running.load(Ordering::SeqCst)
    }

    pub fn trip_distance_km(&self) -> f64 {
        f64::from_bits(self.trip_distance_km.load(Ordering::SeqCst))
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            simulation_running: self.simulation_running(),
            autopilot_running: self.autopilot_running(),
            trip_distance_km: self.trip_distance_km(),
        }
    }

    pub(crate) fn set_simulation_running(&self, running: bool) {
        if !running {
            self.autopilot_running.store(false, Ordering::SeqCst);
        }
        self.simulation_running.store(running, Ordering::SeqCst);
    }

    /// Returns false (and changes nothing) when engaging while stopped
    pub(crate) fn set_autopilot_running(&self, running: bool) -> bool {
        if running && !self.simulation_running() {
            return false;
        }
        self.autopilot_running.store(running, Ordering::SeqCst);
        true
    }

    pub(crate) fn reset_trip(&self) {
        self.trip_distance_km.store(0f64.to_bits(), Ordering::SeqCst);
    }

    fn add_trip_distance(&self, delta_km: f64) -> f64 {
        let delta_km = if delta_km.is_finite() && delta_km > 0.0 {
            delta_km
        } else {
            0.0
        };
        let previous = self
            .trip_distance_km
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |bits| {
                Some((f64::from_bits(bits) + delta_km).to_bits())
            })
            .unwrap_or_else(|bits| bits);
        f64::from_bits(previous) + delta_km
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the session
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub simulation_running: bool,
    pub autopilot_running: bool,
    pub trip_distance_km: f64,
}

/// The publishing loop's window onto the session
pub struct LoopView(Arc<SessionState>);

impl LoopView {
    pub fn new(state: Arc<SessionState>) -> Self {
        Self(state)
    }
}

impl SessionView for LoopView {
    fn simulation_running(&self) -> bool {
        self.0.simulation_running()
    }

    fn add_trip_distance(&self, delta_km: f64) -> f64 {
        self.0.add_trip_distance(delta_km)
    }
}
