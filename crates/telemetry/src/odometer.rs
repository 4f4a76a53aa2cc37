//! Trip distance accumulation
//!
//! Integrates wheel speed over the monotonic time elapsed between
//! consecutive polls. The first poll of a fresh odometer has no previous
//! timestamp and contributes nothing.

use std::time::Instant;

/// Trip odometer
#[derive(Debug, Clone, Default)]
pub struct TripOdometer {
    last_poll: Option<Instant>,
}

impl TripOdometer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a poll at `now` and return the kilometers travelled since the
    /// previous one
    ///
    /// Speed is taken by magnitude so the trip total never decreases.
    pub fn advance(&mut self, now: Instant, wheel_speed_ms: f64) -> f64 {
        let delta_km = match self.last_poll {
            Some(last) => {
                let elapsed = now.saturating_duration_since(last).as_secs_f64();
                wheel_speed_ms.abs() * elapsed / 1000.0
            }
            None => 0.0,
        };
        self.last_poll = Some(now);

        if delta_km.is_finite() {
            delta_km
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_poll_contributes_zero() {
        let mut odo = TripOdometer::new();
        assert_eq!(odo.advance(Instant::now(), 30.0), 0.0);
    }

    #[test]
    fn test_accumulates_between_polls() {
        let mut odo = TripOdometer::new();
        let t0 = Instant::now();
        odo.advance(t0, 20.0);

        // 20 m/s for 10 s = 0.2 km
        let km = odo.advance(t0 + Duration::from_secs(10), 20.0);
        assert!((km - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_speed_ignored() {
        let mut odo = TripOdometer::new();
        let t0 = Instant::now();
        odo.advance(t0, 1.0);
        assert_eq!(odo.advance(t0 + Duration::from_secs(1), f64::NAN), 0.0);
    }
}
