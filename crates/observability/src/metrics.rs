//! Bridge metrics
//!
//! Thin wrappers around the `metrics` macros so metric names and labels
//! live in one place, plus an online statistics helper for run summaries.

use metrics::{counter, gauge, histogram};

/// Record one publish attempt for `topic`
pub fn record_publish(topic: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "bridge_publish_total",
        "topic" => topic.to_string(),
        "status" => status
    )
    .increment(1);
}

/// Record one simulator poll
pub fn record_poll(success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!("bridge_poll_total", "status" => status).increment(1);
}

/// Record a gear code the mapper could not translate
pub fn record_unknown_gear(code: &str) {
    counter!("bridge_unknown_gear_total", "code" => code.to_string()).increment(1);
}

/// Record the wall time of one poll/map/publish cycle
pub fn record_cycle_duration_ms(duration_ms: f64) {
    histogram!("bridge_cycle_duration_ms").record(duration_ms);
}

/// Record the session flags after a lifecycle transition
pub fn record_session_state(simulation_running: bool, autopilot_running: bool) {
    gauge!("bridge_simulation_running").set(if simulation_running { 1.0 } else { 0.0 });
    gauge!("bridge_autopilot_running").set(if autopilot_running { 1.0 } else { 0.0 });
}

/// Record the current trip distance
pub fn record_trip_distance_km(distance_km: f64) {
    gauge!("bridge_trip_distance_km").set(distance_km);
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Frozen view of a `RunningStats`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_summary_display() {
        assert_eq!(StatsSummary::default().to_string(), "N/A");

        let mut stats = RunningStats::default();
        stats.push(150.0);
        stats.push(152.0);
        let output = StatsSummary::from(&stats).to_string();
        assert!(output.contains("mean=151.000"));
        assert!(output.contains("(n=2)"));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // no recorder installed: the macros are no-ops
        record_publish("vehicle/fuel", true);
        record_poll(false);
        record_unknown_gear("S");
        record_cycle_duration_ms(1.5);
        record_session_state(true, false);
        record_trip_distance_km(0.4);
    }
}
