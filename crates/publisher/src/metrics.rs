//! Publishing loop counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use observability::{RunningStats, StatsSummary};

/// Counters for the publishing loop, shared between the loop task and its
/// owner
#[derive(Debug, Default)]
pub struct PublisherMetrics {
    cycles: AtomicU64,
    poll_failures: AtomicU64,
    published: AtomicU64,
    publish_failures: AtomicU64,
    mapping_failures: AtomicU64,
    cycle_ms: Mutex<RunningStats>,
}

impl PublisherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed)
    }

    pub fn inc_cycles(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn poll_failures(&self) -> u64 {
        self.poll_failures.load(Ordering::Relaxed)
    }

    pub fn inc_poll_failures(&self) {
        self.poll_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    pub fn inc_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn publish_failures(&self) -> u64 {
        self.publish_failures.load(Ordering::Relaxed)
    }

    pub fn inc_publish_failures(&self) {
        self.publish_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mapping_failures(&self) -> u64 {
        self.mapping_failures.load(Ordering::Relaxed)
    }

    pub fn inc_mapping_failures(&self) {
        self.mapping_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cycle_ms(&self, duration_ms: f64) {
        self.cycle_ms
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration_ms);
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let cycle_ms = StatsSummary::from(&*self.cycle_ms.lock().unwrap_or_else(PoisonError::into_inner));
        MetricsSnapshot {
            cycles: self.cycles(),
            poll_failures: self.poll_failures(),
            published: self.published(),
            publish_failures: self.publish_failures(),
            mapping_failures: self.mapping_failures(),
            cycle_ms,
        }
    }
}

/// Snapshot of loop counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub cycles: u64,
    pub poll_failures: u64,
    pub published: u64,
    pub publish_failures: u64,
    pub mapping_failures: u64,
    pub cycle_ms: StatsSummary,
}

impl std::fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Cycles: {}", self.cycles)?;
        writeln!(f, "Poll failures: {}", self.poll_failures)?;
        writeln!(f, "Messages published: {}", self.published)?;
        writeln!(f, "Publish failures: {}", self.publish_failures)?;
        writeln!(f, "Mapping failures: {}", self.mapping_failures)?;
        write!(f, "Cycle time (ms): {}", self.cycle_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = PublisherMetrics::new();
        metrics.inc_cycles();
        metrics.inc_cycles();
        metrics.inc_published();
        metrics.inc_poll_failures();
        metrics.record_cycle_ms(2.0);

        let snap = metrics.snapshot();
        assert_eq!(snap.cycles, 2);
        assert_eq!(snap.published, 1);
        assert_eq!(snap.poll_failures, 1);
        assert_eq!(snap.cycle_ms.count, 1);
        assert!(snap.to_string().contains("Cycles: 2"));
    }
}
