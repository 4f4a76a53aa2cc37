//! PublisherHandle - owns the publishing loop task

use std::sync::Arc;
use std::time::Duration;

use simulator::SimulatorClient;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::broker::BrokerClient;
use crate::metrics::PublisherMetrics;
use crate::publishing_loop::{LoopSettings, PublishingLoop};
use crate::session::SessionView;

/// How a join ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The loop observed the cleared flag and returned
    Finished,
    /// The join timed out and the task was aborted
    Aborted,
    /// The task panicked
    Panicked,
}

/// Handle to a running publishing loop
pub struct PublisherHandle {
    metrics: Arc<PublisherMetrics>,
    task: JoinHandle<()>,
}

impl PublisherHandle {
    /// Spawn the loop task
    ///
    /// `metrics` may be shared across restarts so counters accumulate.
    pub fn spawn<S, B>(
        simulator: Arc<S>,
        broker: Arc<B>,
        session: Arc<dyn SessionView>,
        settings: LoopSettings,
        metrics: Arc<PublisherMetrics>,
    ) -> Self
    where
        S: SimulatorClient + 'static,
        B: BrokerClient + Send + Sync + 'static,
    {
        let worker = PublishingLoop::new(simulator, broker, session, settings, Arc::clone(&metrics));
        let task = tokio::spawn(worker.run());
        Self { metrics, task }
    }

    /// Whether the loop task is still running
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn metrics(&self) -> &Arc<PublisherMetrics> {
        &self.metrics
    }

    /// Wait for the loop to exit on its own, aborting it after `timeout`
    ///
    /// The caller must have cleared the running flag first. When this
    /// returns the task is gone and will publish nothing more.
    #[instrument(name = "publisher_handle_join", skip(self), fields(timeout_ms = timeout.as_millis() as u64))]
    pub async fn join(mut self, timeout: Duration) -> JoinOutcome {
        let outcome = match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(())) => JoinOutcome::Finished,
            Ok(Err(e)) if e.is_panic() => {
                error!(error = ?e, "publishing loop panicked");
                JoinOutcome::Panicked
            }
            Ok(Err(_)) => JoinOutcome::Aborted,
            Err(_) => {
                warn!("publishing loop did not stop in time, aborting");
                self.task.abort();
                // wait for the cancellation to land
                let _ = (&mut self.task).await;
                JoinOutcome::Aborted
            }
        };
        debug!(?outcome, "publishing loop joined");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_broker::MockBroker;
    use contracts::{topics, ScenarioSpec, SensorKind, TopicValue};
    use simulator::{MockConfig, MockSimulatorClient, SimulatorEndpoint};
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
    use telemetry::MapperOptions;

    /// Session stand-in: a flag and a distance accumulator
    #[derive(Default)]
    struct TestSession {
        running: AtomicBool,
        distance_bits: AtomicU64,
    }

    impl TestSession {
        fn running() -> Arc<Self> {
            let session = Self::default();
            session.running.store(true, Ordering::SeqCst);
            Arc::new(session)
        }

        fn stop(&self) {
            self.running.store(false, Ordering::SeqCst);
        }

        fn distance(&self) -> f64 {
            f64::from_bits(self.distance_bits.load(Ordering::SeqCst))
        }
    }

    impl SessionView for TestSession {
        fn simulation_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }

        fn add_trip_distance(&self, delta_km: f64) -> f64 {
            let total = self.distance() + delta_km;
            self.distance_bits.store(total.to_bits(), Ordering::SeqCst);
            total
        }
    }

    async fn ready_simulator(config: MockConfig) -> Arc<MockSimulatorClient> {
        let sim = MockSimulatorClient::with_config(config);
        sim.open(&SimulatorEndpoint::new("localhost", 64256))
            .await
            .unwrap();
        sim.load_scenario(&ScenarioSpec::default()).await.unwrap();
        sim.attach_sensor("ego", SensorKind::Electrics).await.unwrap();
        sim.start_scenario().await.unwrap();
        Arc::new(sim)
    }

    async fn connected_broker() -> Arc<MockBroker> {
        let broker = MockBroker::new();
        broker.connect().await.unwrap();
        Arc::new(broker)
    }

    fn settings(mapper: MapperOptions) -> LoopSettings {
        LoopSettings {
            vehicle_id: "ego".to_string(),
            period: Duration::from_millis(150),
            mapper,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_publishes_within_one_period() {
        let sim = ready_simulator(MockConfig::default()).await;
        let broker = connected_broker().await;
        let session = TestSession::running();

        let handle = PublisherHandle::spawn(
            sim,
            Arc::clone(&broker),
            session.clone(),
            settings(MapperOptions::default()),
            Arc::new(PublisherMetrics::new()),
        );
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(handle.is_active());
        assert!(broker.publish_count() >= 8);
        assert_eq!(broker.last_value(topics::GEAR), Some(TopicValue::Int(-1)));
        assert_eq!(broker.last_value(topics::SPEED_KMPH), Some(TopicValue::Int(72)));

        session.stop();
        assert_eq!(handle.join(Duration::from_secs(1)).await, JoinOutcome::Finished);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_publish_after_join() {
        let sim = ready_simulator(MockConfig::default()).await;
        let broker = connected_broker().await;
        let session = TestSession::running();

        let handle = PublisherHandle::spawn(
            sim,
            Arc::clone(&broker),
            session.clone(),
            settings(MapperOptions::default()),
            Arc::new(PublisherMetrics::new()),
        );
        tokio::time::sleep(Duration::from_millis(500)).await;
        session.stop();
        handle.join(Duration::from_secs(1)).await;

        let count = broker.publish_count();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(broker.publish_count(), count);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_failure_skips_one_cycle() {
        let sim = ready_simulator(MockConfig {
            fail_polls: vec![2],
            ..Default::default()
        })
        .await;
        let broker = connected_broker().await;
        let session = TestSession::running();
        let metrics = Arc::new(PublisherMetrics::new());

        let handle = PublisherHandle::spawn(
            Arc::clone(&sim),
            Arc::clone(&broker),
            session.clone(),
            settings(MapperOptions::default()),
            Arc::clone(&metrics),
        );
        // cycles at 0, 150 and 300 ms
        tokio::time::sleep(Duration::from_millis(350)).await;
        session.stop();
        handle.join(Duration::from_secs(1)).await;

        assert_eq!(metrics.poll_failures(), 1);
        assert_eq!(sim.poll_calls(), 3);
        // two good cycles of eight messages each
        assert_eq!(broker.publish_count(), 16);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_gear_still_publishes_other_fields() {
        let mut sample = MockSimulatorClient::cruising_sample();
        sample.gear = "S".to_string();
        let sim = ready_simulator(MockConfig {
            samples: vec![sample],
            ..Default::default()
        })
        .await;
        let broker = connected_broker().await;
        let session = TestSession::running();
        let metrics = Arc::new(PublisherMetrics::new());

        let handle = PublisherHandle::spawn(
            sim,
            Arc::clone(&broker),
            session.clone(),
            settings(MapperOptions::default()),
            Arc::clone(&metrics),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.stop();
        handle.join(Duration::from_secs(1)).await;

        assert!(broker.values_for(topics::GEAR).is_empty());
        assert_eq!(broker.values_for(topics::RPM).len(), 1);
        assert_eq!(metrics.mapping_failures(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distance_accumulates_from_second_poll() {
        let sim = ready_simulator(MockConfig::default()).await;
        let broker = connected_broker().await;
        let session = TestSession::running();

        let handle = PublisherHandle::spawn(
            sim,
            Arc::clone(&broker),
            session.clone(),
            settings(MapperOptions {
                publish_distance: true,
                extended_topics: false,
            }),
            Arc::new(PublisherMetrics::new()),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(session.distance(), 0.0);

        // 20 m/s for one period
        tokio::time::sleep(Duration::from_millis(150)).await;
        session.stop();
        handle.join(Duration::from_secs(1)).await;

        assert!((session.distance() - 0.003).abs() < 1e-6);
        assert_eq!(broker.last_value(topics::DISTANCE_KM), Some(TopicValue::Int(0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_aborts_stuck_loop() {
        let sim = ready_simulator(MockConfig {
            poll_delay: Some(Duration::from_secs(60)),
            ..Default::default()
        })
        .await;
        let broker = connected_broker().await;
        let session = TestSession::running();

        let handle = PublisherHandle::spawn(
            sim,
            Arc::clone(&broker),
            session.clone(),
            settings(MapperOptions::default()),
            Arc::new(PublisherMetrics::new()),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.stop();

        assert_eq!(handle.join(Duration::from_millis(500)).await, JoinOutcome::Aborted);
        assert_eq!(broker.publish_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_failures_do_not_abort_batch() {
        let sim = ready_simulator(MockConfig::default()).await;
        let broker = Arc::new(MockBroker::with_config(crate::mock_broker::MockBrokerConfig {
            fail_topics: vec![topics::FUEL],
            ..Default::default()
        }));
        broker.connect().await.unwrap();
        let session = TestSession::running();
        let metrics = Arc::new(PublisherMetrics::new());

        let handle = PublisherHandle::spawn(
            sim,
            Arc::clone(&broker),
            session.clone(),
            settings(MapperOptions::default()),
            Arc::clone(&metrics),
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.stop();
        handle.join(Duration::from_secs(1)).await;

        assert_eq!(metrics.publish_failures(), 1);
        assert_eq!(broker.publish_count(), 7);
    }
}
