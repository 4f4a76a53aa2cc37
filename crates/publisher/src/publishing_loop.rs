//! Publishing loop
//!
//! Once per period: poll the simulator, map the sample, publish the batch.
//! Failures inside a cycle are logged and counted; only a cleared running
//! flag ends the loop.

use std::sync::Arc;
use std::time::Duration;

use contracts::{BridgeBlueprint, PublisherConfig};
use simulator::SimulatorClient;
use telemetry::{MapError, MapperOptions, TelemetryMapper, TripOdometer};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

use crate::broker::BrokerClient;
use crate::metrics::PublisherMetrics;
use crate::session::SessionView;

/// Loop parameters
#[derive(Debug, Clone, PartialEq)]
pub struct LoopSettings {
    /// Vehicle to poll
    pub vehicle_id: String,
    pub period: Duration,
    pub mapper: MapperOptions,
}

impl LoopSettings {
    pub fn from_config(config: &PublisherConfig, vehicle_id: impl Into<String>) -> Self {
        Self {
            vehicle_id: vehicle_id.into(),
            period: config.period(),
            mapper: MapperOptions {
                publish_distance: config.publish_distance,
                extended_topics: config.extended_topics,
            },
        }
    }

    pub fn from_blueprint(blueprint: &BridgeBlueprint) -> Self {
        Self::from_config(&blueprint.publisher, blueprint.scenario.vehicle.id.clone())
    }
}

/// Everything one loop run needs
pub struct PublishingLoop<S, B> {
    simulator: Arc<S>,
    broker: Arc<B>,
    session: Arc<dyn SessionView>,
    settings: LoopSettings,
    metrics: Arc<PublisherMetrics>,
    mapper: TelemetryMapper,
    odometer: TripOdometer,
}

impl<S, B> PublishingLoop<S, B>
where
    S: SimulatorClient,
    B: BrokerClient + Send + Sync,
{
    pub fn new(
        simulator: Arc<S>,
        broker: Arc<B>,
        session: Arc<dyn SessionView>,
        settings: LoopSettings,
        metrics: Arc<PublisherMetrics>,
    ) -> Self {
        let mapper = TelemetryMapper::new(settings.mapper);
        Self {
            simulator,
            broker,
            session,
            settings,
            metrics,
            mapper,
            odometer: TripOdometer::new(),
        }
    }

    /// Run until the session stops
    #[instrument(
        name = "publishing_loop",
        skip(self),
        fields(vehicle_id = %self.settings.vehicle_id, period_ms = self.settings.period.as_millis() as u64)
    )]
    pub async fn run(mut self) {
        info!("publishing loop started");

        let mut ticker = tokio::time::interval(self.settings.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.session.simulation_running() {
                break;
            }
            self.run_cycle().await;
        }

        info!(
            cycles = self.metrics.cycles(),
            published = self.metrics.published(),
            "publishing loop stopped"
        );
    }

    /// One poll/map/publish cycle
    pub async fn run_cycle(&mut self) {
        let started = Instant::now();
        self.metrics.inc_cycles();
        let cycle = self.metrics.cycles();

        let sample = match self.simulator.poll_sensors(&self.settings.vehicle_id).await {
            Ok(sample) => {
                observability::record_poll(true);
                sample
            }
            Err(e) => {
                self.metrics.inc_poll_failures();
                observability::record_poll(false);
                warn!(cycle, error = %e, "sensor poll failed, skipping cycle");
                return;
            }
        };

        let delta_km = self
            .odometer
            .advance(Instant::now().into_std(), sample.wheel_speed_ms);
        let trip_km = self.session.add_trip_distance(delta_km);
        observability::record_trip_distance_km(trip_km);

        let batch = self.mapper.map(&sample, trip_km);
        for error in &batch.errors {
            self.metrics.inc_mapping_failures();
            match error {
                MapError::UnknownGearCode { code } => observability::record_unknown_gear(code),
            }
            warn!(cycle, topic = error.topic(), error = %error, "field not mapped");
        }

        for message in &batch.messages {
            match self.broker.publish(message).await {
                Ok(()) => {
                    self.metrics.inc_published();
                    observability::record_publish(message.topic, true);
                }
                Err(e) => {
                    self.metrics.inc_publish_failures();
                    observability::record_publish(message.topic, false);
                    warn!(cycle, topic = message.topic, error = %e, "publish failed");
                }
            }
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.metrics.record_cycle_ms(elapsed_ms);
        observability::record_cycle_duration_ms(elapsed_ms);
        debug!(cycle, messages = batch.messages.len(), elapsed_ms, "cycle done");
    }
}
