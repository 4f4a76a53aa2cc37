//! LifecycleController - start, stop, autopilot and reset
//!
//! Operations are serialized by an async mutex so the shell can fire them
//! from any task. The publishing loop runs on its own task and only sees
//! the session through `LoopView`.

use std::sync::Arc;
use std::time::Duration;

use contracts::{AutopilotMode, BridgeBlueprint, ScenarioSpec};
use publisher::{BrokerClient, LoopSettings, MetricsSnapshot, PublisherHandle, PublisherMetrics};
use simulator::{LaunchTimeouts, ScenarioLauncher, SimulatorClient, SimulatorEndpoint};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ControllerError, Result};
use crate::session::{LoopView, SessionSnapshot, SessionState};
use crate::status::{ignore_status, ControllerStatus, StatusCallback};

/// Everything the shell may want to show
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub session: SessionSnapshot,
    pub publishing: bool,
    pub metrics: MetricsSnapshot,
}

/// Lifecycle controller
pub struct LifecycleController<S, B>
where
    S: SimulatorClient + 'static,
    B: BrokerClient + Send + Sync + 'static,
{
    simulator: Arc<S>,
    broker: Arc<B>,
    launcher: ScenarioLauncher<S>,
    endpoint: SimulatorEndpoint,
    scenario: ScenarioSpec,
    loop_settings: LoopSettings,
    join_timeout: Duration,
    autopilot_settle: Duration,
    session: Arc<SessionState>,
    metrics: Arc<PublisherMetrics>,
    publisher: Mutex<Option<PublisherHandle>>,
    op_lock: Mutex<()>,
    on_status: StatusCallback,
}

impl<S, B> LifecycleController<S, B>
where
    S: SimulatorClient + 'static,
    B: BrokerClient + Send + Sync + 'static,
{
    pub fn new(simulator: Arc<S>, broker: Arc<B>, blueprint: &BridgeBlueprint) -> Self {
        let launcher = ScenarioLauncher::new(
            Arc::clone(&simulator),
            LaunchTimeouts::from_config(&blueprint.simulator),
        );
        Self {
            simulator,
            broker,
            launcher,
            endpoint: SimulatorEndpoint::new(
                blueprint.simulator.host.clone(),
                blueprint.simulator.port,
            ),
            scenario: blueprint.scenario.clone(),
            loop_settings: LoopSettings::from_blueprint(blueprint),
            join_timeout: blueprint.publisher.join_timeout(),
            autopilot_settle: blueprint.controller.autopilot_settle(),
            session: Arc::new(SessionState::new()),
            metrics: Arc::new(PublisherMetrics::new()),
            publisher: Mutex::new(None),
            op_lock: Mutex::new(()),
            on_status: ignore_status(),
        }
    }

    /// Receive every status transition through `callback`
    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.on_status = callback;
        self
    }

    pub fn session(&self) -> &Arc<SessionState> {
        &self.session
    }

    pub fn metrics(&self) -> &Arc<PublisherMetrics> {
        &self.metrics
    }

    pub fn simulator(&self) -> &Arc<S> {
        &self.simulator
    }

    pub fn broker(&self) -> &Arc<B> {
        &self.broker
    }

    /// Whether a publishing loop task is alive
    pub async fn is_publishing(&self) -> bool {
        self.publisher
            .lock()
            .await
            .as_ref()
            .is_some_and(PublisherHandle::is_active)
    }

    pub async fn status(&self) -> StatusReport {
        StatusReport {
            session: self.session.snapshot(),
            publishing: self.is_publishing().await,
            metrics: self.metrics.snapshot(),
        }
    }

    /// Bring the simulation up and start publishing
    ///
    /// No-op when already running. On failure the session stays stopped,
    /// whatever was acquired is released and an error status is emitted.
    #[instrument(name = "controller_start", skip(self), fields(scenario = %self.scenario.name))]
    pub async fn start(&self) -> Result<()> {
        let _op = self.op_lock.lock().await;
        if self.session.simulation_running() {
            debug!("start ignored, simulation already running");
            return Ok(());
        }

        self.emit(ControllerStatus::Loading);

        if let Err(e) = self.broker.connect().await {
            return Err(self.fail_start(e.into()));
        }
        if let Err(e) = self.launcher.launch(&self.endpoint, &self.scenario).await {
            return Err(self.fail_start(e.into()));
        }

        self.session.reset_trip();
        self.session.set_simulation_running(true);
        self.ensure_publisher().await;
        self.record_session();

        info!("simulation started");
        self.emit(ControllerStatus::Loaded);
        Ok(())
    }

    /// Stop publishing, then stop the scenario and close the simulator
    ///
    /// No-op when not running. Teardown failures are logged only.
    #[instrument(name = "controller_stop", skip(self))]
    pub async fn stop(&self) {
        let _op = self.op_lock.lock().await;
        if !self.session.simulation_running() {
            debug!("stop ignored, simulation not running");
            return;
        }

        self.session.set_simulation_running(false);
        self.record_session();

        if let Some(handle) = self.publisher.lock().await.take() {
            let outcome = handle.join(self.join_timeout).await;
            debug!(?outcome, "publisher stopped");
        }
        self.launcher.teardown().await;

        info!(
            trip_distance_km = self.session.trip_distance_km(),
            "simulation stopped"
        );
        self.emit(ControllerStatus::Stopped);
    }

    /// Engage or disengage the simulator autopilot
    ///
    /// Returns the new autopilot state. The flag flips only after the
    /// simulator accepted the command.
    #[instrument(name = "controller_toggle_autopilot", skip(self))]
    pub async fn toggle_autopilot(&self) -> Result<bool> {
        let _op = self.op_lock.lock().await;
        self.require_running("toggle autopilot")?;

        let engage = !self.session.autopilot_running();
        let mode = if engage {
            AutopilotMode::Span
        } else {
            AutopilotMode::Disabled
        };

        if let Err(e) = self
            .simulator
            .set_autopilot_mode(&self.scenario.vehicle.id, mode)
            .await
        {
            return Err(self.fail_operation("toggle autopilot", e.into()));
        }

        self.session.set_autopilot_running(engage);
        self.record_session();
        info!(mode = mode.as_str(), "autopilot mode set");
        self.emit(ControllerStatus::AutopilotChanged { engaged: engage });
        Ok(engage)
    }

    /// Put the vehicle back on its spawn pose
    ///
    /// Autopilot is disengaged first and given time to let go of the
    /// vehicle. The publishing loop is restarted if it had exited.
    #[instrument(name = "controller_reset", skip(self))]
    pub async fn reset(&self) -> Result<()> {
        let _op = self.op_lock.lock().await;
        self.require_running("reset")?;

        let vehicle_id = &self.scenario.vehicle.id;
        if self.session.autopilot_running() {
            if let Err(e) = self
                .simulator
                .set_autopilot_mode(vehicle_id, AutopilotMode::Disabled)
                .await
            {
                return Err(self.fail_operation("reset", e.into()));
            }
            self.session.set_autopilot_running(false);
            self.record_session();
            self.emit(ControllerStatus::AutopilotChanged { engaged: false });
            tokio::time::sleep(self.autopilot_settle).await;
        }

        if let Err(e) = self
            .simulator
            .teleport(vehicle_id, self.scenario.vehicle.spawn)
            .await
        {
            return Err(self.fail_operation("reset", e.into()));
        }

        self.ensure_publisher().await;
        info!("vehicle reset to spawn pose");
        self.emit(ControllerStatus::VehicleReset);
        Ok(())
    }

    /// Stop everything and disconnect the broker
    #[instrument(name = "controller_shutdown", skip(self))]
    pub async fn shutdown(&self) {
        self.stop().await;

        let _op = self.op_lock.lock().await;
        if let Err(e) = self.broker.disconnect().await {
            error!(broker = self.broker.name(), error = %e, "failed to disconnect broker");
        }
        info!(metrics = %self.metrics.snapshot(), "bridge shut down");
        self.emit(ControllerStatus::Closed);
    }

    /// Spawn the publishing loop unless one is alive
    async fn ensure_publisher(&self) {
        let mut slot = self.publisher.lock().await;
        if slot.as_ref().is_some_and(PublisherHandle::is_active) {
            return;
        }
        if let Some(finished) = slot.take() {
            // reap the exited task
            finished.join(Duration::ZERO).await;
            warn!("publishing loop had exited, restarting");
        }

        *slot = Some(PublisherHandle::spawn(
            Arc::clone(&self.simulator),
            Arc::clone(&self.broker),
            Arc::new(LoopView::new(Arc::clone(&self.session))),
            self.loop_settings.clone(),
            Arc::clone(&self.metrics),
        ));
    }

    fn require_running(&self, operation: &'static str) -> Result<()> {
        if self.session.simulation_running() {
            Ok(())
        } else {
            Err(ControllerError::not_running(operation))
        }
    }

    fn fail_start(&self, e: ControllerError) -> ControllerError {
        error!(error = %e, "failed to start simulation");
        self.emit(ControllerStatus::LoadFailed(e.to_string()));
        e
    }

    fn fail_operation(&self, operation: &'static str, e: ControllerError) -> ControllerError {
        error!(operation, error = %e, "operation failed");
        self.emit(ControllerStatus::OperationFailed {
            operation,
            message: e.to_string(),
        });
        e
    }

    fn record_session(&self) {
        observability::record_session_state(
            self.session.simulation_running(),
            self.session.autopilot_running(),
        );
    }

    fn emit(&self, status: ControllerStatus) {
        (self.on_status)(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{topics, Pose};
    use publisher::MockBroker;
    use simulator::{MockCall, MockConfig, MockSimulatorClient};
    use std::sync::Mutex as StdMutex;

    type TestController = LifecycleController<MockSimulatorClient, MockBroker>;

    fn blueprint() -> BridgeBlueprint {
        let mut blueprint = BridgeBlueprint::default();
        blueprint.publisher.period_ms = 100;
        blueprint
    }

    fn controller_with(config: MockConfig) -> (Arc<TestController>, Arc<StdMutex<Vec<ControllerStatus>>>) {
        let statuses = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&statuses);
        let controller = LifecycleController::new(
            Arc::new(MockSimulatorClient::with_config(config)),
            Arc::new(MockBroker::new()),
            &blueprint(),
        )
        .with_status_callback(Arc::new(move |status| sink.lock().unwrap().push(status)));
        (Arc::new(controller), statuses)
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_then_stop() {
        let (controller, statuses) = controller_with(MockConfig::default());

        controller.start().await.unwrap();
        assert!(controller.session().simulation_running());
        assert!(controller.is_publishing().await);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(controller.broker().publish_count() > 0);

        controller.stop().await;
        assert!(!controller.session().simulation_running());
        assert!(!controller.is_publishing().await);
        assert!(!controller.simulator().is_connected());

        let count = controller.broker().publish_count();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(controller.broker().publish_count(), count);

        assert_eq!(
            *statuses.lock().unwrap(),
            vec![
                ControllerStatus::Loading,
                ControllerStatus::Loaded,
                ControllerStatus::Stopped
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let (controller, _) = controller_with(MockConfig::default());
        controller.start().await.unwrap();
        controller.start().await.unwrap();

        assert_eq!(controller.simulator().open_calls(), 1);
        controller.stop().await;
        controller.stop().await;
        assert_eq!(controller.simulator().close_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_start_releases_connection() {
        let (controller, statuses) = controller_with(MockConfig {
            fail_start: true,
            ..Default::default()
        });

        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, ControllerError::Simulator(_)));
        assert!(!controller.session().simulation_running());
        assert!(!controller.is_publishing().await);
        assert_eq!(controller.simulator().close_calls(), 1);
        assert!(statuses.lock().unwrap().last().is_some_and(ControllerStatus::is_error));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_timeout_surfaces_as_timeout() {
        let (controller, _) = controller_with(MockConfig {
            open_delay: Some(Duration::from_secs(120)),
            ..Default::default()
        });

        let err = controller.start().await.unwrap_err();
        assert!(matches!(err, ControllerError::Timeout { .. }));
        assert!(!controller.session().simulation_running());
    }

    #[tokio::test]
    async fn test_operations_require_running() {
        let (controller, _) = controller_with(MockConfig::default());

        assert!(matches!(
            controller.toggle_autopilot().await.unwrap_err(),
            ControllerError::NotRunning { .. }
        ));
        assert!(matches!(
            controller.reset().await.unwrap_err(),
            ControllerError::NotRunning { .. }
        ));
        assert!(controller.simulator().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_autopilot() {
        let (controller, _) = controller_with(MockConfig::default());
        controller.start().await.unwrap();

        assert!(controller.toggle_autopilot().await.unwrap());
        assert!(controller.session().autopilot_running());
        assert!(!controller.toggle_autopilot().await.unwrap());
        assert!(!controller.session().autopilot_running());

        let modes: Vec<_> = controller
            .simulator()
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::SetAutopilot(_, mode) => Some(mode),
                _ => None,
            })
            .collect();
        assert_eq!(modes, vec![AutopilotMode::Span, AutopilotMode::Disabled]);
        controller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_autopilot_flag_unchanged_on_failure() {
        let (controller, _) = controller_with(MockConfig {
            fail_autopilot: true,
            ..Default::default()
        });
        controller.start().await.unwrap();

        assert!(controller.toggle_autopilot().await.is_err());
        assert!(!controller.session().autopilot_running());
        controller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_disengages_autopilot_first() {
        let (controller, _) = controller_with(MockConfig::default());
        controller.start().await.unwrap();
        controller.toggle_autopilot().await.unwrap();

        let before = tokio::time::Instant::now();
        controller.reset().await.unwrap();
        assert!(before.elapsed() >= Duration::from_secs(1));

        let calls = controller.simulator().calls();
        let disable = calls
            .iter()
            .position(|c| *c == MockCall::SetAutopilot("ego".into(), AutopilotMode::Disabled))
            .unwrap();
        let teleport = calls
            .iter()
            .position(|c| *c == MockCall::Teleport("ego".into(), Pose::reference_spawn()))
            .unwrap();
        assert!(disable < teleport);
        assert!(!controller.session().autopilot_running());
        assert!(controller.is_publishing().await);
        controller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_disconnects_broker() {
        let (controller, statuses) = controller_with(MockConfig::default());
        controller.start().await.unwrap();
        controller.shutdown().await;

        assert!(!controller.broker().is_connected());
        assert_eq!(controller.broker().disconnect_calls(), 1);
        assert_eq!(statuses.lock().unwrap().last(), Some(&ControllerStatus::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trip_distance_restarts_at_zero() {
        let (controller, _) = controller_with(MockConfig::default());
        controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(550)).await;
        assert!(controller.session().trip_distance_km() > 0.0);
        controller.stop().await;

        controller.start().await.unwrap();
        assert_eq!(controller.session().trip_distance_km(), 0.0);
        assert!(controller.broker().last_value(topics::RPM).is_some());
        controller.stop().await;
    }
}
