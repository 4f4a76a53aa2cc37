//! # Integration Tests
//!
//! Cross-crate scenarios driven through the lifecycle controller with the
//! mock simulator and mock broker. No simulator or broker process needed.

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{BridgeBlueprint, ContractError, Pose};

    #[test]
    fn test_empty_config_is_reference_deployment() {
        let blueprint = ConfigLoader::load_from_str("", ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.simulator.port, 64256);
        assert_eq!(blueprint.broker.port, 1883);
        assert_eq!(blueprint.publisher.period_ms, 150);
        assert_eq!(blueprint.scenario.vehicle.spawn, Pose::reference_spawn());
    }

    #[test]
    fn test_rejects_zero_period() {
        let err = ConfigLoader::load_from_str("[publisher]\nperiod_ms = 0\n", ConfigFormat::Toml)
            .unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }

    #[test]
    fn test_rejects_non_unit_quaternion() {
        let mut blueprint = BridgeBlueprint::default();
        blueprint.scenario.vehicle.spawn.rotation.w = 2.0;
        let json = ConfigLoader::to_json(&blueprint).unwrap();

        let err = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, ContractError::ConfigValidation { .. }));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{topics, AutopilotMode, BridgeBlueprint, Pose, TelemetrySample, TopicValue};
    use controller::{ControllerError, ControllerStatus, LifecycleController};
    use publisher::{MockBroker, MockBrokerConfig};
    use simulator::{MockCall, MockConfig, MockSimulatorClient};

    type Controller = LifecycleController<MockSimulatorClient, MockBroker>;

    const CONFIG: &str = r#"
[simulator]
host = "sim.local"
port = 64256

[broker]
host = "broker.local"
port = 1883

[publisher]
period_ms = 150
publish_distance = true
"#;

    struct Rig {
        controller: Arc<Controller>,
        statuses: Arc<Mutex<Vec<ControllerStatus>>>,
    }

    impl Rig {
        fn new(sim: MockConfig, broker: MockBrokerConfig) -> Self {
            let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
            Self::with_blueprint(&blueprint, sim, broker)
        }

        fn with_blueprint(
            blueprint: &BridgeBlueprint,
            sim: MockConfig,
            broker: MockBrokerConfig,
        ) -> Self {
            let statuses = Arc::new(Mutex::new(Vec::new()));
            let sink = Arc::clone(&statuses);
            let controller = LifecycleController::new(
                Arc::new(MockSimulatorClient::with_config(sim)),
                Arc::new(MockBroker::with_config(broker)),
                blueprint,
            )
            .with_status_callback(Arc::new(move |status| sink.lock().unwrap().push(status)));
            Self {
                controller: Arc::new(controller),
                statuses,
            }
        }

        fn sim(&self) -> &MockSimulatorClient {
            self.controller.simulator()
        }

        fn broker(&self) -> &MockBroker {
            self.controller.broker()
        }

        fn statuses(&self) -> Vec<ControllerStatus> {
            self.statuses.lock().unwrap().clone()
        }
    }

    /// Config -> controller -> mock simulator -> mapper -> mock broker
    #[tokio::test(start_paused = true)]
    async fn test_e2e_mock_session() {
        let rig = Rig::new(MockConfig::default(), MockBrokerConfig::default());

        rig.controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(160)).await;

        let broker = rig.broker();
        assert!(broker.is_connected());
        assert_eq!(broker.last_value(topics::FUEL), Some(TopicValue::Float(0.75)));
        assert_eq!(broker.last_value(topics::RPM), Some(TopicValue::Int(2100)));
        assert_eq!(broker.last_value(topics::GEAR), Some(TopicValue::Int(-1)));
        assert_eq!(
            broker.last_value(topics::GEAR_A),
            Some(TopicValue::Text("4".to_string()))
        );
        assert_eq!(broker.last_value(topics::RUNNING), Some(TopicValue::Bool(true)));
        assert_eq!(broker.last_value(topics::SPEED_KMPH), Some(TopicValue::Int(72)));
        assert_eq!(broker.last_value(topics::SPEED_MPH), Some(TopicValue::Int(45)));
        assert!(broker.last_value(topics::TURN_SIGNAL).is_some());
        assert!(broker.last_value(topics::DISTANCE_KM).is_some());
        assert!(broker.last_value(topics::STEERING).is_none());

        let opened = rig
            .sim()
            .calls()
            .into_iter()
            .find_map(|call| match call {
                MockCall::Open(endpoint) => Some(endpoint),
                _ => None,
            })
            .unwrap();
        assert_eq!(opened.host, "sim.local");

        rig.controller.shutdown().await;
        assert!(!broker.is_connected());
        assert_eq!(
            rig.statuses(),
            vec![
                ControllerStatus::Loading,
                ControllerStatus::Loaded,
                ControllerStatus::Stopped,
                ControllerStatus::Closed,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_publish_after_stop() {
        let rig = Rig::new(MockConfig::default(), MockBrokerConfig::default());

        rig.controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        rig.controller.stop().await;

        let count = rig.broker().publish_count();
        assert!(count > 0);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(rig.broker().publish_count(), count);
        assert!(!rig.sim().is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_while_running_opens_once() {
        let rig = Rig::new(MockConfig::default(), MockBrokerConfig::default());

        rig.controller.start().await.unwrap();
        rig.controller.start().await.unwrap();

        assert_eq!(rig.sim().open_calls(), 1);
        assert!(rig.controller.session().simulation_running());
        rig.controller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_gear_keeps_other_topics() {
        let sample = TelemetrySample {
            gear: "M1".to_string(),
            fuel: 3.456,
            ..MockSimulatorClient::cruising_sample()
        };
        let rig = Rig::new(
            MockConfig {
                samples: vec![sample],
                ..Default::default()
            },
            MockBrokerConfig::default(),
        );

        rig.controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        rig.controller.stop().await;

        let broker = rig.broker();
        assert!(broker.values_for(topics::GEAR).is_empty());
        assert_eq!(broker.last_value(topics::FUEL), Some(TopicValue::Float(3.46)));
        assert_eq!(broker.last_value(topics::SPEED_KMPH), Some(TopicValue::Int(72)));
        assert!(rig.controller.metrics().mapping_failures() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_poll_failure_recovers() {
        let rig = Rig::new(
            MockConfig {
                fail_polls: vec![2],
                ..Default::default()
            },
            MockBrokerConfig::default(),
        );

        rig.controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(460)).await;
        rig.controller.stop().await;

        let metrics = rig.controller.metrics();
        assert_eq!(metrics.poll_failures(), 1);
        assert!(rig.sim().poll_calls() >= 3);
        assert!(rig.broker().values_for(topics::RPM).len() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_broker_publish_failure_is_counted() {
        let rig = Rig::new(
            MockConfig::default(),
            MockBrokerConfig {
                fail_topics: vec![topics::RPM],
                ..Default::default()
            },
        );

        rig.controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        rig.controller.stop().await;

        assert!(rig.broker().values_for(topics::RPM).is_empty());
        assert!(!rig.broker().values_for(topics::FUEL).is_empty());
        assert!(rig.controller.metrics().publish_failures() >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_with_autopilot_engaged() {
        let rig = Rig::new(MockConfig::default(), MockBrokerConfig::default());

        rig.controller.start().await.unwrap();
        assert!(rig.controller.toggle_autopilot().await.unwrap());

        let before = tokio::time::Instant::now();
        rig.controller.reset().await.unwrap();
        assert!(before.elapsed() >= Duration::from_secs(1));

        let session = rig.controller.session();
        assert!(session.simulation_running());
        assert!(!session.autopilot_running());
        assert!(rig.controller.is_publishing().await);

        let tail: Vec<MockCall> = rig
            .sim()
            .calls()
            .into_iter()
            .filter(|call| matches!(call, MockCall::SetAutopilot(..) | MockCall::Teleport(..)))
            .collect();
        assert_eq!(
            tail,
            vec![
                MockCall::SetAutopilot("ego".to_string(), AutopilotMode::Span),
                MockCall::SetAutopilot("ego".to_string(), AutopilotMode::Disabled),
                MockCall::Teleport("ego".to_string(), Pose::reference_spawn()),
            ]
        );

        rig.controller.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_releases_simulator() {
        let rig = Rig::new(
            MockConfig {
                fail_load: true,
                ..Default::default()
            },
            MockBrokerConfig::default(),
        );

        let err = rig.controller.start().await.unwrap_err();
        assert!(matches!(err, ControllerError::Simulator(_)));
        assert!(!rig.controller.session().simulation_running());
        assert!(!rig.controller.is_publishing().await);
        assert_eq!(rig.sim().close_calls(), 1);
        assert!(!rig.sim().is_connected());
        assert!(rig.statuses().last().is_some_and(ControllerStatus::is_error));
    }

    #[tokio::test(start_paused = true)]
    async fn test_operations_while_stopped() {
        let rig = Rig::new(MockConfig::default(), MockBrokerConfig::default());

        assert!(matches!(
            rig.controller.toggle_autopilot().await,
            Err(ControllerError::NotRunning { .. })
        ));
        assert!(matches!(
            rig.controller.reset().await,
            Err(ControllerError::NotRunning { .. })
        ));
        assert!(rig.sim().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_resets_trip_distance() {
        let rig = Rig::new(MockConfig::default(), MockBrokerConfig::default());

        rig.controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        rig.controller.stop().await;
        let first_trip = rig.controller.session().trip_distance_km();
        assert!(first_trip > 0.0);

        rig.broker().clear();
        rig.controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(rig.sim().open_calls(), 2);
        assert!(rig.controller.session().trip_distance_km() < first_trip);
        assert_eq!(
            rig.broker().values_for(topics::DISTANCE_KM).first(),
            Some(&TopicValue::Int(0))
        );
        rig.controller.stop().await;
    }
}
