//! # Publisher
//!
//! Telemetry publishing.
//!
//! - `BrokerClient` abstraction with MQTT, log-only and mock implementations
//! - The periodic poll/map/publish loop
//! - `PublisherHandle` owning the loop task, with bounded join
//! - Per-loop counters mirrored to the `metrics` registry

pub mod broker;
pub mod error;
pub mod handle;
pub mod log_broker;
pub mod metrics;
pub mod mock_broker;
pub mod mqtt;
pub mod publishing_loop;
pub mod session;

pub use broker::{BrokerClient, LocalBrokerClient};
pub use error::{BrokerError, Result};
pub use handle::{JoinOutcome, PublisherHandle};
pub use log_broker::LogBroker;
pub use metrics::{MetricsSnapshot, PublisherMetrics};
pub use mock_broker::{MockBroker, MockBrokerConfig};
pub use mqtt::MqttBroker;
pub use publishing_loop::{LoopSettings, PublishingLoop};
pub use session::SessionView;
