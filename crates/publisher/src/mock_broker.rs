//! Mock broker
//!
//! Records every published message and can be told to fail.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{PublishedMessage, TopicValue};

use crate::broker::BrokerClient;
use crate::error::{BrokerError, Result};

/// Mock broker configuration (failure injection)
#[derive(Debug, Default, Clone)]
pub struct MockBrokerConfig {
    pub fail_connect: bool,
    pub fail_disconnect: bool,
    /// Topics whose publishes always fail
    pub fail_topics: Vec<&'static str>,
    /// 1-based publish attempt numbers that fail
    pub fail_attempts: Vec<u64>,
    /// Delay applied inside every publish
    pub publish_delay: Option<Duration>,
}

/// Mock broker client
#[derive(Default)]
pub struct MockBroker {
    config: MockBrokerConfig,
    connected: AtomicBool,
    attempts: AtomicU64,
    connect_calls: AtomicU64,
    disconnect_calls: AtomicU64,
    published: Mutex<Vec<PublishedMessage>>,
}

impl MockBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MockBrokerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Successfully published messages, in order
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.messages().clone()
    }

    pub fn publish_count(&self) -> usize {
        self.messages().len()
    }

    /// Publish attempts, including failed ones
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn connect_calls(&self) -> u64 {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> u64 {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Values published on `topic`, in order
    pub fn values_for(&self, topic: &str) -> Vec<TopicValue> {
        self.messages()
            .iter()
            .filter(|m| m.topic == topic)
            .map(|m| m.value.clone())
            .collect()
    }

    pub fn last_value(&self, topic: &str) -> Option<TopicValue> {
        self.values_for(topic).pop()
    }

    pub fn clear(&self) {
        self.messages().clear();
    }

    fn messages(&self) -> MutexGuard<'_, Vec<PublishedMessage>> {
        self.published.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BrokerClient for MockBroker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn connect(&self) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.config.fail_connect {
            return Err(BrokerError::connection("mock", "mock failure"));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&self, message: &PublishedMessage) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.is_connected() {
            return Err(BrokerError::NotConnected);
        }
        if let Some(delay) = self.config.publish_delay {
            tokio::time::sleep(delay).await;
        }
        if self.config.fail_attempts.contains(&attempt)
            || self.config.fail_topics.contains(&message.topic)
        {
            return Err(BrokerError::publish(message.topic, "mock failure"));
        }
        self.messages().push(message.clone());
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        self.connected.store(false, Ordering::SeqCst);
        if self.config.fail_disconnect {
            return Err(BrokerError::connection("mock", "mock disconnect failure"));
        }
        Ok(())
    }
}
