//! LogBroker - logs messages via tracing instead of sending them

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use contracts::PublishedMessage;
use tracing::{info, instrument};

use crate::broker::BrokerClient;
use crate::error::{BrokerError, Result};

/// Broker that writes every message to the log, for dry runs
pub struct LogBroker {
    name: String,
    connected: AtomicBool,
    published: AtomicU64,
}

impl LogBroker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            connected: AtomicBool::new(false),
            published: AtomicU64::new(0),
        }
    }

    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}

impl BrokerClient for LogBroker {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_broker_connect", skip(self), fields(broker = %self.name))]
    async fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::SeqCst);
        info!("LogBroker connected");
        Ok(())
    }

    async fn publish(&self, message: &PublishedMessage) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(BrokerError::NotConnected);
        }
        self.published.fetch_add(1, Ordering::Relaxed);
        info!(
            broker = %self.name,
            topic = message.topic,
            payload = %message.value,
            "publish"
        );
        Ok(())
    }

    #[instrument(name = "log_broker_disconnect", skip(self), fields(broker = %self.name))]
    async fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::SeqCst) {
            info!(published = self.published(), "LogBroker disconnected");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{topics, TopicValue};

    #[tokio::test]
    async fn test_log_broker_publish() {
        let broker = LogBroker::new("dry-run");
        let msg = PublishedMessage::new(topics::RPM, TopicValue::Int(2100));

        assert!(broker.publish(&msg).await.is_err());
        broker.connect().await.unwrap();
        broker.publish(&msg).await.unwrap();
        broker.disconnect().await.unwrap();
        broker.disconnect().await.unwrap();
        assert_eq!(broker.published(), 1);
    }
}
