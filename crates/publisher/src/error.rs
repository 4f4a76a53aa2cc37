//! Broker error types

use thiserror::Error;

/// Broker collaborator error
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Broker unreachable or handshake refused
    #[error("failed to connect to broker at {endpoint}: {message}")]
    Connection { endpoint: String, message: String },

    /// `publish` called before `connect`
    #[error("broker not connected")]
    NotConnected,

    /// Message could not be handed to the broker
    #[error("failed to publish on '{topic}': {message}")]
    Publish { topic: String, message: String },
}

impl BrokerError {
    pub fn connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    pub fn publish(topic: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Publish {
            topic: topic.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, BrokerError>;
