//! BrokerClient trait - publishing loop output interface

use contracts::PublishedMessage;

use crate::error::Result;

/// Message broker client
///
/// Methods take `&self` so one client can be shared by the controller and
/// the publishing loop.
#[trait_variant::make(BrokerClient: Send)]
pub trait LocalBrokerClient {
    /// Client name (used for logging)
    fn name(&self) -> &str;

    /// Connect to the broker
    ///
    /// Idempotent: returns Ok when already connected
    async fn connect(&self) -> Result<()>;

    /// Publish one message
    async fn publish(&self, message: &PublishedMessage) -> Result<()>;

    /// Disconnect from the broker
    ///
    /// Idempotent: returns Ok when not connected
    async fn disconnect(&self) -> Result<()>;
}
