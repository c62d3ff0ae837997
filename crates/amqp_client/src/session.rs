//! Broker operations a consuming session needs.

use crate::client::{ChannelClosed, TopologyConfig};
use crate::delivery::InboundDelivery;
use anyhow::Result;
use async_trait::async_trait;
use futures::Stream;
use std::fmt;

/// One live broker connection, as seen by a consumer.
///
/// [`crate::AmqpClient`] is the production implementation.
#[async_trait]
pub trait BrokerSession: Send + Sync + 'static {
    /// Channel handle the other operations run on.
    type Channel: Send + Sync;
    /// Message type yielded by [`BrokerSession::consume`].
    type Delivery: InboundDelivery;
    /// Error carried by the delivery stream.
    type Error: fmt::Display + Send + 'static;
    /// Manual-ack delivery stream.
    type Deliveries: Stream<Item = std::result::Result<Self::Delivery, Self::Error>>
        + Send
        + Unpin
        + 'static;

    /// Open a fresh channel.
    async fn open_channel(&self) -> Result<Self::Channel>;

    /// Declare the exchange, the queue and the binding.
    async fn declare_topology(&self, channel: &Self::Channel, config: &TopologyConfig) -> Result<()>;

    /// Register a manual-ack consumer on the configured queue.
    async fn consume(&self, channel: &Self::Channel, config: &TopologyConfig)
        -> Result<Self::Deliveries>;

    /// Subscribe to close notifications for `channel` and its connection.
    fn watch_close(&self, channel: &Self::Channel) -> ChannelClosed;

    /// Close the connection.
    async fn close(&self);
}
