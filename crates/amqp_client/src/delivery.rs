//! Acknowledgement surface of a broker delivery.

use anyhow::Result;
use async_trait::async_trait;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicRejectOptions};

/// A message handed to a consumer that must be settled exactly once.
#[async_trait]
pub trait InboundDelivery: Send + Sync + 'static {
    /// Raw message body.
    fn payload(&self) -> &[u8];

    /// Broker-assigned delivery tag (unique per channel).
    fn delivery_tag(&self) -> u64;

    /// Whether the broker flagged this as a redelivery.
    fn redelivered(&self) -> bool {
        false
    }

    /// Positively acknowledge; the broker drops the message.
    async fn ack(&self) -> Result<()>;

    /// Negatively acknowledge. With `requeue = false` the broker discards
    /// (or dead-letters) the message.
    async fn reject(&self, requeue: bool) -> Result<()>;
}

#[async_trait]
impl InboundDelivery for Delivery {
    fn payload(&self) -> &[u8] {
        &self.data
    }

    fn delivery_tag(&self) -> u64 {
        self.delivery_tag
    }

    fn redelivered(&self) -> bool {
        self.redelivered
    }

    async fn ack(&self) -> Result<()> {
        self.acker.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn reject(&self, requeue: bool) -> Result<()> {
        self.acker.reject(BasicRejectOptions { requeue }).await?;
        Ok(())
    }
}
