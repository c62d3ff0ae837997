//! AMQP client wrapper used by the gateway's notification consumer.
//!
//! Provides:
//! - Connection setup and channel creation
//! - Idempotent topology declaration (durable direct exchange, durable queue, binding)
//! - Manual-acknowledgement consumers
//! - [`InboundDelivery`], the ack/reject surface the consumer works against
//! - [`BrokerSession`], the per-connection operations a consumer drives

pub mod client;
pub mod delivery;
pub mod session;

pub use client::{AmqpClient, ChannelClosed, TopologyConfig, DEFAULT_PREFETCH};
pub use delivery::InboundDelivery;
pub use session::BrokerSession;
