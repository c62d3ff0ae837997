//! AMQP client implementation over lapin.

use crate::session::BrokerSession;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lapin::message::Delivery;
use lapin::options::{
    BasicConsumeOptions, BasicQosOptions, ExchangeDeclareOptions, QueueBindOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Channel, Connection, ConnectionProperties, Consumer, ExchangeKind};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Default number of unacknowledged deliveries the broker may push to one consumer.
pub const DEFAULT_PREFETCH: u16 = 50;

/// Exchange/queue/binding topology plus consumer registration settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyConfig {
    /// Durable direct exchange the notification service publishes to.
    pub exchange: String,
    /// Durable queue consumed by this gateway.
    pub queue: String,
    /// Routing key binding the queue to the exchange.
    pub binding_key: String,
    /// Tag the consumer registers with.
    pub consumer_tag: String,
    /// QoS bound on unacked deliveries held by the consumer.
    pub prefetch: u16,
}

impl TopologyConfig {
    /// Topology for a service, named `{service}.{kind}` for the exchange and
    /// `{service}.{kind}.queue` for the queue.
    pub fn for_service(service: &str, kind: &str) -> Self {
        Self {
            exchange: format!("{}.{}", service, kind),
            queue: format!("{}.{}.queue", service, kind),
            binding_key: kind.to_string(),
            consumer_tag: format!("{}-consumer", service),
            prefetch: DEFAULT_PREFETCH,
        }
    }

    /// Set the consumer prefetch bound.
    pub fn with_prefetch(mut self, prefetch: u16) -> Self {
        self.prefetch = prefetch;
        self
    }
}

/// Receives the reason a channel or its connection went away.
pub struct ChannelClosed {
    rx: mpsc::UnboundedReceiver<String>,
}

impl ChannelClosed {
    /// Create a notifier and the sender that reports close reasons to it.
    pub fn pair() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Wait for the first close/error notification.
    pub async fn recv(&mut self) -> String {
        self.rx
            .recv()
            .await
            .unwrap_or_else(|| "close notifier dropped".to_string())
    }
}

/// Wrapper around a lapin connection.
pub struct AmqpClient {
    connection: Connection,
}

impl AmqpClient {
    /// Connect to an AMQP broker.
    pub async fn connect(uri: &str) -> Result<Self> {
        info!("Connecting to AMQP broker");
        let connection = Connection::connect(
            uri,
            ConnectionProperties::default().with_connection_name("notification-gateway".into()),
        )
        .await
        .context("failed to connect to AMQP broker")?;
        info!("Connected to AMQP broker");

        Ok(Self { connection })
    }
}

#[async_trait]
impl BrokerSession for AmqpClient {
    type Channel = Channel;
    type Delivery = Delivery;
    type Error = lapin::Error;
    type Deliveries = Consumer;

    async fn open_channel(&self) -> Result<Channel> {
        self.connection
            .create_channel()
            .await
            .context("failed to open AMQP channel")
    }

    /// Declarations are idempotent on the broker; re-running against an
    /// existing, compatible topology is a no-op.
    async fn declare_topology(&self, channel: &Channel, config: &TopologyConfig) -> Result<()> {
        info!(
            "Declaring topology: exchange '{}', queue '{}', binding key '{}'",
            config.exchange, config.queue, config.binding_key
        );

        channel
            .exchange_declare(
                &config.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("failed to declare exchange '{}'", config.exchange))?;

        let queue = channel
            .queue_declare(
                &config.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("failed to declare queue '{}'", config.queue))?;

        channel
            .queue_bind(
                queue.name().as_str(),
                &config.exchange,
                &config.binding_key,
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .with_context(|| {
                format!(
                    "failed to bind queue '{}' to exchange '{}'",
                    config.queue, config.exchange
                )
            })?;

        info!("Topology ready ({} messages waiting)", queue.message_count());
        Ok(())
    }

    async fn consume(&self, channel: &Channel, config: &TopologyConfig) -> Result<Consumer> {
        channel
            .basic_qos(config.prefetch, BasicQosOptions::default())
            .await
            .context("failed to set consumer prefetch")?;

        let consumer = channel
            .basic_consume(
                &config.queue,
                &config.consumer_tag,
                BasicConsumeOptions {
                    no_ack: false,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("failed to start consuming '{}'", config.queue))?;

        info!(
            "Consuming '{}' as '{}' (prefetch {})",
            config.queue, config.consumer_tag, config.prefetch
        );
        Ok(consumer)
    }

    fn watch_close(&self, channel: &Channel) -> ChannelClosed {
        let (tx, closed) = ChannelClosed::pair();

        let channel_tx = tx.clone();
        channel.on_error(move |err| {
            warn!("AMQP channel error: {}", err);
            let _ = channel_tx.send(format!("channel closed: {}", err));
        });

        self.connection.on_error(move |err| {
            warn!("AMQP connection error: {}", err);
            let _ = tx.send(format!("connection closed: {}", err));
        });

        closed
    }

    async fn close(&self) {
        if let Err(e) = self.connection.close(200, "gateway shutting down").await {
            warn!("Error closing AMQP connection: {}", e);
        }
    }
}
