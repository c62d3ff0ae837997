//! Notification consumer: AMQP queue → WebSocket fan-out.
//!
//! Declares the broker topology, then drains one manual-ack delivery stream
//! through a fixed pool of workers. Each delivery is routed to its
//! recipient's connection (if any) and settled exactly once.

use crate::error::{GatewayError, Result};
use crate::protocol::{NotificationEvent, ServerMessage};
use crate::registry::ConnectionRegistry;
use amqp_client::{BrokerSession, InboundDelivery, TopologyConfig};
use futures::{Stream, StreamExt};
use metrics::counter;
use serde::Serialize;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Default size of the worker pool.
pub const DEFAULT_WORKERS: usize = 5;

/// How long in-flight deliveries may take to settle once shutdown is requested.
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the notification consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Exchange, queue, binding and consumer registration.
    pub topology: TopologyConfig,
    /// Number of workers pulling from the delivery stream.
    pub workers: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            topology: TopologyConfig::for_service("notifications", "events"),
            workers: DEFAULT_WORKERS,
        }
    }
}

/// Lifecycle of the consumer, observable through [`NotificationConsumer::subscribe_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerState {
    Disconnected,
    TopologyDeclared,
    Consuming,
    Reconnecting,
    /// Terminal: shut down, topology rejected, or restarts exhausted.
    Closed,
}

impl ConsumerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::TopologyDeclared => "topology_declared",
            Self::Consuming => "consuming",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a single delivery was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Queued on the recipient's connection; acked.
    Delivered,
    /// Recipient has no live connection; acked.
    RecipientOffline,
    /// Recipient's queue was full or closed; acked.
    WriteFailed,
    /// Body did not decode; rejected without requeue.
    Rejected,
}

/// Why a consuming session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumerExit {
    /// The broker closed the channel or connection.
    ChannelClosed(String),
    /// The delivery stream ended without a close notification.
    StreamEnded,
    /// The shutdown token was cancelled.
    Shutdown,
}

/// Restart schedule for [`NotificationConsumer::supervise`].
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay before the first restart.
    pub initial_delay: Duration,
    /// Upper bound for the exponential delay.
    pub max_delay: Duration,
    /// Consecutive failed restarts tolerated before giving up. `None` retries forever.
    pub max_restarts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_restarts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before restart number `restart` (0-based).
    pub fn delay_for(&self, restart: u32) -> Duration {
        let factor = 2u32.saturating_pow(restart.min(16));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

/// Routes broker notifications to registered connections.
pub struct NotificationConsumer {
    registry: Arc<ConnectionRegistry>,
    config: ConsumerConfig,
    state: watch::Sender<ConsumerState>,
}

impl NotificationConsumer {
    /// Create a new consumer in the `Disconnected` state.
    pub fn new(registry: Arc<ConnectionRegistry>, config: ConsumerConfig) -> Self {
        let (state, _) = watch::channel(ConsumerState::Disconnected);
        Self {
            registry,
            config,
            state,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConsumerState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<ConsumerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: ConsumerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Consumer state {} -> {}", previous, state);
        }
    }

    /// Run one consuming session on `client`.
    ///
    /// Topology failures surface as [`GatewayError::Topology`] and leave the
    /// consumer `Closed`.
    pub async fn run<B: BrokerSession>(
        self: &Arc<Self>,
        client: &B,
        shutdown: CancellationToken,
    ) -> Result<ConsumerExit> {
        let topology = &self.config.topology;
        let channel = client.open_channel().await.map_err(GatewayError::Broker)?;

        if let Err(e) = client.declare_topology(&channel, topology).await {
            self.set_state(ConsumerState::Closed);
            return Err(GatewayError::Topology(e));
        }
        self.set_state(ConsumerState::TopologyDeclared);

        let mut closed = client.watch_close(&channel);
        let deliveries = client
            .consume(&channel, topology)
            .await
            .map_err(GatewayError::Broker)?;

        Ok(self
            .consume(deliveries, async move { closed.recv().await }, shutdown)
            .await)
    }

    /// Drain `deliveries` with the worker pool until the stream ends, `closed`
    /// resolves, or `shutdown` is cancelled.
    ///
    /// On shutdown workers stop pulling and in-flight deliveries are settled
    /// within [`SHUTDOWN_DRAIN_TIMEOUT`]. On a broker close workers are
    /// aborted, since their acks can no longer reach the broker.
    pub async fn consume<S, D, E, C>(
        self: &Arc<Self>,
        deliveries: S,
        closed: C,
        shutdown: CancellationToken,
    ) -> ConsumerExit
    where
        S: Stream<Item = std::result::Result<D, E>> + Send + Unpin + 'static,
        D: InboundDelivery,
        E: fmt::Display + Send + 'static,
        C: Future<Output = String> + Send,
    {
        let workers = self.config.workers.max(1);
        let deliveries = Arc::new(Mutex::new(deliveries));

        let stop = CancellationToken::new();

        let mut pool = JoinSet::new();
        for worker_id in 0..workers {
            let consumer = Arc::clone(self);
            let deliveries = Arc::clone(&deliveries);
            let stop = stop.clone();
            pool.spawn(async move { consumer.worker(worker_id, deliveries, stop).await });
        }

        self.set_state(ConsumerState::Consuming);
        info!("NotificationConsumer running with {} workers", workers);

        tokio::pin!(closed);
        let exit = loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("NotificationConsumer received shutdown signal");
                    break ConsumerExit::Shutdown;
                }

                reason = &mut closed => {
                    warn!("Broker channel closed: {}", reason);
                    break ConsumerExit::ChannelClosed(reason);
                }

                joined = pool.join_next() => match joined {
                    Some(Err(e)) if e.is_panic() => error!("Consumer worker panicked: {}", e),
                    Some(_) if !pool.is_empty() => {}
                    _ => {
                        warn!("Delivery stream ended");
                        break ConsumerExit::StreamEnded;
                    }
                }
            }
        };

        stop.cancel();
        if exit == ConsumerExit::Shutdown {
            let drained = tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, async {
                while pool.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!("Workers did not settle within {:?}, aborting", SHUTDOWN_DRAIN_TIMEOUT);
            }
        }
        pool.abort_all();
        while pool.join_next().await.is_some() {}

        self.set_state(match exit {
            ConsumerExit::Shutdown => ConsumerState::Closed,
            _ => ConsumerState::Disconnected,
        });
        info!("NotificationConsumer stopped: {:?}", exit);
        exit
    }

    async fn worker<S, D, E>(
        &self,
        worker_id: usize,
        deliveries: Arc<Mutex<S>>,
        stop: CancellationToken,
    ) where
        S: Stream<Item = std::result::Result<D, E>> + Unpin,
        D: InboundDelivery,
        E: fmt::Display,
    {
        loop {
            // Lock is held only while taking the next delivery. A delivery
            // already taken is always settled before `stop` is checked again.
            let next = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                next = async { deliveries.lock().await.next().await } => next,
            };
            match next {
                Some(Ok(delivery)) => {
                    self.handle_delivery(&delivery).await;
                }
                Some(Err(e)) => {
                    warn!("Worker {} delivery stream error: {}", worker_id, e);
                    break;
                }
                None => break,
            }
        }
        debug!("Worker {} finished", worker_id);
    }

    /// Route one delivery and settle it.
    #[tracing::instrument(level = "debug", skip_all, fields(delivery_tag = delivery.delivery_tag()))]
    pub async fn handle_delivery<D: InboundDelivery + ?Sized>(&self, delivery: &D) -> DeliveryOutcome {
        counter!("gateway_notifications_received_total").increment(1);

        let event = match NotificationEvent::decode(delivery.payload()) {
            Ok(event) => event,
            Err(e) => {
                error!(
                    "Malformed notification (tag {}, redelivered {}): {}",
                    delivery.delivery_tag(),
                    delivery.redelivered(),
                    e
                );
                counter!("gateway_notifications_rejected_total").increment(1);
                if let Err(e) = delivery.reject(false).await {
                    warn!("Failed to reject delivery {}: {:#}", delivery.delivery_tag(), e);
                }
                return DeliveryOutcome::Rejected;
            }
        };

        let outcome = self.dispatch(event);

        if let Err(e) = delivery.ack().await {
            warn!("Failed to ack delivery {}: {:#}", delivery.delivery_tag(), e);
        }
        outcome
    }

    fn dispatch(&self, event: NotificationEvent) -> DeliveryOutcome {
        let Some(conn) = self.registry.lookup(&event.recipient_id) else {
            debug!("Recipient {} offline, dropping {:?}", event.recipient_id, event.kind);
            counter!("gateway_notifications_dropped_total", "reason" => "offline").increment(1);
            return DeliveryOutcome::RecipientOffline;
        };

        match conn.send(&ServerMessage::Notification(event)) {
            Ok(()) => {
                counter!("gateway_notifications_delivered_total").increment(1);
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                debug!("Failed to write to connection {}: {}", conn.id, e);
                counter!("gateway_notifications_dropped_total", "reason" => "write_failed")
                    .increment(1);
                DeliveryOutcome::WriteFailed
            }
        }
    }

    /// Keep the consumer running on `client`, obtaining a new session from
    /// `reconnect` after broker-side closes per `policy`.
    ///
    /// Returns `Ok` on shutdown. Topology errors and exhausted restarts are
    /// returned as errors with the consumer left `Closed`.
    pub async fn supervise<B, F, Fut>(
        self: Arc<Self>,
        client: B,
        mut reconnect: F,
        policy: ReconnectPolicy,
        shutdown: CancellationToken,
    ) -> Result<()>
    where
        B: BrokerSession,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = anyhow::Result<B>> + Send,
    {
        let mut client = Some(client);
        let mut failures: u32 = 0;

        loop {
            let session = match client.take() {
                Some(client) => Ok(client),
                None => reconnect().await.map_err(GatewayError::Broker),
            };

            match session {
                Ok(amqp) => {
                    let result = self.run(&amqp, shutdown.clone()).await;
                    amqp.close().await;
                    match result {
                        Ok(ConsumerExit::Shutdown) => return Ok(()),
                        Ok(exit) => {
                            warn!("Consumer session ended: {:?}", exit);
                            failures = 0;
                        }
                        Err(GatewayError::Topology(e)) => {
                            error!("Broker topology rejected, consumer closed: {:#}", e);
                            self.set_state(ConsumerState::Closed);
                            return Err(GatewayError::Topology(e));
                        }
                        Err(e) => {
                            warn!("Consumer session failed: {}", e);
                            failures += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!("Broker reconnect failed: {}", e);
                    failures += 1;
                }
            }

            if let Some(max) = policy.max_restarts {
                if failures > max {
                    self.set_state(ConsumerState::Closed);
                    return Err(GatewayError::Broker(anyhow::anyhow!(
                        "gave up after {} consecutive restarts",
                        max
                    )));
                }
            }

            let delay = policy.delay_for(failures.saturating_sub(1));
            self.set_state(ConsumerState::Reconnecting);
            info!("Restarting consumer in {:?}", delay);

            tokio::select! {
                _ = shutdown.cancelled() => {
                    self.set_state(ConsumerState::Closed);
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
