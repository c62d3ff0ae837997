//! Connection registry: principal → live WebSocket connection.
//!
//! Uses a sharded DashMap so broker workers can look up recipients without
//! contending with connection setup and teardown. No I/O happens while a
//! shard is locked; sends go through each connection's bounded queue.

use crate::error::{GatewayError, Result};
use crate::protocol::ServerMessage;
use axum::extract::ws::Message;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Unique connection handle identifier.
pub type ConnectionId = Uuid;

/// Default buffer size for per-connection outbound queues.
/// A client this far behind is treated as unable to receive.
pub const CLIENT_CHANNEL_BUFFER_SIZE: usize = 256;

/// One authenticated WebSocket connection.
pub struct ClientConnection {
    /// Handle identity; distinguishes two connections of the same principal.
    pub id: ConnectionId,
    /// Authenticated principal owning the connection.
    pub principal_id: String,
    /// Outbound frames, drained by the connection's writer task.
    tx: mpsc::Sender<Message>,
    /// Timestamp when the connection was registered (ms).
    pub connected_at: i64,
    /// Timestamp of last client liveness signal (ms).
    last_ping: AtomicI64,
    /// Cancelled when the server wants this connection gone.
    closed: CancellationToken,
}

impl ClientConnection {
    /// Create a connection for `principal_id` writing into `tx`.
    pub fn new(principal_id: impl Into<String>, tx: mpsc::Sender<Message>) -> Self {
        let now = Utc::now().timestamp_millis();
        Self {
            id: Uuid::new_v4(),
            principal_id: principal_id.into(),
            tx,
            connected_at: now,
            last_ping: AtomicI64::new(now),
            closed: CancellationToken::new(),
        }
    }

    /// Serialize and queue a message for this client.
    /// Never waits: a full or closed queue is an error.
    pub fn send(&self, msg: &ServerMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.send_text(json)
    }

    /// Queue an already serialized JSON frame.
    pub fn send_text(&self, json: String) -> Result<()> {
        self.try_send_raw(Message::Text(json.into()))
    }

    /// Queue a raw frame (ping/pong/close).
    pub fn try_send_raw(&self, msg: Message) -> Result<()> {
        self.tx.try_send(msg).map_err(|_| GatewayError::ChannelSend)
    }

    /// Record client liveness.
    pub fn touch(&self) {
        self.last_ping
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    /// Last liveness timestamp (ms).
    pub fn last_ping_time(&self) -> i64 {
        self.last_ping.load(Ordering::Relaxed)
    }

    /// Ask the connection task to shut down.
    pub fn close(&self) {
        self.closed.cancel();
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once `close` has been called.
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("principal_id", &self.principal_id)
            .field("connected_at", &self.connected_at)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Registry of live connections, at most one per principal.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<ClientConnection>>,
}

impl ConnectionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `conn`, replacing any entry for the same principal.
    ///
    /// Returns the displaced handle. It is not closed here; the caller decides.
    pub fn add(&self, conn: Arc<ClientConnection>) -> Option<Arc<ClientConnection>> {
        let displaced = self.connections.insert(conn.principal_id.clone(), conn.clone());
        match &displaced {
            Some(old) => info!(
                "Connection {} replaced {} for principal {}",
                conn.id, old.id, conn.principal_id
            ),
            None => info!("Connection {} registered for principal {}", conn.id, conn.principal_id),
        }
        displaced
    }

    /// Remove `conn` if it is still the registered handle for its principal.
    ///
    /// A newer connection for the same principal is left in place.
    pub fn remove(&self, conn: &ClientConnection) -> bool {
        let removed = self
            .connections
            .remove_if(&conn.principal_id, |_, current| current.id == conn.id)
            .is_some();
        if removed {
            info!("Connection {} unregistered", conn.id);
        } else {
            debug!("Connection {} already superseded, nothing removed", conn.id);
        }
        removed
    }

    /// Current connection for `principal_id`, if any.
    pub fn lookup(&self, principal_id: &str) -> Option<Arc<ClientConnection>> {
        self.connections.get(principal_id).map(|r| r.clone())
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Remove and close connections without a liveness signal for `max_idle`.
    /// Returns how many were closed.
    pub fn close_stale(&self, max_idle: Duration) -> usize {
        let cutoff = Utc::now().timestamp_millis() - max_idle.as_millis() as i64;

        let stale: Vec<Arc<ClientConnection>> = self
            .connections
            .iter()
            .filter(|entry| entry.value().last_ping_time() < cutoff)
            .map(|entry| entry.value().clone())
            .collect();

        let mut closed = 0;
        for conn in stale {
            if self.remove(&conn) {
                warn!("Closing stale connection {} ({})", conn.id, conn.principal_id);
                conn.close();
                closed += 1;
            }
        }
        closed
    }

    /// Signal every registered connection to close.
    pub fn close_all(&self) {
        let all: Vec<Arc<ClientConnection>> =
            self.connections.iter().map(|e| e.value().clone()).collect();
        info!("Closing {} connections", all.len());
        for conn in all {
            conn.close();
        }
    }
}
