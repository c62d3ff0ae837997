//! Notification gateway: real-time delivery of backend notifications to
//! authenticated WebSocket clients.
//!
//! This service:
//! - Accepts WebSocket connections authenticated by bearer token
//! - Keeps at most one live connection per principal
//! - Consumes notification events from an AMQP queue
//! - Pushes each event to its recipient's connection, if online
//! - Fronts the backend services through retrying, traced RPC channels
//!
//! ## Architecture
//!
//! ```text
//! notification service → AMQP exchange (direct, durable)
//!         ↓
//! NotificationConsumer (worker pool, manual acks)
//!         ↓
//! ConnectionRegistry (DashMap, principal → connection)
//!         ↓
//! WebSocket clients ──(mark_read / read_all)──→ Services → rpc_client → backends
//! ```

pub mod auth;
pub mod config;
pub mod consumer;
pub mod domain;
pub mod error;
pub mod observability;
pub mod proto;
pub mod protocol;
pub mod registry;
pub mod services;
pub mod ws_server;

pub use auth::{AuthError, TokenVerifier};
pub use config::{GatewayConfig, Mode, ServicesConfig};
pub use consumer::{
    ConsumerConfig, ConsumerExit, ConsumerState, DeliveryOutcome, NotificationConsumer,
    ReconnectPolicy,
};
pub use error::{GatewayError, Result};
pub use protocol::{ClientMessage, NotificationEvent, NotificationKind, ServerMessage};
pub use registry::{ClientConnection, ConnectionId, ConnectionRegistry};
pub use services::Services;
pub use ws_server::{create_router, spawn_stale_sweeper, AppState};
