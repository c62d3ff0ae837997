//! Wire formats: notification events from the broker, and the JSON frames
//! exchanged with WebSocket clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Broker → Gateway
// ============================================================================

/// Kind of notification published by the notification service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A followed user posted a tweet.
    NewTweet,
    /// Someone commented on the recipient's tweet.
    NewComment,
    /// Someone subscribed to the recipient.
    NewSubscriber,
    /// The recipient was mentioned.
    Mention,
}

/// Notification event carried in a broker message body.
///
/// `recipient_id`, `sender_id` and `kind` are mandatory; a body missing any
/// of them, or carrying an unknown kind, does not decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    /// Principal the event is addressed to.
    pub recipient_id: String,
    /// Principal that caused the event.
    pub sender_id: String,
    /// Notification kind.
    pub kind: NotificationKind,
    /// Short display payload; opaque to the gateway.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Backend identifier, when the notification was persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<String>,
    /// Creation time assigned by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl NotificationEvent {
    /// Decode a broker message body.
    pub fn decode(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }
}

// ============================================================================
// Client → Server Messages
// ============================================================================

/// Message sent from client to server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keepalive.
    Ping,
    /// Mark one notification as read.
    MarkRead { notification_id: String },
    /// Mark every notification as read.
    ReadAll,
}

// ============================================================================
// Server → Client Messages
// ============================================================================

/// Message sent from server to client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A notification addressed to this client.
    Notification(NotificationEvent),
    /// Pong response to ping.
    Pong,
    /// Confirmation of `mark_read`.
    MarkedRead { notification_id: String },
    /// Confirmation of `read_all`.
    AllRead,
    /// Error message.
    Error {
        /// Error message.
        message: String,
        /// Error code.
        code: String,
    },
}
