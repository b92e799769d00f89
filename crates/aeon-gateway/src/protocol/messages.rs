//! Server event envelopes
//!
//! Every event pushed to a client is one JSON object tagged by `type`.
//! Events are serialized once and the resulting [`Frame`] is shared between
//! all recipients of a fan-out.

use std::sync::Arc;

use aeon_core::{ChatId, MessageId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Serialized event text, cheap to clone across recipients
pub type Frame = Arc<str>;

/// An event pushed from the gateway to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent once to a freshly registered connection
    ConnectionEstablished { user_id: UserId, message: String },

    /// A chat participant started or stopped typing
    Typing {
        chat_id: ChatId,
        user_id: UserId,
        is_typing: bool,
    },

    /// A message was persisted in a chat; the payload is passed through as-is
    NewMessage { chat_id: ChatId, message: Value },

    /// A message was read by a participant
    MessageRead {
        message_id: MessageId,
        chat_id: ChatId,
        user_id: UserId,
    },

    /// A user came online or went offline
    UserStatus { user_id: UserId, is_online: bool },

    /// Reply to a client `ping`
    Pong,
}

impl ServerEvent {
    /// Greeting sent on successful registration
    #[must_use]
    pub fn connection_established(user_id: UserId) -> Self {
        Self::ConnectionEstablished {
            user_id,
            message: "WebSocket connection established".to_string(),
        }
    }

    /// Wire name of the event, as found in the `type` field
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::ConnectionEstablished { .. } => "connection_established",
            Self::Typing { .. } => "typing",
            Self::NewMessage { .. } => "new_message",
            Self::MessageRead { .. } => "message_read",
            Self::UserStatus { .. } => "user_status",
            Self::Pong => "pong",
        }
    }

    /// Serialize into a shareable frame
    pub fn to_frame(&self) -> Result<Frame, serde_json::Error> {
        serde_json::to_string(self).map(Frame::from)
    }

    /// Parse an event from JSON text (client-side and test use)
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
