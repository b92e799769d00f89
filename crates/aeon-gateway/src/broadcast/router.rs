//! Event router
//!
//! Domain-level notifications built on top of the connection registry. The
//! REST layer calls these after persisting a change; the socket layer calls
//! them for typing and presence.

use crate::connection::{Connection, ConnectionRegistry, DisconnectOutcome};
use crate::protocol::ServerEvent;
use aeon_core::{ChatId, MessageId, UserId};
use serde_json::Value;
use std::sync::Arc;

/// Routes domain events to chat subscribers
#[derive(Debug, Clone)]
pub struct EventRouter {
    registry: Arc<ConnectionRegistry>,
}

impl EventRouter {
    /// Create a router over a shared registry
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Get the underlying registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Tell the other subscribers of a chat that `user_id` is (not) typing
    pub async fn notify_typing(&self, chat_id: ChatId, user_id: UserId, is_typing: bool) -> usize {
        let event = ServerEvent::Typing {
            chat_id,
            user_id,
            is_typing,
        };
        self.registry
            .send_to_chat(&event, chat_id, Some(user_id))
            .await
    }

    /// Push a persisted message to every subscriber of its chat, sender included
    pub async fn notify_new_message(&self, chat_id: ChatId, message: Value) -> usize {
        let event = ServerEvent::NewMessage { chat_id, message };
        self.registry.send_to_chat(&event, chat_id, None).await
    }

    /// Tell the other subscribers of a chat that `user_id` read a message
    pub async fn notify_message_read(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        user_id: UserId,
    ) -> usize {
        let event = ServerEvent::MessageRead {
            message_id,
            chat_id,
            user_id,
        };
        self.registry
            .send_to_chat(&event, chat_id, Some(user_id))
            .await
    }

    /// Announce a presence change to everyone sharing a chat with the user
    ///
    /// Each recipient gets the event once no matter how many chats they share.
    pub async fn notify_presence(&self, user_id: UserId, is_online: bool) -> usize {
        let chats = self.registry.user_chats(user_id);
        self.broadcast_presence(user_id, is_online, &chats).await
    }

    /// Remove a connection and, if the user went offline, announce it
    ///
    /// The offline event goes to the chats the user was subscribed to at the
    /// moment of removal.
    pub async fn disconnect(&self, connection: &Connection) -> DisconnectOutcome {
        let outcome = self.registry.disconnect(connection);
        if let DisconnectOutcome::WentOffline { chats } = &outcome {
            self.broadcast_presence(connection.user_id(), false, chats)
                .await;
        }
        outcome
    }

    async fn broadcast_presence(&self, user_id: UserId, is_online: bool, chats: &[ChatId]) -> usize {
        if chats.is_empty() {
            return 0;
        }
        let event = ServerEvent::UserStatus { user_id, is_online };
        let sent = self
            .registry
            .send_to_chats(&event, chats, Some(user_id))
            .await;

        tracing::debug!(
            user_id = %user_id,
            is_online,
            chats = chats.len(),
            sent,
            "Presence broadcast"
        );

        sent
    }
}
