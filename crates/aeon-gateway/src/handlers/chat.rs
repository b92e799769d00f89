//! Chat frame handlers (join, leave, typing)
//!
//! Joining and typing are checked against durable membership first, so a client
//! can only subscribe to, or signal typing in, chats it belongs to. Leaving is
//! never checked: a user removed from a chat must still be able to unsubscribe.

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::server::GatewayState;
use aeon_core::ChatId;

/// Handles frames addressed to a chat
pub struct ChatHandler;

impl ChatHandler {
    /// Subscribe the connection's user to a chat
    pub async fn join(
        state: &GatewayState,
        connection: &Connection,
        chat_id: ChatId,
    ) -> HandlerResult<()> {
        Self::ensure_member(state, connection, chat_id).await?;
        state.registry().join_chat(connection.user_id(), chat_id);
        Ok(())
    }

    /// Unsubscribe the connection's user from a chat
    pub fn leave(state: &GatewayState, connection: &Connection, chat_id: ChatId) {
        state.registry().leave_chat(connection.user_id(), chat_id);
    }

    /// Relay a typing indicator to the chat's other subscribers
    pub async fn typing(
        state: &GatewayState,
        connection: &Connection,
        chat_id: ChatId,
        is_typing: bool,
    ) -> HandlerResult<()> {
        Self::ensure_member(state, connection, chat_id).await?;
        state
            .router()
            .notify_typing(chat_id, connection.user_id(), is_typing)
            .await;
        Ok(())
    }

    async fn ensure_member(
        state: &GatewayState,
        connection: &Connection,
        chat_id: ChatId,
    ) -> HandlerResult<()> {
        if chat_id.is_zero() {
            return Err(HandlerError::InvalidChat(chat_id));
        }
        let user_id = connection.user_id();
        if state.memberships().is_member(user_id, chat_id).await? {
            Ok(())
        } else {
            Err(HandlerError::NotMember { user_id, chat_id })
        }
    }
}
