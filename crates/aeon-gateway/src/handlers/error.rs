//! Handler error types
//!
//! A failing client frame is logged and dropped; none of these close the
//! socket.

use aeon_core::{ChatId, DomainError, UserId};
use thiserror::Error;

/// Handler error type
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Frame names a chat id that cannot exist
    #[error("Invalid chat id: {0}")]
    InvalidChat(ChatId),

    /// User is not a durable member of the chat
    #[error("User {user_id} is not a member of chat {chat_id}")]
    NotMember { user_id: UserId, chat_id: ChatId },

    /// Membership lookup failed
    #[error("Directory error: {0}")]
    Directory(#[from] DomainError),
}

impl HandlerError {
    /// Whether the failure is the client's doing rather than ours
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidChat(_) | Self::NotMember { .. })
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;
