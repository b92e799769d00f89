//! Repository traits (ports) - define the interface for data access
//!
//! The gateway never queries storage directly. It asks these ports for the
//! user behind a Telegram account and for durable chat membership, and the
//! infrastructure layer provides the implementation.

use async_trait::async_trait;

use crate::error::DomainError;
use crate::value_objects::{ChatId, TelegramId, UserId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find the user registered for a Telegram account
    async fn find_id_by_telegram_id(&self, telegram_id: TelegramId) -> RepoResult<Option<UserId>>;
}

// ============================================================================
// Membership Repository
// ============================================================================

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    /// List every chat the user is a durable member of
    async fn chat_ids_for_user(&self, user_id: UserId) -> RepoResult<Vec<ChatId>>;

    /// Check durable membership of a user in a chat
    async fn is_member(&self, user_id: UserId, chat_id: ChatId) -> RepoResult<bool>;
}
