//! In-process directory
//!
//! Implements the user and membership ports over plain maps. Used by tests and
//! by local runs of the gateway without PostgreSQL.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};

use aeon_core::error::DomainError;
use aeon_core::traits::{MembershipRepository, RepoResult, UserRepository};
use aeon_core::value_objects::{ChatId, TelegramId, UserId};

#[derive(Debug, Default)]
struct Directory {
    users: HashMap<TelegramId, UserId>,
    memberships: HashMap<UserId, BTreeSet<ChatId>>,
}

/// In-memory users and durable chat memberships
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    inner: RwLock<Directory>,
    unavailable: AtomicBool,
    latency: Mutex<Duration>,
}

impl MemoryDirectory {
    /// Create an empty directory
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user under a Telegram account
    pub fn add_user(&self, telegram_id: TelegramId, user_id: UserId) {
        self.inner.write().users.insert(telegram_id, user_id);
    }

    /// Record durable membership of a user in a chat
    pub fn add_member(&self, chat_id: ChatId, user_id: UserId) {
        self.inner
            .write()
            .memberships
            .entry(user_id)
            .or_default()
            .insert(chat_id);
    }

    /// Remove durable membership of a user in a chat
    pub fn remove_member(&self, chat_id: ChatId, user_id: UserId) {
        let mut inner = self.inner.write();
        if let Some(chats) = inner.memberships.get_mut(&user_id) {
            chats.remove(&chat_id);
            if chats.is_empty() {
                inner.memberships.remove(&user_id);
            }
        }
    }

    /// Make every lookup fail with a database error (simulates an outage)
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every lookup by `latency` (simulates a slow database)
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    async fn check_available(&self) -> RepoResult<()> {
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError(
                "directory unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryDirectory {
    async fn find_id_by_telegram_id(&self, telegram_id: TelegramId) -> RepoResult<Option<UserId>> {
        self.check_available().await?;
        Ok(self.inner.read().users.get(&telegram_id).copied())
    }
}

#[async_trait]
impl MembershipRepository for MemoryDirectory {
    async fn chat_ids_for_user(&self, user_id: UserId) -> RepoResult<Vec<ChatId>> {
        self.check_available().await?;
        Ok(self
            .inner
            .read()
            .memberships
            .get(&user_id)
            .map(|chats| chats.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn is_member(&self, user_id: UserId, chat_id: ChatId) -> RepoResult<bool> {
        self.check_available().await?;
        Ok(self
            .inner
            .read()
            .memberships
            .get(&user_id)
            .is_some_and(|chats| chats.contains(&chat_id)))
    }
}
