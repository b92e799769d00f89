//! PostgreSQL implementation of MembershipRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use aeon_core::traits::{MembershipRepository, RepoResult};
use aeon_core::value_objects::{ChatId, UserId};

use super::error::map_db_error;

/// PostgreSQL implementation of MembershipRepository over `chat_members`
#[derive(Clone)]
pub struct PgMembershipRepository {
    pool: PgPool,
}

impl PgMembershipRepository {
    /// Create a new PgMembershipRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipRepository for PgMembershipRepository {
    #[instrument(skip(self))]
    async fn chat_ids_for_user(&self, user_id: UserId) -> RepoResult<Vec<ChatId>> {
        let chat_ids = sqlx::query_scalar::<_, i64>(
            r"
            SELECT chat_id::BIGINT FROM chat_members WHERE user_id = $1 ORDER BY chat_id
            ",
        )
        .bind(user_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(chat_ids.into_iter().map(ChatId::new).collect())
    }

    #[instrument(skip(self))]
    async fn is_member(&self, user_id: UserId, chat_id: ChatId) -> RepoResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(SELECT 1 FROM chat_members WHERE user_id = $1 AND chat_id = $2)
            ",
        )
        .bind(user_id.into_inner())
        .bind(chat_id.into_inner())
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }
}
