//! PostgreSQL implementation of UserRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use aeon_core::traits::{RepoResult, UserRepository};
use aeon_core::value_objects::{TelegramId, UserId};

use super::error::map_db_error;

/// PostgreSQL implementation of UserRepository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new PgUserRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_id_by_telegram_id(&self, telegram_id: TelegramId) -> RepoResult<Option<UserId>> {
        let id = sqlx::query_scalar::<_, i64>(
            r"
            SELECT id::BIGINT FROM users WHERE telegram_id = $1
            ",
        )
        .bind(telegram_id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(id.map(UserId::new))
    }
}
