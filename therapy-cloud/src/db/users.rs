use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DbResult, UserDirectory};

/// Reads the `users` and `dependent_links` tables owned by the account service
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_user_id_by_email(&self, email: &str) -> DbResult<Option<Uuid>> {
        let row: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE lower(email) = lower($1) LIMIT 1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|r| r.0))
    }

    async fn count_active_dependents(&self, owner_id: Uuid) -> DbResult<u32> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM dependent_links WHERE owner_id = $1 AND status = 'active'",
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}
