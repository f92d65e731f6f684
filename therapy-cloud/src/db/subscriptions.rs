use async_trait::async_trait;
use shared::{Role, SubscriptionRecord, SubscriptionStatus};
use sqlx::PgPool;
use uuid::Uuid;

use super::{DbResult, SubscriptionStore};

#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    user_id: Uuid,
    role: Option<String>,
    plan: String,
    status: String,
    external_customer_id: Option<String>,
    external_subscription_id: Option<String>,
    current_period_end: Option<i64>,
    updated_at: i64,
}

impl TryFrom<SubscriptionRow> for SubscriptionRecord {
    type Error = String;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = SubscriptionStatus::from_db(&row.status)
            .ok_or_else(|| format!("invalid subscription status in db: {}", row.status))?;
        Ok(SubscriptionRecord {
            user_id: row.user_id,
            role: row.role.as_deref().and_then(Role::from_db),
            plan: row.plan,
            status,
            external_customer_id: row.external_customer_id,
            external_subscription_id: row.external_subscription_id,
            current_period_end: row.current_period_end,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgSubscriptionStore {
    pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn find(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRecord>> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            "SELECT user_id, role, plan, status, external_customer_id,
                external_subscription_id, current_period_end, updated_at
             FROM subscription_records WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(SubscriptionRecord::try_from(row)?)),
            None => Ok(None),
        }
    }

    async fn upsert(&self, record: &SubscriptionRecord) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO subscription_records (user_id, role, plan, status, external_customer_id,
                external_subscription_id, current_period_end, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (user_id) DO UPDATE SET
                role = EXCLUDED.role, plan = EXCLUDED.plan, status = EXCLUDED.status,
                external_customer_id = EXCLUDED.external_customer_id,
                external_subscription_id = EXCLUDED.external_subscription_id,
                current_period_end = EXCLUDED.current_period_end,
                updated_at = EXCLUDED.updated_at",
        )
        .bind(record.user_id)
        .bind(record.role.map(|r| r.as_str()))
        .bind(&record.plan)
        .bind(record.status.as_str())
        .bind(&record.external_customer_id)
        .bind(&record.external_subscription_id)
        .bind(record.current_period_end)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn is_event_processed(&self, event_id: &str) -> DbResult<bool> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT event_id FROM processed_webhook_events WHERE event_id = $1")
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }

    async fn mark_event_processed(&self, event_id: &str, event_type: &str, now: i64) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
             VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(event_id)
        .bind(event_type)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
