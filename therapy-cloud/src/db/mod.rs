//! Persistence seams
//!
//! PostgreSQL implementations back production; [`memory`] backs tests and
//! local runs without a database.

pub mod memory;
pub mod subscriptions;
pub mod users;

use async_trait::async_trait;
use shared::SubscriptionRecord;
use uuid::Uuid;

use crate::error::BoxError;

pub use memory::{MemoryStore, MemoryUserDirectory};
pub use subscriptions::PgSubscriptionStore;
pub use users::PgUserDirectory;

pub type DbResult<T> = Result<T, BoxError>;

/// Subscription Record Store, keyed by user id
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn find(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRecord>>;

    /// Insert or overwrite the user's single record
    async fn upsert(&self, record: &SubscriptionRecord) -> DbResult<()>;

    async fn is_event_processed(&self, event_id: &str) -> DbResult<bool>;

    async fn mark_event_processed(&self, event_id: &str, event_type: &str, now: i64) -> DbResult<()>;
}

/// User directory collaborator (read-only)
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Internal user id for an email (case-insensitive)
    async fn find_user_id_by_email(&self, email: &str) -> DbResult<Option<Uuid>>;

    /// Active dependents counted against the owner's capacity
    async fn count_active_dependents(&self, owner_id: Uuid) -> DbResult<u32>;
}
