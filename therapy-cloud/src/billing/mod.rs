//! Subscription & entitlement synchronization
//!
//! [`BillingService`] owns the collaborators both writers share:
//! - [`ingest`]: push path, provider webhooks
//! - [`reconcile`]: pull path, user-initiated provider query
//!
//! Both compute the next [`SubscriptionRecord`](shared::SubscriptionRecord)
//! with the transitions in `shared::billing` and upsert it by user id; the
//! last writer wins.

pub mod ingest;
pub mod reconcile;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use shared::billing::{EntitlementsResponse, can_add_dependent, check_can_add_dependent};
use shared::{PlanCatalog, SubscriptionRecord};
use uuid::Uuid;

use crate::db::{SubscriptionStore, UserDirectory};
use crate::error::ServiceResult;
use crate::stripe::BillingProvider;

pub use ingest::IngestOutcome;

#[derive(Clone)]
pub struct BillingService {
    store: Arc<dyn SubscriptionStore>,
    users: Arc<dyn UserDirectory>,
    provider: Arc<dyn BillingProvider>,
    catalog: Arc<PlanCatalog>,
}

impl BillingService {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        users: Arc<dyn UserDirectory>,
        provider: Arc<dyn BillingProvider>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            store,
            users,
            provider,
            catalog,
        }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Stored record, or the implicit inactive/none record (not persisted)
    async fn current_record(&self, user_id: Uuid, now: i64) -> ServiceResult<SubscriptionRecord> {
        let existing = self.store.find(user_id).await?;
        Ok(SubscriptionRecord::existing_or_new(existing, user_id, now))
    }

    /// Caller's plan, status and capacity, resolved from the stored plan key
    pub async fn entitlements(&self, user_id: Uuid, now: i64) -> ServiceResult<EntitlementsResponse> {
        let record = self.current_record(user_id, now).await?;
        let ent = record.entitlements(&self.catalog);
        let active_dependents = self.users.count_active_dependents(user_id).await?;

        Ok(EntitlementsResponse {
            can_add_dependent: can_add_dependent(active_dependents, ent.max_dependents),
            plan: ent.plan,
            status: record.status,
            role: ent.role.or(record.role),
            features: ent.features.into_iter().collect(),
            max_dependents: ent.max_dependents,
            active_dependents,
        })
    }

    /// Capacity Guard for one more dependent of `user_id`
    ///
    /// Advisory: nothing is reserved, the caller links the dependent afterwards.
    pub async fn authorize_dependent(&self, user_id: Uuid, now: i64) -> ServiceResult<()> {
        let record = self.current_record(user_id, now).await?;
        let capacity = record.entitlements(&self.catalog).max_dependents;
        let active = self.users.count_active_dependents(user_id).await?;

        if let Err(e) = check_can_add_dependent(active, capacity) {
            tracing::info!(
                user_id = %user_id,
                plan = %record.plan,
                active,
                "Dependent capacity reached"
            );
            return Err(e.into());
        }
        Ok(())
    }
}
