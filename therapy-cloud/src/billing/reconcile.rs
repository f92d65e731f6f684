//! On-Demand Reconciliation
//!
//! Pulls the caller's subscription straight from the provider and upserts
//! the record the same way ingestion does. Active subscriptions win over
//! trialing ones; a trialing subscription is stored and reported as such.

use shared::billing::{PLAN_UNKNOWN, ReconcileResponse, SubscriptionStatus};
use shared::util::millis_to_rfc3339;
use uuid::Uuid;

use super::BillingService;
use crate::error::ServiceResult;
use crate::stripe::Subscription;

/// Provider statuses queried, in order of preference
const LIVE_STATUSES: [SubscriptionStatus; 2] =
    [SubscriptionStatus::Active, SubscriptionStatus::Trialing];

impl BillingService {
    /// Reconcile the caller's record with the provider
    ///
    /// A user with no provider customer gets the not-subscribed result and
    /// no record is written.
    pub async fn reconcile(
        &self,
        user_id: Uuid,
        email: &str,
        now: i64,
    ) -> ServiceResult<ReconcileResponse> {
        let Some(customer) = self.provider.find_customer_by_email(email).await? else {
            tracing::debug!(user_id = %user_id, "No provider customer, never subscribed");
            return Ok(ReconcileResponse::not_subscribed());
        };

        let subscription = self.find_live_subscription(&customer.id).await?;
        let mut record = self.current_record(user_id, now).await?;

        let Some(sub) = subscription else {
            record.apply_no_subscription(&customer.id, now);
            self.store.upsert(&record).await?;
            tracing::info!(
                user_id = %user_id,
                customer_id = %customer.id,
                "Reconciled: no live subscription"
            );
            return Ok(ReconcileResponse::not_subscribed());
        };

        let change = sub.to_change();
        record.apply_subscription(&change, &self.catalog, now);
        self.store.upsert(&record).await?;

        if record.plan == PLAN_UNKNOWN {
            tracing::warn!(
                user_id = %user_id,
                product_id = change.product_id.as_deref().unwrap_or(""),
                "Subscription product not in plan catalog"
            );
        }
        tracing::info!(
            user_id = %user_id,
            plan = %record.plan,
            status = %record.status,
            "Reconciled subscription"
        );

        Ok(ReconcileResponse {
            subscribed: record.status.is_entitled(),
            plan: record.plan.clone(),
            product_id: change.product_id,
            subscription_end: record.current_period_end.and_then(millis_to_rfc3339),
        })
    }

    async fn find_live_subscription(&self, customer_id: &str) -> ServiceResult<Option<Subscription>> {
        for status in LIVE_STATUSES {
            let subs = self
                .provider
                .list_subscriptions(customer_id, status.as_str())
                .await?;
            if let Some(sub) = subs.into_iter().next() {
                return Ok(Some(sub));
            }
        }
        Ok(None)
    }
}
