//! Billing Event Ingestion
//!
//! Applies one verified webhook event to the owning user's record. Every
//! handler recomputes the record from the event alone (plus whatever is
//! stored), so redelivery after a partial failure is safe.

use shared::billing::{PLAN_UNKNOWN, SubscriptionRecord, SubscriptionStatus};
use shared::error::{AppError, ErrorCode};
use uuid::Uuid;

use super::BillingService;
use crate::error::ServiceResult;
use crate::stripe::types::Expandable;
use crate::stripe::{BillingEvent, Invoice, Subscription, WebhookEvent};

/// What ingestion did with an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Record upserted
    Applied {
        user_id: Uuid,
        status: SubscriptionStatus,
        plan: String,
    },
    /// Provider customer has no local account
    Untracked,
    /// Known category that intentionally changes nothing
    NoOp,
    /// Event type billing sync does not handle
    Ignored,
    /// Event id already applied
    Duplicate,
}

impl BillingService {
    /// Apply a signature-verified webhook event
    pub async fn ingest(&self, event: &WebhookEvent, now: i64) -> ServiceResult<IngestOutcome> {
        if self.store.is_event_processed(&event.id).await? {
            tracing::info!(event_id = %event.id, "Duplicate webhook event, skipping");
            return Ok(IngestOutcome::Duplicate);
        }

        let billing_event = event.billing_event().map_err(|e| {
            tracing::warn!(event_id = %event.id, event_type = %event.event_type, %e, "Malformed webhook object");
            AppError::with_message(ErrorCode::WebhookPayloadInvalid, e.to_string())
        })?;

        let outcome = match billing_event {
            BillingEvent::SubscriptionCreated(sub) | BillingEvent::SubscriptionUpdated(sub) => {
                self.apply_subscription_event(&sub, now).await?
            }
            BillingEvent::SubscriptionDeleted(sub) => self.apply_subscription_deleted(&sub, now).await?,
            BillingEvent::InvoicePaymentFailed(invoice) => {
                self.apply_payment_failed(&invoice, now).await?
            }
            // subscription.updated carries the authoritative state for the cycle
            BillingEvent::InvoicePaymentSucceeded(_) => IngestOutcome::NoOp,
            BillingEvent::Ignored => {
                tracing::debug!(event_type = %event.event_type, "Unhandled webhook event type");
                return Ok(IngestOutcome::Ignored);
            }
        };

        self.store
            .mark_event_processed(&event.id, &event.event_type, now)
            .await?;

        Ok(outcome)
    }

    /// customer.subscription.created / updated
    async fn apply_subscription_event(
        &self,
        sub: &Subscription,
        now: i64,
    ) -> ServiceResult<IngestOutcome> {
        let Some(user_id) = self.resolve_subscription_owner(sub).await? else {
            return Ok(IngestOutcome::Untracked);
        };

        let mut record = self.current_record(user_id, now).await?;
        record.apply_subscription(&sub.to_change(), &self.catalog, now);

        if record.plan == PLAN_UNKNOWN {
            tracing::warn!(
                user_id = %user_id,
                product_id = sub.product_id().unwrap_or(""),
                "Subscription product not in plan catalog"
            );
        }

        self.store.upsert(&record).await?;
        Ok(applied(&record, "Subscription synced from webhook"))
    }

    /// customer.subscription.deleted
    async fn apply_subscription_deleted(
        &self,
        sub: &Subscription,
        now: i64,
    ) -> ServiceResult<IngestOutcome> {
        let Some(user_id) = self.resolve_subscription_owner(sub).await? else {
            return Ok(IngestOutcome::Untracked);
        };

        let mut record = self.current_record(user_id, now).await?;
        record.apply_cancellation(Some(sub.customer_id()), Some(&sub.id), now);

        self.store.upsert(&record).await?;
        Ok(applied(&record, "Subscription canceled"))
    }

    /// invoice.payment_failed
    async fn apply_payment_failed(&self, invoice: &Invoice, now: i64) -> ServiceResult<IngestOutcome> {
        let email = match invoice.customer_email.as_deref() {
            Some(email) => Some(email.to_string()),
            None => match invoice.customer.as_deref() {
                Some(customer_id) => self.customer_email(customer_id).await?,
                None => None,
            },
        };
        let Some(user_id) = self.resolve_user(email.as_deref(), invoice.customer.as_deref()).await?
        else {
            return Ok(IngestOutcome::Untracked);
        };

        let mut record = self.current_record(user_id, now).await?;
        record.apply_payment_failed(invoice.customer.as_deref(), invoice.subscription_id(), now);

        self.store.upsert(&record).await?;
        Ok(applied(&record, "Payment failed, subscription past due"))
    }

    /// Owner of a subscription via the customer's email
    async fn resolve_subscription_owner(&self, sub: &Subscription) -> ServiceResult<Option<Uuid>> {
        let email = match &sub.customer {
            Expandable::Object(customer) if customer.email.is_some() => customer.email.clone(),
            _ => self.customer_email(sub.customer_id()).await?,
        };
        self.resolve_user(email.as_deref(), Some(sub.customer_id())).await
    }

    async fn customer_email(&self, customer_id: &str) -> ServiceResult<Option<String>> {
        Ok(self
            .provider
            .get_customer(customer_id)
            .await?
            .and_then(|c| c.email))
    }

    async fn resolve_user(
        &self,
        email: Option<&str>,
        customer_id: Option<&str>,
    ) -> ServiceResult<Option<Uuid>> {
        let user_id = match email {
            Some(email) => self.users.find_user_id_by_email(email).await?,
            None => None,
        };
        if user_id.is_none() {
            tracing::warn!(
                customer_id = customer_id.unwrap_or(""),
                "No local user for provider customer, event untracked"
            );
        }
        Ok(user_id)
    }
}

fn applied(record: &SubscriptionRecord, message: &str) -> IngestOutcome {
    tracing::info!(
        user_id = %record.user_id,
        plan = %record.plan,
        status = %record.status,
        "{message}"
    );
    IngestOutcome::Applied {
        user_id: record.user_id,
        status: record.status,
        plan: record.plan.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::test_support::*;
    use crate::error::ServiceError;
    use serde_json::json;
    use shared::billing::PLAN_NONE;

    fn event(id: &str, event_type: &str, object: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(json!({
            "id": id,
            "type": event_type,
            "data": { "object": object }
        }))
        .unwrap()
    }

    fn subscription(status: &str, product: &str) -> serde_json::Value {
        json!({
            "id": "sub_1",
            "customer": "cus_1",
            "status": status,
            "current_period_end": 1_800_000_000,
            "items": { "data": [{ "id": "si_1", "price": { "id": "price_1", "product": product } }] }
        })
    }

    fn harness_with_user() -> (Harness, Uuid) {
        let h = Harness::new();
        let user = h.add_user("u@example.com");
        h.provider.add_customer("cus_1", "u@example.com");
        (h, user)
    }

    #[tokio::test]
    async fn test_active_then_payment_failed() {
        let (h, user) = harness_with_user();

        let created = event(
            "evt_1",
            "customer.subscription.created",
            subscription("active", "prod_patient_essential"),
        );
        h.service.ingest(&created, NOW).await.unwrap();
        let record = h.store.get(user).unwrap();
        assert_eq!(record.plan, "patient_essential");
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.current_period_end, Some(1_800_000_000_000));

        let failed = event(
            "evt_2",
            "invoice.payment_failed",
            json!({ "id": "in_1", "customer": "cus_1", "subscription": "sub_1" }),
        );
        h.service.ingest(&failed, NOW + 1).await.unwrap();
        let record = h.store.get(user).unwrap();
        assert_eq!(record.status, SubscriptionStatus::PastDue);
        assert_eq!(record.plan, "patient_essential");
    }

    #[tokio::test]
    async fn test_unmapped_product_is_written_as_unknown() {
        let (h, user) = harness_with_user();
        let ev = event("evt_1", "customer.subscription.updated", subscription("active", "prod_Z"));
        let outcome = h.service.ingest(&ev, NOW).await.unwrap();

        assert_eq!(
            outcome,
            IngestOutcome::Applied {
                user_id: user,
                status: SubscriptionStatus::Active,
                plan: PLAN_UNKNOWN.into()
            }
        );
        let ent = h.service.entitlements(user, NOW).await.unwrap();
        assert!(ent.features.is_empty());
        assert!(!ent.can_add_dependent);
    }

    #[tokio::test]
    async fn test_deleted_always_cancels() {
        let (h, user) = harness_with_user();
        h.seed_record(user, "therapist_professional").await;

        // payload status is ignored for deletions
        let ev = event(
            "evt_1",
            "customer.subscription.deleted",
            subscription("active", "prod_therapist_professional"),
        );
        h.service.ingest(&ev, NOW).await.unwrap();
        let record = h.store.get(user).unwrap();
        assert_eq!(record.status, SubscriptionStatus::Canceled);
        assert_eq!(record.plan, PLAN_NONE);
        assert_eq!(record.role, Some(shared::Role::Therapist));
    }

    #[tokio::test]
    async fn test_non_entitled_status_forces_no_plan() {
        let (h, user) = harness_with_user();
        let ev = event(
            "evt_1",
            "customer.subscription.updated",
            subscription("incomplete_expired", "prod_patient_premium"),
        );
        h.service.ingest(&ev, NOW).await.unwrap();
        let record = h.store.get(user).unwrap();
        assert_eq!(record.status, SubscriptionStatus::Inactive);
        assert_eq!(record.plan, PLAN_NONE);
    }

    #[tokio::test]
    async fn test_redelivery_applies_once() {
        let (h, _user) = harness_with_user();
        let ev = event(
            "evt_1",
            "customer.subscription.updated",
            subscription("trialing", "prod_therapist_starter"),
        );
        h.service.ingest(&ev, NOW).await.unwrap();
        assert_eq!(h.service.ingest(&ev, NOW).await.unwrap(), IngestOutcome::Duplicate);
        assert_eq!(h.store.upsert_count(), 1);
        assert_eq!(h.store.record_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_application_is_retried_on_redelivery() {
        let (h, user) = harness_with_user();
        let ev = event(
            "evt_1",
            "customer.subscription.updated",
            subscription("active", "prod_therapist_starter"),
        );

        h.provider.set_unavailable(true);
        assert!(matches!(
            h.service.ingest(&ev, NOW).await,
            Err(ServiceError::Provider(_))
        ));
        assert!(h.store.get(user).is_none());

        h.provider.set_unavailable(false);
        h.service.ingest(&ev, NOW).await.unwrap();
        assert_eq!(h.store.get(user).unwrap().plan, "therapist_starter");
    }

    #[tokio::test]
    async fn test_unknown_customer_is_untracked() {
        let h = Harness::new();
        h.provider.add_customer("cus_1", "stranger@example.com");
        let ev = event(
            "evt_1",
            "customer.subscription.created",
            subscription("active", "prod_patient_essential"),
        );
        assert_eq!(h.service.ingest(&ev, NOW).await.unwrap(), IngestOutcome::Untracked);
        assert_eq!(h.store.record_count(), 0);
    }

    #[tokio::test]
    async fn test_expanded_customer_skips_provider_lookup() {
        let h = Harness::new();
        let user = h.add_user("u@example.com");
        let mut object = subscription("active", "prod_patient_premium");
        object["customer"] = json!({ "id": "cus_1", "email": "u@example.com" });

        h.service
            .ingest(&event("evt_1", "customer.subscription.created", object), NOW)
            .await
            .unwrap();
        assert_eq!(h.store.get(user).unwrap().plan, "patient_premium");
        assert_eq!(h.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_payment_succeeded_is_noop() {
        let (h, user) = harness_with_user();
        let ev = event(
            "evt_1",
            "invoice.payment_succeeded",
            json!({ "id": "in_1", "customer": "cus_1", "customer_email": "u@example.com" }),
        );
        assert_eq!(h.service.ingest(&ev, NOW).await.unwrap(), IngestOutcome::NoOp);
        assert!(h.store.get(user).is_none());
    }

    #[tokio::test]
    async fn test_ignored_and_malformed_events() {
        let (h, _) = harness_with_user();
        let ignored = event("evt_1", "charge.refunded", json!({ "id": "ch_1" }));
        assert_eq!(h.service.ingest(&ignored, NOW).await.unwrap(), IngestOutcome::Ignored);

        let malformed = event("evt_2", "customer.subscription.updated", json!({ "id": "sub_1" }));
        match h.service.ingest(&malformed, NOW).await {
            Err(ServiceError::App(e)) => assert_eq!(e.code, ErrorCode::WebhookPayloadInvalid),
            other => panic!("expected payload error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_store_failure_surfaces() {
        let (h, _) = harness_with_user();
        h.store.set_unavailable(true);
        let ev = event(
            "evt_1",
            "customer.subscription.updated",
            subscription("active", "prod_patient_essential"),
        );
        assert!(matches!(h.service.ingest(&ev, NOW).await, Err(ServiceError::Db(_))));
    }
}
