//! Subscription record and its transitions
//!
//! One record per user, keyed by `user_id`. Both webhook ingestion and
//! on-demand reconciliation compute the next record with the transitions
//! below and upsert it; neither assumes any prior state.

use super::entitlement::Entitlements;
use super::plan::{DependentCapacity, Feature, PLAN_NONE, PlanCatalog, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Local subscription lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// No paid subscription
    Inactive,
    /// In the provider trial window
    Trialing,
    /// Paid and current
    Active,
    /// Renewal payment failed, provider retrying
    PastDue,
    /// Terminated
    Canceled,
    /// Provider gave up collecting
    Unpaid,
}

impl SubscriptionStatus {
    /// Map a provider subscription status; anything unrecognized is `Inactive`
    pub fn from_provider(status: &str) -> Self {
        match status {
            "active" => Self::Active,
            "trialing" => Self::Trialing,
            "past_due" => Self::PastDue,
            "canceled" => Self::Canceled,
            "unpaid" => Self::Unpaid,
            _ => Self::Inactive,
        }
    }

    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "inactive" => Some(Self::Inactive),
            "trialing" => Some(Self::Trialing),
            "active" => Some(Self::Active),
            "past_due" => Some(Self::PastDue),
            "canceled" => Some(Self::Canceled),
            "unpaid" => Some(Self::Unpaid),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "inactive",
            Self::Trialing => "trialing",
            Self::Active => "active",
            Self::PastDue => "past_due",
            Self::Canceled => "canceled",
            Self::Unpaid => "unpaid",
        }
    }

    /// Statuses that carry a paid plan
    pub fn is_entitled(&self) -> bool {
        matches!(self, Self::Active | Self::Trialing)
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-asserted subscription state, already extracted from the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionChange {
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    pub status: SubscriptionStatus,
    pub product_id: Option<String>,
    /// Period end (Unix millis)
    pub current_period_end: Option<i64>,
}

/// Persisted subscription state of one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub user_id: Uuid,
    pub role: Option<Role>,
    pub plan: String,
    pub status: SubscriptionStatus,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    /// Unix millis, only meaningful while active/trialing
    pub current_period_end: Option<i64>,
    /// Unix millis
    pub updated_at: i64,
}

impl SubscriptionRecord {
    /// Initial state of a lazily created record
    pub fn new(user_id: Uuid, now: i64) -> Self {
        Self {
            user_id,
            role: None,
            plan: PLAN_NONE.to_string(),
            status: SubscriptionStatus::Inactive,
            external_customer_id: None,
            external_subscription_id: None,
            current_period_end: None,
            updated_at: now,
        }
    }

    /// Start from the stored record, or a fresh one if there is none
    pub fn existing_or_new(existing: Option<Self>, user_id: Uuid, now: i64) -> Self {
        existing.unwrap_or_else(|| Self::new(user_id, now))
    }

    /// Apply a subscription created/updated snapshot
    ///
    /// Active/trialing recomputes the plan from the product id (unmapped
    /// products become `"unknown"`); any other status clears the plan.
    pub fn apply_subscription(&mut self, change: &SubscriptionChange, catalog: &PlanCatalog, now: i64) {
        if change.status.is_entitled() {
            let plan_key = catalog.plan_key_for_product(change.product_id.as_deref());
            if let Some(plan) = catalog.get(plan_key) {
                self.role = Some(plan.role);
            }
            self.plan = plan_key.to_string();
            self.current_period_end = change.current_period_end;
        } else {
            self.plan = PLAN_NONE.to_string();
            self.current_period_end = None;
        }
        self.status = change.status;
        if change.customer_id.is_some() {
            self.external_customer_id = change.customer_id.clone();
        }
        self.external_subscription_id = change.subscription_id.clone();
        self.updated_at = now;
    }

    /// Subscription deleted: always canceled with no plan, whatever came before
    pub fn apply_cancellation(
        &mut self,
        customer_id: Option<&str>,
        subscription_id: Option<&str>,
        now: i64,
    ) {
        self.status = SubscriptionStatus::Canceled;
        self.plan = PLAN_NONE.to_string();
        self.current_period_end = None;
        if let Some(cid) = customer_id {
            self.external_customer_id = Some(cid.to_string());
        }
        if let Some(sid) = subscription_id {
            self.external_subscription_id = Some(sid.to_string());
        }
        self.updated_at = now;
    }

    /// Invoice payment failed: past_due, plan untouched
    pub fn apply_payment_failed(&mut self, customer_id: Option<&str>, subscription_id: Option<&str>, now: i64) {
        self.status = SubscriptionStatus::PastDue;
        if let Some(cid) = customer_id {
            self.external_customer_id = Some(cid.to_string());
        }
        if let Some(sid) = subscription_id {
            self.external_subscription_id = Some(sid.to_string());
        }
        self.updated_at = now;
    }

    /// Reconciliation found a customer but no live subscription
    ///
    /// Role and external ids are preserved.
    pub fn apply_no_subscription(&mut self, customer_id: &str, now: i64) {
        self.status = SubscriptionStatus::Inactive;
        self.plan = PLAN_NONE.to_string();
        self.current_period_end = None;
        self.external_customer_id = Some(customer_id.to_string());
        self.updated_at = now;
    }

    pub fn entitlements(&self, catalog: &PlanCatalog) -> Entitlements {
        catalog.resolve_entitlements(&self.plan)
    }

    /// Same state ignoring `updated_at`
    pub fn same_state(&self, other: &Self) -> bool {
        Self {
            updated_at: 0,
            ..self.clone()
        } == Self {
            updated_at: 0,
            ..other.clone()
        }
    }
}

/// Body of the reconciliation endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub subscribed: bool,
    pub plan: String,
    pub product_id: Option<String>,
    /// RFC 3339
    pub subscription_end: Option<String>,
}

impl ReconcileResponse {
    pub fn not_subscribed() -> Self {
        Self {
            subscribed: false,
            plan: PLAN_NONE.to_string(),
            product_id: None,
            subscription_end: None,
        }
    }
}

/// Body of the entitlements endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitlementsResponse {
    pub plan: String,
    pub status: SubscriptionStatus,
    pub role: Option<Role>,
    pub features: Vec<Feature>,
    pub max_dependents: DependentCapacity,
    pub active_dependents: u32,
    pub can_add_dependent: bool,
}

impl EntitlementsResponse {
    pub fn entitlements(&self) -> Entitlements {
        Entitlements {
            plan: self.plan.clone(),
            role: self.role,
            features: self.features.iter().copied().collect(),
            max_dependents: self.max_dependents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::billing::plan::PLAN_UNKNOWN;

    const NOW: i64 = 1_700_000_000_000;

    fn change(status: SubscriptionStatus, product: &str) -> SubscriptionChange {
        SubscriptionChange {
            customer_id: Some("cus_1".into()),
            subscription_id: Some("sub_1".into()),
            status,
            product_id: Some(product.into()),
            current_period_end: Some(NOW + 86_400_000),
        }
    }

    #[test]
    fn test_provider_status_table() {
        use SubscriptionStatus::*;
        assert_eq!(SubscriptionStatus::from_provider("active"), Active);
        assert_eq!(SubscriptionStatus::from_provider("trialing"), Trialing);
        assert_eq!(SubscriptionStatus::from_provider("past_due"), PastDue);
        assert_eq!(SubscriptionStatus::from_provider("canceled"), Canceled);
        assert_eq!(SubscriptionStatus::from_provider("unpaid"), Unpaid);
        for other in ["incomplete", "incomplete_expired", "paused", ""] {
            assert_eq!(SubscriptionStatus::from_provider(other), Inactive);
        }
    }

    #[test]
    fn test_db_roundtrip() {
        for s in [
            SubscriptionStatus::Inactive,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::Active,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Canceled,
            SubscriptionStatus::Unpaid,
        ] {
            assert_eq!(SubscriptionStatus::from_db(s.as_str()), Some(s));
        }
    }

    #[test]
    fn test_active_subscription_sets_plan_and_role() {
        let catalog = PlanCatalog::standard();
        let mut record = SubscriptionRecord::new(Uuid::nil(), NOW);
        record.apply_subscription(
            &change(SubscriptionStatus::Active, "prod_therapist_starter"),
            &catalog,
            NOW,
        );
        assert_eq!(record.plan, "therapist_starter");
        assert_eq!(record.role, Some(Role::Therapist));
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.current_period_end, Some(NOW + 86_400_000));
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn test_unmapped_product_is_unknown_plan() {
        let catalog = PlanCatalog::standard();
        let mut record = SubscriptionRecord::new(Uuid::nil(), NOW);
        record.apply_subscription(&change(SubscriptionStatus::Active, "prod_Z"), &catalog, NOW);
        assert_eq!(record.plan, PLAN_UNKNOWN);
        assert_eq!(record.status, SubscriptionStatus::Active);
        assert_eq!(record.role, None);
        assert!(record.entitlements(&catalog).features.is_empty());
    }

    #[test]
    fn test_non_entitled_status_clears_plan() {
        let catalog = PlanCatalog::standard();
        let mut record = SubscriptionRecord::new(Uuid::nil(), NOW);
        record.apply_subscription(
            &change(SubscriptionStatus::Active, "prod_patient_premium"),
            &catalog,
            NOW,
        );
        record.apply_subscription(
            &change(SubscriptionStatus::Unpaid, "prod_patient_premium"),
            &catalog,
            NOW,
        );
        assert_eq!(record.plan, PLAN_NONE);
        assert_eq!(record.current_period_end, None);
        assert_eq!(record.role, Some(Role::Patient));
    }

    #[test]
    fn test_cancellation_from_any_state() {
        let catalog = PlanCatalog::standard();
        let statuses = [
            SubscriptionStatus::Active,
            SubscriptionStatus::Trialing,
            SubscriptionStatus::PastDue,
            SubscriptionStatus::Inactive,
        ];
        for status in statuses {
            let mut record = SubscriptionRecord::new(Uuid::nil(), NOW);
            record.apply_subscription(&change(status, "prod_therapist_clinic"), &catalog, NOW);
            record.apply_cancellation(None, Some("sub_1"), NOW);
            assert_eq!(record.status, SubscriptionStatus::Canceled);
            assert_eq!(record.plan, PLAN_NONE);
        }
    }

    #[test]
    fn test_payment_failed_keeps_plan() {
        let catalog = PlanCatalog::standard();
        let mut record = SubscriptionRecord::new(Uuid::nil(), NOW);
        record.apply_subscription(
            &change(SubscriptionStatus::Active, "prod_patient_essential"),
            &catalog,
            NOW,
        );
        record.apply_payment_failed(Some("cus_1"), Some("sub_1"), NOW + 1);
        assert_eq!(record.status, SubscriptionStatus::PastDue);
        assert_eq!(record.plan, "patient_essential");
        assert_eq!(record.updated_at, NOW + 1);
    }

    #[test]
    fn test_no_subscription_preserves_role() {
        let catalog = PlanCatalog::standard();
        let mut record = SubscriptionRecord::new(Uuid::nil(), NOW);
        record.apply_subscription(
            &change(SubscriptionStatus::Active, "prod_therapist_starter"),
            &catalog,
            NOW,
        );
        record.apply_no_subscription("cus_1", NOW);
        assert_eq!(record.status, SubscriptionStatus::Inactive);
        assert_eq!(record.plan, PLAN_NONE);
        assert_eq!(record.role, Some(Role::Therapist));
        assert_eq!(record.external_subscription_id.as_deref(), Some("sub_1"));
    }

    #[test]
    fn test_same_state_ignores_timestamp() {
        let a = SubscriptionRecord::new(Uuid::nil(), NOW);
        let b = SubscriptionRecord::new(Uuid::nil(), NOW + 5);
        assert!(a.same_state(&b));
        assert_ne!(a, b);
    }

    #[test]
    fn test_reconcile_response_shape() {
        let json = serde_json::to_value(ReconcileResponse::not_subscribed()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "subscribed": false,
                "plan": "none",
                "product_id": null,
                "subscription_end": null
            })
        );
    }
}
