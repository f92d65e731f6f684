use async_trait::async_trait;
use shared::ReconcileResponse;
use shared::billing::EntitlementsResponse;
use shared::{DependentCapacity, Feature, SubscriptionStatus};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::http::BillingApi;
use crate::{ClientError, ClientResult};

/// Billing API double replaying scripted reconciliation results
///
/// Once the script runs out every call fails with `Unavailable`.
pub struct ScriptedApi {
    reconcile: Mutex<VecDeque<ClientResult<ReconcileResponse>>>,
    entitlements: Mutex<VecDeque<ClientResult<EntitlementsResponse>>>,
    calls: AtomicUsize,
    entitlement_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new(reconcile: Vec<ClientResult<ReconcileResponse>>) -> Self {
        Self {
            reconcile: Mutex::new(reconcile.into()),
            entitlements: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            entitlement_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_entitlements(self, entitlements: Vec<ClientResult<EntitlementsResponse>>) -> Self {
        *self.entitlements.lock().unwrap() = entitlements.into();
        self
    }

    /// Reconciliation calls made so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn entitlement_calls(&self) -> usize {
        self.entitlement_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BillingApi for ScriptedApi {
    async fn check_subscription(&self) -> ClientResult<ReconcileResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reconcile
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Unavailable("script exhausted".into())))
    }

    async fn entitlements(&self) -> ClientResult<EntitlementsResponse> {
        self.entitlement_calls.fetch_add(1, Ordering::SeqCst);
        self.entitlements
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::Unavailable("script exhausted".into())))
    }

    async fn authorize_dependent(&self) -> ClientResult<bool> {
        Ok(false)
    }
}

pub fn therapist_entitlements(plan: &str, max: u32, active: u32) -> EntitlementsResponse {
    EntitlementsResponse {
        plan: plan.to_string(),
        status: SubscriptionStatus::Active,
        role: Some(shared::Role::Therapist),
        features: vec![Feature::Charts, Feature::Timeline],
        max_dependents: DependentCapacity::Limited(max),
        active_dependents: active,
        can_add_dependent: active < max,
    }
}
