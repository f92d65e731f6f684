//! In-memory billing provider (tests, local development)

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{BillingProvider, Customer, ProviderError, Subscription};

#[derive(Default)]
struct ProviderInner {
    customers: DashMap<String, Customer>,
    subscriptions: DashMap<String, Subscription>,
    unavailable: AtomicBool,
    calls: AtomicUsize,
}

/// Provider over `DashMap`; clones share state
#[derive(Clone, Default)]
pub struct MemoryProvider {
    inner: Arc<ProviderInner>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_customer(&self, id: &str, email: &str) {
        self.inner.customers.insert(
            id.to_string(),
            Customer {
                id: id.to_string(),
                email: Some(email.to_string()),
                deleted: false,
            },
        );
    }

    /// Insert or replace a subscription by id
    pub fn set_subscription(&self, subscription: Subscription) {
        self.inner
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    /// Make every call fail with a 503, simulating a provider outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of provider calls so far, failed ones included
    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        self.inner.calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err(ProviderError::Api {
                status: 503,
                message: "provider unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BillingProvider for MemoryProvider {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, ProviderError> {
        self.check_available()?;
        Ok(self
            .inner
            .customers
            .iter()
            .find(|c| !c.deleted && c.email.as_deref() == Some(email))
            .map(|c| c.clone()))
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, ProviderError> {
        self.check_available()?;
        Ok(self
            .inner
            .customers
            .get(customer_id)
            .filter(|c| !c.deleted)
            .map(|c| c.clone()))
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
        status: &str,
    ) -> Result<Vec<Subscription>, ProviderError> {
        self.check_available()?;
        Ok(self
            .inner
            .subscriptions
            .iter()
            .filter(|s| s.customer_id() == customer_id && s.status == status)
            .take(1)
            .map(|s| s.clone())
            .collect())
    }
}
