use serde_json::json;
use shared::billing::SubscriptionStatus;
use shared::{PlanCatalog, Role, SubscriptionRecord};
use std::sync::Arc;
use uuid::Uuid;

use super::BillingService;
use crate::db::{MemoryStore, MemoryUserDirectory, SubscriptionStore};
use crate::stripe::{MemoryProvider, Subscription};

pub const NOW: i64 = 1_700_000_000_000;

/// Provider subscription with one priced item
pub fn provider_subscription(id: &str, customer: &str, status: &str, product: &str) -> Subscription {
    serde_json::from_value(json!({
        "id": id,
        "customer": customer,
        "status": status,
        "current_period_end": 1_800_000_000,
        "items": { "data": [{ "id": "si_1", "price": { "id": "price_1", "product": product } }] }
    }))
    .unwrap()
}

pub struct Harness {
    pub service: BillingService,
    pub store: MemoryStore,
    pub users: MemoryUserDirectory,
    pub provider: Arc<MemoryProvider>,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let users = MemoryUserDirectory::new();
        let provider = Arc::new(MemoryProvider::new());
        let catalog = Arc::new(PlanCatalog::standard());
        let service = BillingService::new(
            Arc::new(store.clone()),
            Arc::new(users.clone()),
            provider.clone(),
            catalog,
        );
        Self {
            service,
            store,
            users,
            provider,
        }
    }

    pub fn add_user(&self, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.users.add_user(email, id);
        id
    }

    pub async fn seed_record(&self, user_id: Uuid, plan: &str) {
        let catalog = PlanCatalog::standard();
        let mut record = SubscriptionRecord::new(user_id, NOW);
        record.plan = plan.to_string();
        record.status = SubscriptionStatus::Active;
        record.role = catalog.get(plan).map(|p| p.role).or(Some(Role::Therapist));
        self.store.upsert(&record).await.unwrap();
    }
}
