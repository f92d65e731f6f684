//! In-memory store and directory (tests, local development)

use async_trait::async_trait;
use dashmap::DashMap;
use shared::SubscriptionRecord;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use super::{DbResult, SubscriptionStore, UserDirectory};

#[derive(Default)]
struct StoreInner {
    records: DashMap<Uuid, SubscriptionRecord>,
    processed_events: DashMap<String, (String, i64)>,
    unavailable: AtomicBool,
    upserts: AtomicUsize,
}

/// Subscription store over `DashMap`; clones share state
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail, simulating a database outage
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of successful upserts so far
    pub fn upsert_count(&self) -> usize {
        self.inner.upserts.load(Ordering::SeqCst)
    }

    pub fn record_count(&self) -> usize {
        self.inner.records.len()
    }

    pub fn get(&self, user_id: Uuid) -> Option<SubscriptionRecord> {
        self.inner.records.get(&user_id).map(|r| r.clone())
    }

    fn check_available(&self) -> DbResult<()> {
        if self.inner.unavailable.load(Ordering::SeqCst) {
            return Err("subscription store unavailable".into());
        }
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn find(&self, user_id: Uuid) -> DbResult<Option<SubscriptionRecord>> {
        self.check_available()?;
        Ok(self.get(user_id))
    }

    async fn upsert(&self, record: &SubscriptionRecord) -> DbResult<()> {
        self.check_available()?;
        self.inner.records.insert(record.user_id, record.clone());
        self.inner.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn is_event_processed(&self, event_id: &str) -> DbResult<bool> {
        self.check_available()?;
        Ok(self.inner.processed_events.contains_key(event_id))
    }

    async fn mark_event_processed(&self, event_id: &str, event_type: &str, now: i64) -> DbResult<()> {
        self.check_available()?;
        self.inner
            .processed_events
            .entry(event_id.to_string())
            .or_insert_with(|| (event_type.to_string(), now));
        Ok(())
    }
}

/// User directory over `DashMap`; clones share state
#[derive(Clone, Default)]
pub struct MemoryUserDirectory {
    users: Arc<DashMap<String, Uuid>>,
    dependents: Arc<DashMap<Uuid, u32>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, email: &str, user_id: Uuid) {
        self.users.insert(email.to_lowercase(), user_id);
    }

    pub fn set_active_dependents(&self, owner_id: Uuid, count: u32) {
        self.dependents.insert(owner_id, count);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn find_user_id_by_email(&self, email: &str) -> DbResult<Option<Uuid>> {
        Ok(self.users.get(&email.to_lowercase()).map(|id| *id))
    }

    async fn count_active_dependents(&self, owner_id: Uuid) -> DbResult<u32> {
        Ok(self.dependents.get(&owner_id).map(|c| *c).unwrap_or(0))
    }
}
