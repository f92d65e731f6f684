//! Shared types for the therapy billing subsystem
//!
//! Plan catalog, entitlement resolution, capacity/feature gates, subscription
//! record types and the unified error system. Used by both the cloud service
//! and the client crate; nothing here performs I/O.

pub mod billing;
pub mod error;
pub mod util;

// Re-exports
pub use axum::Json;
pub use http;
pub use serde::{Deserialize, Serialize};

pub use billing::{
    DependentCapacity, EntitlementState, Entitlements, Feature, Plan, PlanCatalog, ReconcileResponse,
    Role, SubscriptionRecord, SubscriptionStatus,
};
