//! Subscription & entitlement domain
//!
//! - [`plan`]: static plan catalog (keys, roles, capacity, features, product ids)
//! - [`entitlement`]: plan key -> feature/capacity bundle
//! - [`guard`]: capacity guard and fail-closed feature gate
//! - [`subscription`]: subscription record, status mapping and transitions

pub mod entitlement;
pub mod guard;
pub mod plan;
pub mod subscription;

pub use entitlement::Entitlements;
pub use guard::{EntitlementState, can_add_dependent, check_can_add_dependent, has_feature};
pub use plan::{
    BillingInterval, CatalogError, DependentCapacity, Feature, PLAN_NONE, PLAN_UNKNOWN, Plan,
    PlanCatalog, Price, Role,
};
pub use subscription::{
    EntitlementsResponse, ReconcileResponse, SubscriptionChange, SubscriptionRecord,
    SubscriptionStatus,
};
