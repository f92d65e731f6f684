//! Capacity guard and feature gate
//!
//! Both are advisory read-then-decide checks. The capacity guard does not
//! reserve a slot: two concurrent invites can both pass and exceed the limit
//! by one.

use super::entitlement::Entitlements;
use super::plan::{DependentCapacity, Feature};
use crate::error::{AppError, AppResult};

/// Whether one more dependent may be linked
///
/// `Unentitled` (no plan, unknown plan, role without dependents) denies.
pub fn can_add_dependent(current_active: u32, capacity: DependentCapacity) -> bool {
    match capacity {
        DependentCapacity::Unlimited => true,
        DependentCapacity::Limited(max) => current_active < max,
        DependentCapacity::Unentitled => false,
    }
}

/// [`can_add_dependent`] as an error for API handlers
pub fn check_can_add_dependent(current_active: u32, capacity: DependentCapacity) -> AppResult<()> {
    if can_add_dependent(current_active, capacity) {
        Ok(())
    } else {
        Err(AppError::dependent_limit_reached(current_active, capacity.max()))
    }
}

/// Client-side view of the caller's entitlements
///
/// Anything other than `Resolved` grants nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntitlementState {
    #[default]
    Loading,
    Resolved(Entitlements),
    Failed,
}

impl EntitlementState {
    pub fn resolved(&self) -> Option<&Entitlements> {
        match self {
            EntitlementState::Resolved(ent) => Some(ent),
            EntitlementState::Loading | EntitlementState::Failed => None,
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        has_feature(self, feature)
    }

    /// Feature check by name; unrecognized names are denied
    pub fn has_feature_named(&self, name: &str) -> bool {
        Feature::parse(name).is_some_and(|f| self.has_feature(f))
    }

    pub fn can_add_dependent(&self, current_active: u32) -> bool {
        self.resolved()
            .is_some_and(|ent| can_add_dependent(current_active, ent.max_dependents))
    }
}

/// Feature gate, fails closed
pub fn has_feature(state: &EntitlementState, feature: Feature) -> bool {
    state.resolved().is_some_and(|ent| ent.has_feature(feature))
}
