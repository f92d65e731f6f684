//! Entitlement resolution
//!
//! Entitlements are never stored; they are recomputed from the plan key on
//! every read, so catalog changes apply retroactively.

use super::plan::{DependentCapacity, Feature, PLAN_NONE, PlanCatalog, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Resolved feature/capacity bundle for a plan key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlements {
    pub plan: String,
    pub role: Option<Role>,
    pub features: BTreeSet<Feature>,
    pub max_dependents: DependentCapacity,
}

impl Entitlements {
    /// Zero-entitlement bundle (no features, no capacity)
    pub fn none(plan: impl Into<String>) -> Self {
        Self {
            plan: plan.into(),
            role: None,
            features: BTreeSet::new(),
            max_dependents: DependentCapacity::Unentitled,
        }
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Whether this bundle came from a catalog plan
    pub fn is_entitled(&self) -> bool {
        self.role.is_some()
    }
}

impl PlanCatalog {
    /// Resolve the entitlement bundle for a plan key
    ///
    /// Unknown, `"none"` and `"unknown"` keys resolve to [`Entitlements::none`].
    pub fn resolve_entitlements(&self, plan_key: &str) -> Entitlements {
        match self.get(plan_key) {
            Some(plan) => Entitlements {
                plan: plan.key.clone(),
                role: Some(plan.role),
                features: plan.features.clone(),
                max_dependents: plan.max_dependents,
            },
            None => Entitlements::none(if plan_key.is_empty() {
                PLAN_NONE
            } else {
                plan_key
            }),
        }
    }
}
