//! Plan catalog
//!
//! Static mapping of plan keys to role, price, dependent capacity and
//! feature flags. The catalog is built once (built-in or from JSON) and
//! injected where needed; it is never mutated at runtime.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use thiserror::Error;

/// Plan key stored for users without a paid plan
pub const PLAN_NONE: &str = "none";
/// Plan key stored when the provider product is not in the catalog
pub const PLAN_UNKNOWN: &str = "unknown";

/// User kind a plan applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Patient,
    Therapist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Therapist => "therapist",
        }
    }

    /// Parse from database string value
    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(Role::Patient),
            "therapist" => Some(Role::Therapist),
            _ => None,
        }
    }
}

/// Named feature flag carried by a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Data export (PDF/CSV)
    Export,
    /// Mood and diary charts
    Charts,
    /// History timeline
    Timeline,
    /// Structured questionnaires
    StructuredQuestionnaires,
}

impl Feature {
    pub const ALL: [Feature; 4] = [
        Feature::Export,
        Feature::Charts,
        Feature::Timeline,
        Feature::StructuredQuestionnaires,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Export => "export",
            Feature::Charts => "charts",
            Feature::Timeline => "timeline",
            Feature::StructuredQuestionnaires => "structured_questionnaires",
        }
    }

    /// Parse a feature name; unknown names yield `None`
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name)
    }
}

/// Dependent (patient) capacity of a plan
///
/// `Unentitled` means no capacity concept applies (unknown plan, no plan,
/// or a role without dependents) and is never the same as `Unlimited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependentCapacity {
    Unlimited,
    Limited(u32),
    Unentitled,
}

impl DependentCapacity {
    /// Numeric limit, if the plan has one
    pub fn max(&self) -> Option<u32> {
        match self {
            DependentCapacity::Limited(n) => Some(*n),
            DependentCapacity::Unlimited | DependentCapacity::Unentitled => None,
        }
    }
}

/// Billing interval of a plan price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingInterval {
    Month,
    Year,
}

/// Display price of a plan (minor currency units, mirrored from the provider)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub amount_minor: u32,
    pub currency: String,
    pub interval: BillingInterval,
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub key: String,
    pub role: Role,
    pub price: Price,
    pub max_dependents: DependentCapacity,
    #[serde(default)]
    pub features: BTreeSet<Feature>,
    /// Provider product id, the join key for inbound provider data
    pub external_product_id: String,
    #[serde(default)]
    pub trial_days: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate plan key: {0}")]
    DuplicateKey(String),
    #[error("duplicate provider product id: {0}")]
    DuplicateProduct(String),
    #[error("reserved plan key: {0}")]
    ReservedKey(String),
    #[error("invalid catalog JSON: {0}")]
    Json(String),
}

#[derive(Deserialize)]
struct CatalogFile {
    plans: Vec<Plan>,
}

/// Plan catalog with key and provider-product indexes
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
    by_key: HashMap<String, usize>,
    by_product: HashMap<String, usize>,
}

impl PlanCatalog {
    /// Build a catalog, rejecting duplicate keys/products and reserved keys
    pub fn new(plans: Vec<Plan>) -> Result<Self, CatalogError> {
        let mut keys = HashSet::with_capacity(plans.len());
        let mut products = HashSet::with_capacity(plans.len());

        for plan in &plans {
            if plan.key == PLAN_NONE || plan.key == PLAN_UNKNOWN {
                return Err(CatalogError::ReservedKey(plan.key.clone()));
            }
            if !keys.insert(plan.key.as_str()) {
                return Err(CatalogError::DuplicateKey(plan.key.clone()));
            }
            if !products.insert(plan.external_product_id.as_str()) {
                return Err(CatalogError::DuplicateProduct(
                    plan.external_product_id.clone(),
                ));
            }
        }

        Ok(Self::indexed(plans))
    }

    fn indexed(plans: Vec<Plan>) -> Self {
        let by_key = plans
            .iter()
            .enumerate()
            .map(|(idx, plan)| (plan.key.clone(), idx))
            .collect();
        let by_product = plans
            .iter()
            .enumerate()
            .map(|(idx, plan)| (plan.external_product_id.clone(), idx))
            .collect();
        Self {
            plans,
            by_key,
            by_product,
        }
    }

    /// Load from `{"plans": [...]}`
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| CatalogError::Json(e.to_string()))?;
        Self::new(file.plans)
    }

    /// Built-in catalog shipped with the service
    pub fn standard() -> Self {
        use Feature::*;

        fn plan(
            key: &str,
            role: Role,
            amount_minor: u32,
            max_dependents: DependentCapacity,
            features: &[Feature],
            product: &str,
            trial_days: u32,
        ) -> Plan {
            Plan {
                key: key.to_string(),
                role,
                price: Price {
                    amount_minor,
                    currency: "eur".to_string(),
                    interval: BillingInterval::Month,
                },
                max_dependents,
                features: features.iter().copied().collect(),
                external_product_id: product.to_string(),
                trial_days,
            }
        }

        let plans = vec![
            plan(
                "patient_essential",
                Role::Patient,
                499,
                DependentCapacity::Unentitled,
                &[Charts, Timeline],
                "prod_patient_essential",
                7,
            ),
            plan(
                "patient_premium",
                Role::Patient,
                999,
                DependentCapacity::Unentitled,
                &[Export, Charts, Timeline, StructuredQuestionnaires],
                "prod_patient_premium",
                7,
            ),
            plan(
                "therapist_starter",
                Role::Therapist,
                1900,
                DependentCapacity::Limited(10),
                &[Charts, Timeline, StructuredQuestionnaires],
                "prod_therapist_starter",
                14,
            ),
            plan(
                "therapist_professional",
                Role::Therapist,
                3900,
                DependentCapacity::Limited(50),
                &[Export, Charts, Timeline, StructuredQuestionnaires],
                "prod_therapist_professional",
                14,
            ),
            plan(
                "therapist_clinic",
                Role::Therapist,
                7900,
                DependentCapacity::Unlimited,
                &[Export, Charts, Timeline, StructuredQuestionnaires],
                "prod_therapist_clinic",
                0,
            ),
        ];

        Self::indexed(plans)
    }

    pub fn get(&self, key: &str) -> Option<&Plan> {
        self.by_key.get(key).map(|&idx| &self.plans[idx])
    }

    pub fn by_product(&self, product_id: &str) -> Option<&Plan> {
        self.by_product.get(product_id).map(|&idx| &self.plans[idx])
    }

    /// Map a provider product id to a plan key (`"unknown"` if unmapped)
    pub fn plan_key_for_product(&self, product_id: Option<&str>) -> &str {
        product_id
            .and_then(|p| self.by_product(p))
            .map(|plan| plan.key.as_str())
            .unwrap_or(PLAN_UNKNOWN)
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    pub fn plans_for_role(&self, role: Role) -> impl Iterator<Item = &Plan> {
        self.plans.iter().filter(move |p| p.role == role)
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
