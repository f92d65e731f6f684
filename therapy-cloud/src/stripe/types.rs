//! Stripe object shapes (only the fields billing sync reads)

use serde::Deserialize;
use shared::billing::{SubscriptionChange, SubscriptionStatus};
use shared::util::secs_to_millis;

/// A field Stripe returns either as an id or as the expanded object
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Expandable<T> {
    Id(String),
    Object(Box<T>),
}

/// Objects that carry an `id`
pub trait HasId {
    fn id(&self) -> &str;
}

impl<T: HasId> Expandable<T> {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object(obj) => obj.id(),
        }
    }

    pub fn object(&self) -> Option<&T> {
        match self {
            Expandable::Id(_) => None,
            Expandable::Object(obj) => Some(obj.as_ref()),
        }
    }
}

/// Paginated list envelope
#[derive(Debug, Clone, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            has_more: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
    /// Set on deleted-customer tombstones
    #[serde(default)]
    pub deleted: bool,
}

impl HasId for Customer {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Product {
    pub id: String,
}

impl HasId for Product {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Price {
    pub id: String,
    pub product: Expandable<Product>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionItem {
    pub id: String,
    pub price: Option<Price>,
    /// Newer API versions report the period per item
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub customer: Expandable<Customer>,
    pub status: String,
    /// Unix seconds
    pub current_period_end: Option<i64>,
    #[serde(default)]
    pub items: List<SubscriptionItem>,
}

impl Subscription {
    pub fn customer_id(&self) -> &str {
        self.customer.id()
    }

    /// Product of the first priced item
    pub fn product_id(&self) -> Option<&str> {
        self.items
            .data
            .iter()
            .find_map(|item| item.price.as_ref())
            .map(|price| price.product.id())
    }

    /// Period end in Unix seconds, falling back to the first item
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.items.data.first().and_then(|i| i.current_period_end))
    }

    pub fn status(&self) -> SubscriptionStatus {
        SubscriptionStatus::from_provider(&self.status)
    }

    /// Provider-asserted state in local terms
    pub fn to_change(&self) -> SubscriptionChange {
        SubscriptionChange {
            customer_id: Some(self.customer_id().to_string()),
            subscription_id: Some(self.id.clone()),
            status: self.status(),
            product_id: self.product_id().map(String::from),
            current_period_end: self.period_end().map(secs_to_millis),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceSubscriptionDetails {
    pub subscription: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceParent {
    pub subscription_details: Option<InvoiceSubscriptionDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub customer: Option<String>,
    pub customer_email: Option<String>,
    /// Pre-2025 API versions
    pub subscription: Option<String>,
    /// 2025+ API versions
    pub parent: Option<InvoiceParent>,
}

impl Invoice {
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription.as_deref().or_else(|| {
            self.parent
                .as_ref()
                .and_then(|p| p.subscription_details.as_ref())
                .and_then(|d| d.subscription.as_deref())
        })
    }
}
