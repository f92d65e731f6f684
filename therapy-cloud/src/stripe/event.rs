//! Webhook event envelope and typed billing events

use serde::Deserialize;

use super::types::{Invoice, Subscription};

/// Raw webhook envelope, as signed by Stripe
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Event categories billing sync reacts to
///
/// Every provider event type lands in exactly one variant; types billing
/// sync does not handle are `Ignored`.
#[derive(Debug, Clone)]
pub enum BillingEvent {
    SubscriptionCreated(Subscription),
    SubscriptionUpdated(Subscription),
    SubscriptionDeleted(Subscription),
    InvoicePaymentFailed(Invoice),
    /// `invoice.payment_succeeded` / `invoice.paid`
    InvoicePaymentSucceeded(Invoice),
    Ignored,
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Decode the payload object according to the event type
    pub fn billing_event(&self) -> Result<BillingEvent, serde_json::Error> {
        let object = || self.data.object.clone();
        Ok(match self.event_type.as_str() {
            "customer.subscription.created" => {
                BillingEvent::SubscriptionCreated(serde_json::from_value(object())?)
            }
            "customer.subscription.updated" => {
                BillingEvent::SubscriptionUpdated(serde_json::from_value(object())?)
            }
            "customer.subscription.deleted" => {
                BillingEvent::SubscriptionDeleted(serde_json::from_value(object())?)
            }
            "invoice.payment_failed" => {
                BillingEvent::InvoicePaymentFailed(serde_json::from_value(object())?)
            }
            "invoice.payment_succeeded" | "invoice.paid" => {
                BillingEvent::InvoicePaymentSucceeded(serde_json::from_value(object())?)
            }
            _ => BillingEvent::Ignored,
        })
    }
}
