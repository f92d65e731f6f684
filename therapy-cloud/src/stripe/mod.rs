//! Stripe integration via REST API (no SDK dependency)
//!
//! - [`verify_webhook_signature`]: `Stripe-Signature` HMAC check
//! - [`BillingProvider`]: the read operations billing sync needs
//! - [`StripeClient`]: reqwest implementation of [`BillingProvider`]
//! - [`MemoryProvider`]: in-memory implementation for tests

mod client;
pub mod event;
mod memory;
pub mod types;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub use client::StripeClient;
pub use event::{BillingEvent, WebhookEvent};
pub use memory::MemoryProvider;
pub use types::{Customer, Invoice, Subscription};

/// Billing provider failure
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Outage-type failure worth retrying
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport(_) => true,
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::Decode(_) => false,
        }
    }
}

/// Read access to the billing provider's customers and subscriptions
#[async_trait]
pub trait BillingProvider: Send + Sync {
    /// First live customer with this email
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, ProviderError>;

    /// Customer by id; deleted customers are `None`
    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, ProviderError>;

    /// At most one subscription of `customer_id` in the given provider status
    async fn list_subscriptions(
        &self,
        customer_id: &str,
        status: &str,
    ) -> Result<Vec<Subscription>, ProviderError>;
}

/// Webhook signature failure
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Invalid Stripe-Signature header")]
    MalformedHeader,
    #[error("Invalid timestamp")]
    InvalidTimestamp,
    #[error("Webhook timestamp outside tolerance")]
    Expired,
    #[error("Webhook signature mismatch")]
    Mismatch,
}

/// Verify Stripe webhook signature (HMAC-SHA256) against the current time
pub fn verify_webhook_signature(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    verify_webhook_signature_at(
        payload,
        sig_header,
        secret,
        tolerance_secs,
        chrono::Utc::now().timestamp(),
    )
}

/// Verify a `t=<ts>,v1=<hex>[,v1=<hex>...]` header at a given Unix time
///
/// Any matching `v1` signature is accepted (Stripe sends several while a
/// signing secret is being rolled).
pub fn verify_webhook_signature_at(
    payload: &[u8],
    sig_header: &str,
    secret: &str,
    tolerance_secs: i64,
    now_secs: i64,
) -> Result<(), SignatureError> {
    let mut timestamp = "";
    let mut signatures = Vec::new();
    for part in sig_header.split(',') {
        let part = part.trim();
        if let Some(t) = part.strip_prefix("t=") {
            timestamp = t;
        } else if let Some(v) = part.strip_prefix("v1=") {
            signatures.push(v);
        }
    }

    if timestamp.is_empty() || signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);

    // Constant-time comparison via hmac::verify_slice
    let matched = signatures.iter().any(|sig| {
        hex::decode(sig).is_ok_and(|bytes| mac.clone().verify_slice(&bytes).is_ok())
    });
    if !matched {
        return Err(SignatureError::Mismatch);
    }

    let ts: i64 = timestamp
        .parse()
        .map_err(|_| SignatureError::InvalidTimestamp)?;
    if (now_secs - ts).abs() > tolerance_secs {
        return Err(SignatureError::Expired);
    }

    Ok(())
}

/// Build a `Stripe-Signature` header value (used by tests and local tooling)
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={timestamp}"),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}
