//! Therapy Client - billing client side
//!
//! HTTP access to the billing API, redirect verification after checkout,
//! and a background poller that keeps the entitlement view fresh.

pub mod checkout;
pub mod config;
pub mod error;
pub mod http;
pub mod poller;

#[cfg(test)]
mod test_support;

pub use checkout::{CheckoutVerifier, VerificationFailure, VerificationState};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use http::{BillingApi, HttpBillingClient};
pub use poller::{PollerHandle, SubscriptionPoller};

// Re-export shared types for convenience
pub use shared::billing::EntitlementsResponse;
pub use shared::{EntitlementState, ReconcileResponse};
