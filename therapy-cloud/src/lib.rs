//! therapy-cloud: subscription & entitlement sync service
//!
//! - Receives Stripe webhooks and applies subscription transitions
//! - Reconciles a user's subscription with Stripe on demand (JWT authenticated)
//! - Serves resolved entitlements and the dependent capacity check

pub mod api;
pub mod auth;
pub mod billing;
pub mod config;
pub mod db;
pub mod error;
pub mod state;
pub mod stripe;

pub use api::create_router;
pub use config::Config;
pub use state::AppState;
