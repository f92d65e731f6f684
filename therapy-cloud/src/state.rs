//! Application state for therapy-cloud

use std::sync::Arc;

use sqlx::PgPool;

use crate::billing::BillingService;
use crate::config::Config;
use crate::db::{PgSubscriptionStore, PgUserDirectory};
use crate::error::BoxError;
use crate::stripe::StripeClient;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Ingestion, reconciliation and entitlement queries
    pub billing: BillingService,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Accepted webhook timestamp skew in seconds
    pub webhook_tolerance_secs: i64,
    /// JWT secret for user authentication
    pub jwt_secret: String,
}

impl AppState {
    /// Connect to PostgreSQL, run migrations and wire the Stripe client
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let catalog = Arc::new(config.load_catalog()?);
        let provider = StripeClient::new(&config.stripe_api_base, &config.stripe_secret_key)?;

        let billing = BillingService::new(
            Arc::new(PgSubscriptionStore::new(pool.clone())),
            Arc::new(PgUserDirectory::new(pool)),
            Arc::new(provider),
            catalog,
        );

        Ok(Self::with_billing(billing, config))
    }

    /// State over an already-wired billing service
    pub fn with_billing(billing: BillingService, config: &Config) -> Self {
        Self {
            billing,
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
            webhook_tolerance_secs: config.stripe_webhook_tolerance_secs,
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}
