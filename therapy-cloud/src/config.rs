//! Cloud service configuration

use shared::PlanCatalog;

use crate::error::BoxError;

/// Cloud service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Stripe REST base URL (overridable for stripe-mock)
    pub stripe_api_base: String,
    /// Accepted webhook timestamp skew in seconds
    pub stripe_webhook_tolerance_secs: i64,
    /// JWT secret for user authentication
    pub jwt_secret: String,
    /// Optional JSON plan catalog; the built-in catalog is used when unset
    pub plan_catalog_path: Option<String>,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            stripe_api_base: std::env::var("STRIPE_API_BASE")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://api.stripe.com".into()),
            stripe_webhook_tolerance_secs: std::env::var("STRIPE_WEBHOOK_TOLERANCE_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(300),
            jwt_secret: Self::require_secret("JWT_SECRET", &environment)?,
            plan_catalog_path: std::env::var("PLAN_CATALOG_PATH")
                .ok()
                .filter(|s| !s.is_empty()),
            environment,
        })
    }

    /// Build the plan catalog once at startup
    pub fn load_catalog(&self) -> Result<PlanCatalog, BoxError> {
        match &self.plan_catalog_path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| format!("failed to read plan catalog {path}: {e}"))?;
                let catalog = PlanCatalog::from_json(&json)?;
                tracing::info!(path = %path, plans = catalog.plans().len(), "Loaded plan catalog");
                Ok(catalog)
            }
            None => Ok(PlanCatalog::standard()),
        }
    }
}
