//! API routes for therapy-cloud

pub mod billing;
pub mod health;
pub mod stripe_webhook;

use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::error::AppError;
use tower_http::trace::TraceLayer;

use crate::auth::user_auth_middleware;
use crate::state::AppState;

pub type ApiResult<T> = Result<axum::Json<T>, AppError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    // User billing API (JWT authenticated)
    let billing = Router::new()
        .route(
            "/api/billing/check-subscription",
            post(billing::check_subscription),
        )
        .route("/api/billing/entitlements", get(billing::entitlements))
        .route(
            "/api/billing/dependents/authorize",
            post(billing::authorize_dependent),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            user_auth_middleware,
        ));

    // Stripe webhook (signature-verified, raw body)
    let webhook = Router::new().route("/stripe/webhook", post(stripe_webhook::handle_webhook));

    Router::new()
        .route("/health", get(health::health_check))
        .merge(webhook)
        .merge(billing)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
