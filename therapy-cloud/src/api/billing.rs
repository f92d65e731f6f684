//! Billing endpoints: reconciliation, entitlements, capacity check

use axum::{Extension, Json, extract::State};
use serde_json::{Value, json};
use shared::ReconcileResponse;
use shared::billing::EntitlementsResponse;
use shared::util::now_millis;

use crate::auth::UserIdentity;
use crate::state::AppState;

use super::ApiResult;

/// POST /api/billing/check-subscription
pub async fn check_subscription(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<ReconcileResponse> {
    let resp = state
        .billing
        .reconcile(identity.user_id, &identity.email, now_millis())
        .await?;
    Ok(Json(resp))
}

/// GET /api/billing/entitlements
pub async fn entitlements(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<EntitlementsResponse> {
    let resp = state
        .billing
        .entitlements(identity.user_id, now_millis())
        .await?;
    Ok(Json(resp))
}

/// POST /api/billing/dependents/authorize
pub async fn authorize_dependent(
    State(state): State<AppState>,
    Extension(identity): Extension<UserIdentity>,
) -> ApiResult<Value> {
    state
        .billing
        .authorize_dependent(identity.user_id, now_millis())
        .await?;
    Ok(Json(json!({ "allowed": true })))
}
