//! Stripe webhook handler
//!
//! POST /stripe/webhook: Billing Event Ingestion (raw body for signature verification)

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use serde_json::{Value, json};
use shared::error::{AppError, ErrorCode};
use shared::util::now_millis;

use crate::error::ServiceError;
use crate::state::AppState;
use crate::stripe::{self, WebhookEvent};

type WebhookResponse = (StatusCode, Json<Value>);

fn rejected(err: AppError) -> WebhookResponse {
    (err.http_status(), Json(json!({ "error": err.message })))
}

fn bad_signature(message: impl Into<String>) -> WebhookResponse {
    rejected(AppError::with_message(ErrorCode::WebhookSignatureInvalid, message))
}

/// Handle incoming Stripe webhook events
///
/// Must receive raw body (not JSON) for HMAC signature verification.
/// 200 acknowledges (including duplicates and ignored types), 400 drops a
/// forged or unparseable event, 500 asks Stripe to redeliver.
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> WebhookResponse {
    // 1. Get Stripe-Signature header
    let Some(sig_header) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        tracing::warn!("Missing Stripe-Signature header");
        return bad_signature("Missing Stripe-Signature header");
    };

    // 2. Verify signature
    if let Err(e) = stripe::verify_webhook_signature(
        &body,
        sig_header,
        &state.stripe_webhook_secret,
        state.webhook_tolerance_secs,
    ) {
        tracing::warn!(error = %e, "Webhook signature verification failed");
        return bad_signature(e.to_string());
    }

    // 3. Parse event envelope
    let event = match WebhookEvent::parse(&body) {
        Ok(event) => event,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return rejected(AppError::with_message(
                ErrorCode::WebhookPayloadInvalid,
                format!("Invalid webhook payload: {e}"),
            ));
        }
    };

    tracing::info!(event_id = %event.id, event_type = %event.event_type, "Received Stripe webhook");

    // 4. Apply
    match state.billing.ingest(&event, now_millis()).await {
        Ok(outcome) => {
            tracing::debug!(event_id = %event.id, ?outcome, "Webhook processed");
            (StatusCode::OK, Json(json!({ "received": true })))
        }
        Err(ServiceError::App(e)) if e.code == ErrorCode::WebhookPayloadInvalid => rejected(e),
        Err(e) => {
            tracing::error!(
                event_id = %event.id,
                event_type = %event.event_type,
                error = %e,
                "Failed to apply webhook event"
            );
            let app_err: AppError = e.into();
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": app_err.message })),
            )
        }
    }
}
