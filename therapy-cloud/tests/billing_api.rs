mod common;

use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::json;

use common::*;

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Request::get("/health").body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_reconcile_requires_auth() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Request::post("/api/billing/check-subscription")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 1001);

    let (status, _) = app
        .authed("POST", "/api/billing/check-subscription", "not-a-jwt")
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.record_count(), 0);
}

#[tokio::test]
async fn test_reconcile_never_subscribed() {
    let app = TestApp::new();
    let user = app.add_user("new@example.com");
    let token = app.token_for(user, "new@example.com");

    let (status, body) = app
        .authed("POST", "/api/billing/check-subscription", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "subscribed": false,
            "plan": "none",
            "product_id": null,
            "subscription_end": null
        })
    );
    assert_eq!(app.store.record_count(), 0);
}

#[tokio::test]
async fn test_reconcile_active_subscription() {
    let app = TestApp::new();
    let user = app.add_user("t@example.com");
    app.stripe.add_customer("cus_1", "t@example.com");
    app.stripe
        .set_subscription(provider_subscription("active", "prod_therapist_starter"));
    let token = app.token_for(user, "t@example.com");

    let (status, body) = app
        .authed("POST", "/api/billing/check-subscription", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["subscribed"], true);
    assert_eq!(body["plan"], "therapist_starter");
    assert_eq!(body["product_id"], "prod_therapist_starter");
    assert_eq!(body["subscription_end"], "2027-01-15T08:00:00Z");
    assert_eq!(app.store.get(user).unwrap().plan, "therapist_starter");
}

#[tokio::test]
async fn test_reconcile_provider_outage_is_503() {
    let app = TestApp::new();
    let user = app.add_user("t@example.com");
    app.stripe.set_unavailable(true);
    let token = app.token_for(user, "t@example.com");

    let (status, body) = app
        .authed("POST", "/api/billing/check-subscription", &token)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], 5001);
}

#[tokio::test]
async fn test_entitlements_and_capacity() {
    let app = TestApp::new();
    let user = app.add_user("t@example.com");
    app.stripe.add_customer("cus_1", "t@example.com");
    app.stripe
        .set_subscription(provider_subscription("active", "prod_therapist_starter"));
    let token = app.token_for(user, "t@example.com");
    app.authed("POST", "/api/billing/check-subscription", &token)
        .await;

    app.users.set_active_dependents(user, 9);
    let (status, body) = app.authed("GET", "/api/billing/entitlements", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "therapist_starter");
    assert_eq!(body["status"], "active");
    assert_eq!(body["role"], "therapist");
    assert_eq!(body["max_dependents"], json!({ "limited": 10 }));
    assert_eq!(body["active_dependents"], 9);
    assert_eq!(body["can_add_dependent"], true);

    let (status, body) = app
        .authed("POST", "/api/billing/dependents/authorize", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "allowed": true }));

    app.users.set_active_dependents(user, 10);
    let (status, body) = app
        .authed("POST", "/api/billing/dependents/authorize", &token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 3003);
    assert_eq!(body["details"]["current"], 10);
    assert_eq!(body["details"]["max"], 10);
}

#[tokio::test]
async fn test_no_plan_cannot_add_dependents() {
    let app = TestApp::new();
    let user = app.add_user("t@example.com");
    let token = app.token_for(user, "t@example.com");

    let (status, body) = app.authed("GET", "/api/billing/entitlements", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["plan"], "none");
    assert_eq!(body["features"], json!([]));
    assert_eq!(body["max_dependents"], "unentitled");

    let (status, _) = app
        .authed("POST", "/api/billing/dependents/authorize", &token)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
