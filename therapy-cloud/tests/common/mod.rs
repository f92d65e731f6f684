#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shared::PlanCatalog;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use therapy_cloud::billing::BillingService;
use therapy_cloud::db::{MemoryStore, MemoryUserDirectory};
use therapy_cloud::stripe::{MemoryProvider, Subscription};
use therapy_cloud::{AppState, Config, create_router};

pub const WEBHOOK_SECRET: &str = "whsec_integration";
pub const JWT_SECRET: &str = "jwt_integration";

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub users: MemoryUserDirectory,
    pub stripe: Arc<MemoryProvider>,
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".into(),
        http_port: 0,
        environment: "development".into(),
        stripe_secret_key: "sk_test".into(),
        stripe_webhook_secret: WEBHOOK_SECRET.into(),
        stripe_api_base: "http://127.0.0.1:0".into(),
        stripe_webhook_tolerance_secs: 300,
        jwt_secret: JWT_SECRET.into(),
        plan_catalog_path: None,
    }
}

impl TestApp {
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let users = MemoryUserDirectory::new();
        let stripe = Arc::new(MemoryProvider::new());
        let billing = BillingService::new(
            Arc::new(store.clone()),
            Arc::new(users.clone()),
            stripe.clone(),
            Arc::new(PlanCatalog::standard()),
        );
        let state = AppState::with_billing(billing, &test_config());
        Self {
            router: create_router(state),
            store,
            users,
            stripe,
        }
    }

    pub fn add_user(&self, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.users.add_user(email, id);
        id
    }

    pub fn token_for(&self, user_id: Uuid, email: &str) -> String {
        therapy_cloud::auth::create_token(user_id, email, JWT_SECRET).unwrap()
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(request).await.unwrap();
        read_json(resp).await
    }

    /// POST a correctly signed webhook
    pub async fn webhook(&self, payload: &Value) -> (StatusCode, Value) {
        let body = serde_json::to_vec(payload).unwrap();
        let signature =
            therapy_cloud::stripe::sign_payload(&body, WEBHOOK_SECRET, chrono::Utc::now().timestamp());
        let request = Request::post("/stripe/webhook")
            .header("stripe-signature", signature)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn authed(&self, method: &str, uri: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }
}

pub async fn read_json(resp: Response<Body>) -> (StatusCode, Value) {
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

pub fn subscription_event(id: &str, event_type: &str, status: &str, product: &str) -> Value {
    json!({
        "id": id,
        "type": event_type,
        "data": { "object": subscription_object(status, product) }
    })
}

pub fn subscription_object(status: &str, product: &str) -> Value {
    json!({
        "id": "sub_1",
        "customer": "cus_1",
        "status": status,
        "current_period_end": 1_800_000_000,
        "items": { "data": [{ "id": "si_1", "price": { "id": "price_1", "product": product } }] }
    })
}

pub fn provider_subscription(status: &str, product: &str) -> Subscription {
    serde_json::from_value(subscription_object(status, product)).unwrap()
}
