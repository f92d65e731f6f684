//! HTTP client for the billing API

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::ReconcileResponse;
use shared::billing::EntitlementsResponse;

use crate::{ClientConfig, ClientError, ClientResult};

/// Billing operations the client side depends on
#[async_trait]
pub trait BillingApi: Send + Sync {
    /// On-Demand Reconciliation for the authenticated user
    async fn check_subscription(&self) -> ClientResult<ReconcileResponse>;

    /// Resolved entitlements for the authenticated user
    async fn entitlements(&self) -> ClientResult<EntitlementsResponse>;

    /// Capacity Guard before inviting a dependent
    async fn authorize_dependent(&self) -> ClientResult<bool>;
}

/// HTTP client for the billing endpoints
#[derive(Debug, Clone)]
pub struct HttpBillingClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBillingClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        })
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.authorize(self.client.get(self.url(path))).send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request without body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let response = self.authorize(self.client.post(self.url(path))).send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
                StatusCode::BAD_REQUEST => Err(ClientError::Validation(text)),
                StatusCode::SERVICE_UNAVAILABLE
                | StatusCode::BAD_GATEWAY
                | StatusCode::GATEWAY_TIMEOUT => Err(ClientError::Unavailable(text)),
                _ => Err(ClientError::Internal(text)),
            };
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl BillingApi for HttpBillingClient {
    async fn check_subscription(&self) -> ClientResult<ReconcileResponse> {
        self.post_empty("/api/billing/check-subscription").await
    }

    async fn entitlements(&self) -> ClientResult<EntitlementsResponse> {
        self.get("/api/billing/entitlements").await
    }

    async fn authorize_dependent(&self) -> ClientResult<bool> {
        #[derive(serde::Deserialize)]
        struct Allowed {
            allowed: bool,
        }

        match self
            .post_empty::<Allowed>("/api/billing/dependents/authorize")
            .await
        {
            Ok(resp) => Ok(resp.allowed),
            Err(ClientError::Forbidden(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
