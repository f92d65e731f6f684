//! Stripe REST client (no SDK dependency)

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::types::{Customer, List, Subscription};
use super::{BillingProvider, ProviderError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Read-only Stripe client used by reconciliation and ingestion
#[derive(Debug, Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    /// GET a Stripe resource; `Ok(None)` on 404
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, ProviderError> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .basic_auth(&self.secret_key, None::<&str>)
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body: serde_json::Value = resp.json().await.unwrap_or_default();
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("no error message")
                .to_string();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<Customer>, ProviderError> {
        let list: Option<List<Customer>> = self
            .get("/v1/customers", &[("email", email), ("limit", "1")])
            .await?;
        Ok(list.and_then(|l| l.data.into_iter().find(|c| !c.deleted)))
    }

    async fn get_customer(&self, customer_id: &str) -> Result<Option<Customer>, ProviderError> {
        let customer: Option<Customer> = self.get(&format!("/v1/customers/{customer_id}"), &[]).await?;
        Ok(customer.filter(|c| !c.deleted))
    }

    async fn list_subscriptions(
        &self,
        customer_id: &str,
        status: &str,
    ) -> Result<Vec<Subscription>, ProviderError> {
        let list: Option<List<Subscription>> = self
            .get(
                "/v1/subscriptions",
                &[("customer", customer_id), ("status", status), ("limit", "1")],
            )
            .await?;
        Ok(list.map(|l| l.data).unwrap_or_default())
    }
}
