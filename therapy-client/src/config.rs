//! Client configuration

use std::time::Duration;

/// Client configuration for the billing API
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL (e.g., "http://localhost:8080")
    pub base_url: String,

    /// JWT token for authentication
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Wait after returning from checkout before the first reconciliation
    pub settle_delay: Duration,

    /// Retry delay unit; the wait after attempt `n` is `retry_step * n`
    pub retry_step: Duration,

    /// Reconciliation attempts before verification gives up
    pub max_attempts: u32,

    /// Background reconciliation interval
    pub refresh_interval: Duration,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: None,
            timeout: 30,
            settle_delay: Duration::from_secs(2),
            retry_step: Duration::from_secs(2),
            max_attempts: 3,
            refresh_interval: Duration::from_secs(60),
        }
    }

    /// Set the JWT token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_retry_step(mut self, step: Duration) -> Self {
        self.retry_step = step;
        self
    }

    /// Set the attempt budget (at least one attempt is always made)
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Create an HTTP billing client from this configuration
    pub fn build_http_client(&self) -> crate::ClientResult<crate::HttpBillingClient> {
        crate::HttpBillingClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8080")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.settle_delay, Duration::from_secs(2));
        assert_eq!(config.retry_step, Duration::from_secs(2));
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.refresh_interval, Duration::from_secs(60));
        assert!(config.token.is_none());
    }

    #[test]
    fn test_builder() {
        let config = ClientConfig::new("https://billing.example.com")
            .with_token("jwt")
            .with_max_attempts(0)
            .with_retry_step(Duration::from_millis(5));
        assert_eq!(config.token.as_deref(), Some("jwt"));
        assert_eq!(config.max_attempts, 1);
        assert_eq!(config.retry_step, Duration::from_millis(5));
    }
}
