//! Redirect verification after a provider-hosted checkout
//!
//! `Verifying -> Success | Error`. On entry the verifier waits for the
//! settle delay so the webhook can land, then reconciles. A failed attempt
//! (request error, or a result that is not yet subscribed) is retried after
//! `retry_step * attempt` until the attempt budget is spent.

use std::sync::Arc;
use std::time::Duration;

use shared::ReconcileResponse;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::ClientConfig;
use crate::http::BillingApi;

/// Why verification ended in `Error`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    /// Returned from checkout without a session token
    MissingSessionToken,
    /// Every attempt failed; `last_error` is the final failure
    Exhausted { attempts: u32, last_error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    /// `attempt` is 0 while settling, then the attempt in flight
    Verifying { attempt: u32 },
    Success(ReconcileResponse),
    Error(VerificationFailure),
}

impl VerificationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, VerificationState::Verifying { .. })
    }
}

pub struct CheckoutVerifier {
    api: Arc<dyn BillingApi>,
    session_token: Option<String>,
    settle_delay: Duration,
    retry_step: Duration,
    max_attempts: u32,
    state: watch::Sender<VerificationState>,
    cancel: CancellationToken,
}

impl CheckoutVerifier {
    pub fn new(api: Arc<dyn BillingApi>, config: &ClientConfig, session_token: Option<String>) -> Self {
        let (state, _) = watch::channel(VerificationState::Verifying { attempt: 0 });
        Self {
            api,
            session_token: session_token.filter(|t| !t.is_empty()),
            settle_delay: config.settle_delay,
            retry_step: config.retry_step,
            max_attempts: config.max_attempts.max(1),
            state,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe state changes
    pub fn subscribe(&self) -> watch::Receiver<VerificationState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> VerificationState {
        self.state.borrow().clone()
    }

    /// Token that aborts verification (navigation away)
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Run verification to a terminal state
    ///
    /// Returns `None` if cancelled before reaching one.
    pub async fn run(&self) -> Option<VerificationState> {
        if self.session_token.is_none() {
            tracing::warn!("Checkout return without session token");
            return Some(self.finish(VerificationState::Error(
                VerificationFailure::MissingSessionToken,
            )));
        }

        self.state
            .send_replace(VerificationState::Verifying { attempt: 0 });
        if !self.pause(self.settle_delay).await {
            return None;
        }

        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            self.state
                .send_replace(VerificationState::Verifying { attempt });

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return None,
                result = self.api.check_subscription() => result,
            };

            match result {
                Ok(resp) if resp.subscribed => {
                    tracing::info!(attempt, plan = %resp.plan, "Checkout verified");
                    return Some(self.finish(VerificationState::Success(resp)));
                }
                Ok(resp) => {
                    tracing::debug!(attempt, plan = %resp.plan, "Subscription not settled yet");
                    last_error = "subscription not active yet".to_string();
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Checkout verification attempt failed");
                    last_error = e.to_string();
                }
            }

            if attempt < self.max_attempts && !self.pause(self.retry_step * attempt).await {
                return None;
            }
        }

        Some(self.finish(VerificationState::Error(VerificationFailure::Exhausted {
            attempts: self.max_attempts,
            last_error,
        })))
    }

    /// Manual retry from `Error`: resets the attempt counter and re-enters `Verifying`
    pub async fn retry(&self) -> Option<VerificationState> {
        if !matches!(self.state(), VerificationState::Error(_)) {
            return Some(self.state());
        }
        self.run().await
    }

    fn finish(&self, state: VerificationState) -> VerificationState {
        self.state.send_replace(state.clone());
        state
    }

    /// Sleep unless cancelled; `false` when cancelled
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }
}
