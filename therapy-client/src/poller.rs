//! Periodic reconciliation for long-lived sessions
//!
//! Reconciles on a fixed interval (first run immediately) and then refreshes
//! entitlements, publishing both through `watch` channels. A failed refresh
//! keeps the last known value; entitlements only become `Failed` if nothing
//! was ever resolved.

use std::sync::Arc;
use std::time::Duration;

use shared::{EntitlementState, ReconcileResponse};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::http::BillingApi;

/// Handle to a running poller
pub struct PollerHandle {
    subscription: watch::Receiver<Option<ReconcileResponse>>,
    entitlements: watch::Receiver<EntitlementState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Latest reconciliation result (`None` until the first success)
    pub fn subscription(&self) -> watch::Receiver<Option<ReconcileResponse>> {
        self.subscription.clone()
    }

    /// Fail-closed entitlement view
    pub fn entitlements(&self) -> watch::Receiver<EntitlementState> {
        self.entitlements.clone()
    }

    /// Stop polling and wait for the task to exit
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("Subscription poller task failed: {e}");
        }
    }
}

pub struct SubscriptionPoller {
    api: Arc<dyn BillingApi>,
    interval: Duration,
}

impl SubscriptionPoller {
    pub fn new(api: Arc<dyn BillingApi>, interval: Duration) -> Self {
        Self { api, interval }
    }

    /// Spawn the polling loop; it stops when `cancel` (or the handle) is cancelled
    pub fn spawn(self, cancel: CancellationToken) -> PollerHandle {
        let (sub_tx, sub_rx) = watch::channel(None);
        let (ent_tx, ent_rx) = watch::channel(EntitlementState::Loading);

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            self.run(sub_tx, ent_tx, task_cancel).await;
        });

        PollerHandle {
            subscription: sub_rx,
            entitlements: ent_rx,
            cancel,
            task,
        }
    }

    async fn run(
        self,
        sub_tx: watch::Sender<Option<ReconcileResponse>>,
        ent_tx: watch::Sender<EntitlementState>,
        cancel: CancellationToken,
    ) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Subscription poller stopped");
                    break;
                }
                _ = interval.tick() => {
                    self.refresh(&sub_tx, &ent_tx).await;
                }
            }
        }
    }

    async fn refresh(
        &self,
        sub_tx: &watch::Sender<Option<ReconcileResponse>>,
        ent_tx: &watch::Sender<EntitlementState>,
    ) {
        match self.api.check_subscription().await {
            Ok(resp) => {
                sub_tx.send_if_modified(|current| {
                    if current.as_ref() == Some(&resp) {
                        false
                    } else {
                        *current = Some(resp);
                        true
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Periodic reconciliation failed, keeping last state");
            }
        }

        match self.api.entitlements().await {
            Ok(resp) => {
                ent_tx.send_replace(EntitlementState::Resolved(resp.entitlements()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Entitlement refresh failed");
                // A resolved bundle stays in force, at most one interval stale;
                // only a session that never resolved fails closed
                ent_tx.send_if_modified(|state| {
                    if matches!(state, EntitlementState::Loading) {
                        *state = EntitlementState::Failed;
                        true
                    } else {
                        false
                    }
                });
            }
        }
    }
}
