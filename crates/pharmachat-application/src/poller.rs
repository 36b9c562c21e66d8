//! Scheduled order polling with a cancellable handle.
//!
//! Replaces ad-hoc interval refetching: callers get a [`PollHandle`] they
//! can stop, and the coordinator stops it automatically when the selected
//! patient changes.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use pharmachat_core::agent::AgentGateway;
use pharmachat_core::order::Order;

/// Handle to a running order poll. Dropping the handle does not stop the
/// task; call [`PollHandle::stop`].
pub struct PollHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Signals the poll loop to stop. Idempotent.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_finished()
    }
}

/// Spawns a poll loop fetching one patient's orders every `period`.
///
/// Snapshots are pushed into `tx`; fetch failures are logged and the next
/// tick retried. The loop exits when cancelled or when the receiver is
/// dropped.
pub fn spawn_order_poll(
    gateway: Arc<dyn AgentGateway>,
    patient_id: String,
    period: Duration,
    tx: mpsc::Sender<Vec<Order>>,
) -> PollHandle {
    let token = CancellationToken::new();
    let loop_token = token.clone();

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = loop_token.cancelled() => break,
                _ = interval.tick() => {
                    match gateway.orders(Some(&patient_id)).await {
                        Ok(orders) => {
                            if tx.send(orders).await.is_err() {
                                // Receiver gone; nobody is watching anymore.
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::debug!(patient_id = %patient_id, "order poll failed: {e}");
                        }
                    }
                }
            }
        }
        tracing::debug!(patient_id = %patient_id, "order poll stopped");
    });

    PollHandle { token, task }
}
