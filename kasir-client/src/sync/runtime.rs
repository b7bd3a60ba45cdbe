//! Synchronizer runtime
//!
//! A single task owns the [`SyncState`] and consumes one input queue: push
//! events, channel up/down signals, local confirmations and resync
//! requests. Bulk fetches and verification fetches run as spawned tasks and
//! report back on an internal queue, so the loop never blocks on I/O. The
//! resulting cache is published read-only through a `watch` channel.

use super::state::{Reconciled, SyncState};
use crate::config::SyncConfig;
use crate::service::OrderService;
use crate::{ClientError, ClientResult};
use chrono::{DateTime, Utc};
use shared::message::ChangeEvent;
use shared::models::{Order, OrderSummary, PendingOrders};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Inputs accepted by the synchronizer
#[derive(Debug, Clone)]
pub enum SyncInput {
    /// Row change from the push channel
    Push(ChangeEvent),
    ChannelUp,
    ChannelDown,
    /// Fetch a fresh snapshot now
    Resync,
    /// Order created by this terminal
    Created(Order),
    /// Pay/cancel confirmed by the service
    Finalized(Uuid),
    /// Authoritative copy fetched during reconciliation
    Reconciled(Order),
    /// Order no longer exists on the service
    Gone(Uuid),
}

/// Results of spawned fetches
enum Completion {
    Snapshot {
        issued_at: DateTime<Utc>,
        result: ClientResult<PendingOrders>,
    },
    Verified {
        id: Uuid,
        issued_at: DateTime<Utc>,
        result: ClientResult<Order>,
    },
}

/// Read-only view of the pending queue
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingView {
    /// Pending orders, oldest first
    pub orders: Vec<OrderSummary>,
    pub channel_connected: bool,
    pub last_snapshot_at: Option<DateTime<Utc>>,
}

impl PendingView {
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.orders.iter().any(|o| o.id == id)
    }

    pub fn get(&self, id: Uuid) -> Option<&OrderSummary> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// Age of the data shown, if a snapshot was ever applied
    pub fn staleness(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.last_snapshot_at.map(|at| now - at)
    }
}

/// Handle to a running synchronizer
#[derive(Debug, Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncInput>,
    view: watch::Receiver<PendingView>,
    cancel: CancellationToken,
}

impl SyncHandle {
    /// Current view
    pub fn view(&self) -> PendingView {
        self.view.borrow().clone()
    }

    /// Subscribe to view changes
    pub fn subscribe(&self) -> watch::Receiver<PendingView> {
        self.view.clone()
    }

    /// Input queue, for producers such as the push channel
    pub fn sender(&self) -> mpsc::Sender<SyncInput> {
        self.tx.clone()
    }

    /// Cancellation token shared with the runtime
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn send(&self, input: SyncInput) -> ClientResult<()> {
        self.tx.send(input).await.map_err(|_| {
            ClientError::TransientNetwork("Synchronizer is not running".to_string())
        })
    }

    /// Send without failing the caller; the next snapshot repairs a lost input
    pub async fn notify(&self, input: SyncInput) {
        if let Err(e) = self.send(input).await {
            tracing::warn!(error = %e, "Synchronizer input dropped");
        }
    }

    pub async fn resync(&self) -> ClientResult<()> {
        self.send(SyncInput::Resync).await
    }

    /// Wait until the view satisfies `predicate`
    pub async fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> ClientResult<PendingView>
    where
        F: FnMut(&PendingView) -> bool,
    {
        let mut rx = self.view.clone();
        let wait = async {
            let view = rx
                .wait_for(|v| predicate(v))
                .await
                .map_err(|_| ClientError::TransientNetwork("Synchronizer stopped".to_string()))?;
            Ok(view.clone())
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| ClientError::TransientNetwork("Timed out waiting for pending queue".to_string()))?
    }

    /// Stop the runtime (and anything sharing its token)
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Pending queue synchronizer
pub struct Synchronizer {
    orders: Arc<dyn OrderService>,
    state: SyncState,
    config: SyncConfig,
    view_tx: watch::Sender<PendingView>,
    done_tx: mpsc::UnboundedSender<Completion>,
    fetch_in_flight: bool,
    fetch_again: bool,
}

impl Synchronizer {
    /// Spawn the runtime; an initial snapshot is requested immediately
    pub fn spawn(
        orders: Arc<dyn OrderService>,
        config: SyncConfig,
        queue_capacity: usize,
        cancel: CancellationToken,
    ) -> (SyncHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let (view_tx, view_rx) = watch::channel(PendingView::default());
        let (done_tx, done_rx) = mpsc::unbounded_channel();

        let runtime = Self {
            orders,
            state: SyncState::new(
                config.finalized_capacity,
                config.clock_skew_margin,
                config.invoice_offset,
            ),
            config,
            view_tx,
            done_tx,
            fetch_in_flight: false,
            fetch_again: false,
        };

        let handle = SyncHandle {
            tx,
            view: view_rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(runtime.run(rx, done_rx, cancel));
        (handle, task)
    }

    async fn run(
        mut self,
        mut inputs: mpsc::Receiver<SyncInput>,
        mut done: mpsc::UnboundedReceiver<Completion>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.config.resync_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            resync_secs = self.config.resync_interval.as_secs(),
            "Pending order synchronizer started"
        );

        loop {
            let changed = tokio::select! {
                _ = cancel.cancelled() => break,
                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => break,
                },
                Some(completion) = done.recv() => self.handle_completion(completion),
                // First tick fires immediately: initial snapshot
                _ = ticker.tick() => {
                    self.request_snapshot();
                    false
                }
            };
            if changed {
                self.publish();
            }
        }

        tracing::info!("Pending order synchronizer stopped");
    }

    fn publish(&self) {
        let view = PendingView {
            orders: self.state.orders(),
            channel_connected: self.state.channel_connected(),
            last_snapshot_at: self.state.last_snapshot_at(),
        };
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }

    /// Returns true if the view may have changed
    fn handle_input(&mut self, input: SyncInput) -> bool {
        let now = Utc::now();
        match input {
            SyncInput::Push(event) => {
                let outcome = self.state.apply_event(&event, now);
                self.follow_up(outcome, "push")
            }
            SyncInput::ChannelUp => {
                tracing::info!("Push channel connected, refreshing pending orders");
                self.state.set_channel_connected(true);
                self.request_snapshot();
                true
            }
            SyncInput::ChannelDown => {
                tracing::warn!("Push channel disconnected, falling back to periodic refresh");
                self.state.set_channel_connected(false);
                self.request_snapshot();
                true
            }
            SyncInput::Resync => {
                self.request_snapshot();
                false
            }
            SyncInput::Created(order) => {
                let outcome = self.state.record_created(&order);
                self.follow_up(outcome, "created")
            }
            SyncInput::Finalized(id) => {
                let outcome = self.state.finalize(id);
                self.follow_up(outcome, "finalized")
            }
            SyncInput::Reconciled(order) => {
                let outcome = self.state.apply_order(&order);
                self.follow_up(outcome, "reconciled")
            }
            SyncInput::Gone(id) => {
                let outcome = self.state.finalize(id);
                self.follow_up(outcome, "gone")
            }
        }
    }

    fn handle_completion(&mut self, completion: Completion) -> bool {
        match completion {
            Completion::Snapshot { issued_at, result } => {
                self.fetch_in_flight = false;
                let changed = match result {
                    Ok(pending) => {
                        let outcome = self.state.replace_snapshot(pending.orders, issued_at, Utc::now());
                        if let Reconciled::Replaced { count, verify } = &outcome {
                            tracing::info!(count = *count, verify = verify.len(), "Pending snapshot applied");
                        }
                        self.follow_up(outcome, "snapshot")
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Pending snapshot fetch failed");
                        false
                    }
                };
                if self.fetch_again {
                    self.fetch_again = false;
                    self.request_snapshot();
                }
                changed
            }
            Completion::Verified { id, issued_at, result } => match result {
                Ok(order) => {
                    let outcome = self.state.apply_verified(&order, issued_at);
                    tracing::debug!(order_id = %id, status = %order.status, "Order verified");
                    self.follow_up(outcome, "verified")
                }
                Err(ClientError::NotFound(_)) => {
                    let outcome = self.state.finalize(id);
                    self.follow_up(outcome, "verified")
                }
                Err(e) => {
                    tracing::warn!(order_id = %id, error = %e, "Order verification failed");
                    self.state.verification_failed(id);
                    false
                }
            },
        }
    }

    /// Log the outcome and start any verification it asks for
    fn follow_up(&mut self, outcome: Reconciled, source: &'static str) -> bool {
        match &outcome {
            Reconciled::Inserted(id) => tracing::debug!(order_id = %id, source, "Pending order added"),
            Reconciled::Updated(id) => tracing::debug!(order_id = %id, source, "Pending order updated"),
            Reconciled::Removed(id) => tracing::debug!(order_id = %id, source, "Pending order removed"),
            Reconciled::Suppressed(id) => {
                tracing::debug!(order_id = %id, source, "Stale pending row for finalized order suppressed")
            }
            Reconciled::Verify(id) => {
                tracing::debug!(order_id = %id, source, "Pending row predates snapshot, verifying");
                self.spawn_verification(*id);
            }
            Reconciled::Replaced { verify, .. } => {
                for id in verify.clone() {
                    self.spawn_verification(id);
                }
            }
            Reconciled::StaleSnapshot => tracing::debug!(source, "Out-of-date snapshot discarded"),
            Reconciled::Unchanged | Reconciled::Ignored => {}
        }
        outcome.changed()
    }

    /// Start a bulk fetch, or queue one behind the fetch in flight
    fn request_snapshot(&mut self) {
        if self.fetch_in_flight {
            self.fetch_again = true;
            return;
        }
        self.fetch_in_flight = true;

        let orders = Arc::clone(&self.orders);
        let done = self.done_tx.clone();
        let issued_at = Utc::now();
        tokio::spawn(async move {
            let result = orders.get_pending().await;
            let _ = done.send(Completion::Snapshot { issued_at, result });
        });
    }

    fn spawn_verification(&self, id: Uuid) {
        let orders = Arc::clone(&self.orders);
        let done = self.done_tx.clone();
        let issued_at = Utc::now();
        tokio::spawn(async move {
            let result = orders.get(id).await;
            let _ = done.send(Completion::Verified { id, issued_at, result });
        });
    }
}
