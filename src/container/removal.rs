//! Batched, serialized container removal.
//!
//! Removal runs in two stages:
//!
//! 1. **Batching**: closing the last tab of a container appends the
//!    container to the pending batch of its [`RemovalClass`]. The first
//!    append opens a 15 second collection window, after which the batch
//!    is drained and dispatched according to the class's
//!    [`RemovalPolicy`](crate::config::RemovalPolicy).
//! 2. **Worker**: a single task drains dispatched batches one at a time.
//!    Delayed policies park the batch in the delay scheduler first.
//!
//! ```text
//!  enqueue ──► pending batch ──15s──► instant ───────────────┐
//!                                 └─► delay scheduler ──Ns──►├─► worker (concurrency 1)
//!  sweep ───────────────────────────────────────────────────┘
//! ```
//!
//! Concurrent identity removals were observed to corrupt the host's
//! container bookkeeping, so the worker never runs two batches at once.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::host::Notification;
use crate::identifiers::{ContainerId, TabId};
use crate::storage::TempContainer;

use super::manager::ManagerInner;

// ============================================================================
// Constants
// ============================================================================

/// How long a fresh batch collects further candidates.
pub const COLLECTION_WINDOW: Duration = Duration::from_secs(15);

/// Pause after each successful removal within a batch.
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// Types
// ============================================================================

/// Removal class of a container; each class has its own policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemovalClass {
    /// Regular temporary container.
    Regular,
    /// Container whose navigations are purged from history.
    DeletesHistory,
}

impl RemovalClass {
    /// Class of a container record.
    #[inline]
    #[must_use]
    pub fn of(container: &TempContainer) -> Self {
        if container.deletes_history {
            Self::DeletesHistory
        } else {
            Self::Regular
        }
    }
}

/// Pending batches per removal class.
#[derive(Debug, Default)]
pub(crate) struct RemovalBatches {
    regular: Vec<ContainerId>,
    deletes_history: Vec<ContainerId>,
}

impl RemovalBatches {
    /// Appends a candidate, returning `true` if it started a new batch.
    pub(crate) fn push(&mut self, class: RemovalClass, id: ContainerId) -> bool {
        let batch = self.batch_mut(class);
        batch.push(id);
        batch.len() == 1
    }

    /// Takes the whole pending batch of a class.
    pub(crate) fn drain(&mut self, class: RemovalClass) -> Vec<ContainerId> {
        std::mem::take(self.batch_mut(class))
    }

    fn batch_mut(&mut self, class: RemovalClass) -> &mut Vec<ContainerId> {
        match class {
            RemovalClass::Regular => &mut self.regular,
            RemovalClass::DeletesHistory => &mut self.deletes_history,
        }
    }
}

/// Sizes of the two queues.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct QueueCounters {
    /// Batches inside a collection window.
    collecting: usize,
    /// Batches waiting for the worker.
    worker_size: usize,
    /// Batches the worker is running.
    worker_pending: usize,
    /// Batches parked in the delay scheduler.
    delay_pending: usize,
}

impl QueueCounters {
    fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// RemovalQueue
// ============================================================================

/// Worker channel, queue sizes and the busy flag.
pub(crate) struct RemovalQueue {
    worker_tx: mpsc::UnboundedSender<Vec<ContainerId>>,
    counters: Mutex<QueueCounters>,
    busy: AtomicBool,
}

impl RemovalQueue {
    /// Creates the queue and the receiving end for [`run_worker`].
    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<Vec<ContainerId>>) {
        let (worker_tx, worker_rx) = mpsc::unbounded_channel();
        let queue = Self {
            worker_tx,
            counters: Mutex::new(QueueCounters::default()),
            busy: AtomicBool::new(false),
        };
        (queue, worker_rx)
    }

    /// Returns `true` while any batch is collecting, delayed or running.
    #[inline]
    pub(crate) fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    #[inline]
    fn set_busy(&self) {
        self.busy.store(true, Ordering::SeqCst);
    }

    /// Submits a batch to the worker.
    pub(crate) fn submit(&self, batch: Vec<ContainerId>) {
        self.set_busy();
        self.counters.lock().worker_size += 1;
        if self.worker_tx.send(batch).is_err() {
            self.counters.lock().worker_size -= 1;
            warn!("Removal worker is gone, dropping batch");
        }
    }

    fn collecting_started(&self) {
        self.set_busy();
        self.counters.lock().collecting += 1;
    }

    fn collecting_finished(&self) {
        self.counters.lock().collecting -= 1;
        self.clear_busy_if_idle();
    }

    fn delay_started(&self) {
        self.counters.lock().delay_pending += 1;
    }

    fn delay_finished(&self) {
        self.counters.lock().delay_pending -= 1;
        self.clear_busy_if_idle();
    }

    fn worker_started(&self) {
        let mut counters = self.counters.lock();
        counters.worker_size -= 1;
        counters.worker_pending += 1;
    }

    fn worker_finished(&self) {
        self.counters.lock().worker_pending -= 1;
    }

    /// Clears the busy flag if both queues are empty and idle.
    fn clear_busy_if_idle(&self) -> bool {
        let counters = self.counters.lock();
        debug!(counters = ?*counters, "Maybe removal queue is done");
        if counters.is_idle() {
            self.busy.store(false, Ordering::SeqCst);
            true
        } else {
            false
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Drains dispatched batches one at a time until the manager is dropped.
pub(crate) async fn run_worker(
    manager: Weak<ManagerInner>,
    mut worker_rx: mpsc::UnboundedReceiver<Vec<ContainerId>>,
) {
    debug!("Removal worker started");
    while let Some(batch) = worker_rx.recv().await {
        let Some(inner) = manager.upgrade() else {
            break;
        };
        inner.queue.worker_started();
        inner.try_to_remove_queue(&batch).await;
        inner.queue.worker_finished();
        inner.removal_queue_maybe_done();
    }
    debug!("Removal worker terminated");
}

// ============================================================================
// ManagerInner - Batching
// ============================================================================

impl ManagerInner {
    /// Queues the container of a closed tab for removal.
    pub(crate) fn enqueue_removal(self: &Arc<Self>, tab_id: TabId) {
        let (class, started) = {
            let mut state = self.state.lock();
            let Some(id) = state.tab_container_map.get(&tab_id).cloned() else {
                debug!(tab_id = %tab_id, "Removed tab isn't in the tab container map");
                return;
            };
            let Some(container) = state.storage.temp_containers.get(&id) else {
                debug!(tab_id = %tab_id, container_id = %id, "Container from the tab container map is unknown");
                return;
            };
            let class = RemovalClass::of(container);
            debug!(tab_id = %tab_id, container_id = %id, ?class, "Queuing container removal because of tab removal");
            (class, state.removal_batches.push(class, id))
        };

        if !started {
            return;
        }

        debug!(?class, "Opening removal collection window");
        self.queue.collecting_started();
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            sleep(COLLECTION_WINDOW).await;
            if let Some(inner) = manager.upgrade() {
                inner.dispatch_batch(class).await;
                inner.queue.collecting_finished();
            }
        });
    }

    /// Drains a class's batch and hands it on according to its policy.
    async fn dispatch_batch(self: &Arc<Self>, class: RemovalClass) {
        let batch = self.state.lock().removal_batches.drain(class);
        let policy = self
            .preferences
            .read()
            .removal_policy(class == RemovalClass::DeletesHistory);

        match policy.delay() {
            None => {
                debug!(?class, ?batch, "Trying to instantly remove batch");
                self.queue.submit(batch);
            }
            Some(delay) => self.schedule_delayed(class, batch, delay).await,
        }
    }

    /// Parks a batch in the delay scheduler.
    async fn schedule_delayed(
        self: &Arc<Self>,
        class: RemovalClass,
        batch: Vec<ContainerId>,
        delay: Duration,
    ) {
        debug!(?class, ?batch, delay_secs = delay.as_secs(), "Registering delay for batch removal");
        self.maybe_show_notification(format!(
            "Queued {} Temporary Containers for removal in {}minutes",
            batch.len(),
            delay.as_secs() / 60
        ))
        .await;

        self.queue.delay_started();
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inner) = manager.upgrade() {
                debug!(?class, ?batch, "Trying to remove batch after delay");
                inner.queue.submit(batch);
                inner.queue.delay_finished();
            }
        });
    }

    /// Shows a notification if the user allowed them.
    async fn maybe_show_notification(&self, message: String) {
        if !self.preferences.read().notifications {
            return;
        }
        if !self.permissions.read().notifications {
            let err = Error::permission_denied("notifications");
            debug!(error = %err, "Skipping notification");
            return;
        }

        debug!(message = %message, "Showing notification");
        if let Err(e) = self
            .hosts
            .notifications
            .create_notification(Notification::basic(message))
            .await
        {
            warn!(error = %e, "Failed to show notification");
        }
    }

    /// Called after every worker batch.
    fn removal_queue_maybe_done(&self) {
        if self.queue.clear_busy_if_idle() {
            debug!("Removal queue is done");
            // Numbers may drift when a removal failed halfway.
            self.state.lock().recompute_numbers();
        }
    }
}

// ============================================================================
// ManagerInner - Removal
// ============================================================================

impl ManagerInner {
    /// Removes the containers of one batch, in order.
    pub(crate) async fn try_to_remove_queue(&self, batch: &[ContainerId]) {
        debug!(?batch, "Removing batch");
        for id in batch {
            if !self.state.lock().storage.temp_containers.contains_key(id) {
                debug!(container_id = %id, "Unknown container, probably already removed");
                continue;
            }
            if self.try_to_remove(id).await {
                debug!(container_id = %id, "Container removed, waiting a bit");
                sleep(SETTLE_DELAY).await;
            }
        }
        self.statistics.finish();
    }

    /// Removes one container if it is safe to do so.
    ///
    /// Returns `true` only when the host removed the identity. Every
    /// failure leaves the container for the next batch or sweep.
    pub(crate) async fn try_to_remove(&self, id: &ContainerId) -> bool {
        if self.hosts.tabs.only_incognito_none_or_session_restore().await {
            debug!(container_id = %id, "Canceling, only incognito or no tabs");
            return false;
        }

        if let Err(e) = self.provisioner.get(id).await {
            if e.is_not_found() {
                debug!(container_id = %id, "Container not found, removing entry from storage");
                {
                    let mut state = self.state.lock();
                    state.storage.release_number(id);
                    state.storage.temp_containers.remove(id);
                }
                self.persist().await;
            } else {
                warn!(container_id = %id, error = %e, "Failed to look up container");
            }
            return false;
        }

        match self.hosts.tabs.query_tabs(id).await {
            Ok(tabs) if !tabs.is_empty() => {
                let err = Error::still_in_use(id.clone(), tabs.len());
                debug!(error = %err, "Not removing container");
                return false;
            }
            Ok(_) => {
                debug!(container_id = %id, "No tabs in temporary container anymore, removing it");
            }
            Err(e) => {
                debug!(container_id = %id, error = %e, "Failed to query tabs");
                return false;
            }
        }

        let cookies = match self.hosts.cookies.get_all_cookies(id).await {
            Ok(cookies) => cookies,
            Err(e) => {
                debug!(container_id = %id, error = %e, "Couldn't get cookies");
                Vec::new()
            }
        };

        let history_cleared = self.maybe_clear_history(id);
        self.statistics.update(history_cleared, cookies.len(), id);
        self.state.lock().storage.release_number(id);

        let removed = match self.provisioner.remove(id).await {
            Ok(_) => {
                let mut state = self.state.lock();
                state.storage.temp_containers.remove(id);
                state.tab_container_map.retain(|_, container| container != id);
                info!(container_id = %id, cookies = cookies.len(), history_cleared, "Temporary container removed");
                true
            }
            Err(e) => {
                warn!(container_id = %id, error = %e, "Error while removing container");
                false
            }
        };

        self.persist().await;
        removed
    }
}

// ============================================================================
// Tests
// ============================================================================
