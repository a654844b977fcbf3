//! Periodic sweep of all tracked containers.
//!
//! Every tracked container goes through the regular removal worker as
//! one batch. Containers that still have tabs simply survive the sweep;
//! containers whose identity vanished are purged from storage.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

use super::manager::{ContainerManager, ManagerInner};

// ============================================================================
// Constants
// ============================================================================

/// Time between two periodic sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(600);

// ============================================================================
// ContainerManager - Cleanup
// ============================================================================

impl ContainerManager {
    /// Submits every tracked container to the removal worker.
    ///
    /// Skipped before initialization, and while a removal cycle is in
    /// flight unless this is the startup sweep.
    pub async fn cleanup(&self, browser_start: bool) {
        self.inner.cleanup(browser_start).await;
    }
}

// ============================================================================
// ManagerInner - Cleanup
// ============================================================================

impl ManagerInner {
    pub(crate) async fn cleanup(&self, browser_start: bool) {
        let containers: Vec<_> = {
            let state = self.state.lock();
            if !state.initialized {
                debug!("Skipping cleanup because not initialized");
                return;
            }
            state.storage.temp_containers.keys().cloned().collect()
        };

        if self.queue.is_busy() && !browser_start {
            debug!("Skipping cleanup because a removal batch is in flight");
            return;
        }
        if containers.is_empty() {
            debug!("Canceling cleanup, no containers at all");
            return;
        }
        if self.hosts.tabs.only_incognito_none_or_session_restore().await {
            debug!("Canceling cleanup, only incognito, no tabs or session restore");
            return;
        }

        debug!(count = containers.len(), browser_start, "Sweeping temporary containers");
        self.queue.submit(containers);
    }

    /// Starts the periodic sweep.
    pub(crate) fn start_sweeper(self: &Arc<Self>) {
        let manager = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + SWEEP_INTERVAL, SWEEP_INTERVAL);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = manager.upgrade() else {
                    break;
                };
                debug!("Container removal interval");
                inner.cleanup(false).await;
            }
        });

        if let Some(previous) = self.sweeper.lock().replace(handle) {
            previous.abort();
        }
    }
}
