//! History logging and erasure for history-deleting containers.

// ============================================================================
// Imports
// ============================================================================

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::host::TabInfo;
use crate::identifiers::ContainerId;
use crate::storage::HistoryEntry;

use super::manager::{ContainerManager, ManagerInner};

// ============================================================================
// Constants
// ============================================================================

/// Placeholder pages that are never logged.
const IGNORED_URLS: [&str; 2] = ["about:blank", "about:newtab"];

// ============================================================================
// ContainerManager - History Logging
// ============================================================================

impl ContainerManager {
    /// Logs a committed navigation if its tab lives in a
    /// history-deleting container.
    pub async fn maybe_add_history(&self, tab: &TabInfo, url: &str) {
        if IGNORED_URLS.contains(&url) || tab.cookie_store_id.is_default() {
            return;
        }

        let logged = {
            let mut state = self.inner.state.lock();
            match state.storage.temp_containers.get_mut(&tab.cookie_store_id) {
                Some(container) if container.deletes_history => {
                    container
                        .history
                        .get_or_insert_default()
                        .insert(url.to_string(), HistoryEntry { tab_id: tab.id });
                    true
                }
                _ => false,
            }
        };

        if logged {
            debug!(container_id = %tab.cookie_store_id, url, "Logged navigation for history deletion");
            self.inner.persist().await;
        }
    }
}

// ============================================================================
// ManagerInner - History Erasure
// ============================================================================

impl ManagerInner {
    /// Deletes every logged URL of a container from global history.
    ///
    /// Deletions run concurrently on a detached task. Returns the number
    /// of logged URLs.
    pub(crate) fn maybe_clear_history(&self, id: &ContainerId) -> usize {
        let urls: Vec<String> = {
            let state = self.state.lock();
            match state.storage.temp_containers.get(id) {
                Some(container) if container.deletes_history => container
                    .history
                    .as_ref()
                    .map(|history| history.keys().cloned().collect())
                    .unwrap_or_default(),
                _ => return 0,
            }
        };

        let count = urls.len();
        let history = self.hosts.history.clone();
        let container_id = id.clone();
        tokio::spawn(async move {
            let deletions = urls.iter().filter(|url| !url.is_empty()).map(|url| {
                let history = &history;
                let container_id = &container_id;
                async move {
                    debug!(container_id = %container_id, url = %url, "Removing url from history");
                    if let Err(e) = history.delete_url(url).await {
                        warn!(url = %url, error = %e, "Failed to delete url from history");
                    }
                }
            });
            join_all(deletions).await;
        });
        count
    }
}
