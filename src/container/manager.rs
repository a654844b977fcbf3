//! Lifecycle manager handle and shared state.
//!
//! The [`ContainerManager`] is a cheap-to-clone handle. All state lives
//! behind it: the container store, the tab→container map and the dedup
//! tables are owned by the manager and reachable only through its
//! operations.
//!
//! Locks are never held across an await point. Every read-modify-write
//! sequence over the shared state happens inside one lock scope; removal
//! is additionally funneled through the single removal worker.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rustc_hash::{FxHashMap, FxHashSet};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ContainerPreferences, Permissions, Preferences};
use crate::error::Result;
use crate::host::HostApis;
use crate::identifiers::{ContainerId, RequestId, TabId, WindowId};
use crate::statistics::StatisticsCollector;
use crate::storage::{StorageBackend, StorageData, TempContainer};

use super::allocator;
use super::builder::ManagerBuilder;
use super::palette::Palette;
use super::provisioner::IdentityProvisioner;
use super::removal::{RemovalBatches, RemovalQueue};

// ============================================================================
// Types
// ============================================================================

/// Mutable state of the manager.
#[derive(Default)]
pub(crate) struct ManagerState {
    /// Persisted container bookkeeping.
    pub storage: StorageData,
    /// Tab → temporary container.
    pub tab_container_map: FxHashMap<TabId, ContainerId>,
    /// URL → container created for it, expires after one second.
    pub url_created_container: FxHashMap<String, ContainerId>,
    /// Origin requests that already created a tab, expire after five minutes.
    pub request_created_tab: FxHashSet<RequestId>,
    /// Tabs opened as a confirmation page.
    pub tab_created_as_mac_confirm_page: FxHashSet<TabId>,
    /// Window → last tab created in the background.
    pub last_created_inactive_tab: FxHashMap<WindowId, TabId>,
    /// Removal candidates waiting for their collection window to close.
    pub removal_batches: RemovalBatches,
    /// Numbers handed out to containers whose record is not inserted yet.
    reserved_numbers: BTreeSet<u32>,
    /// Storage loaded and startup sweep issued.
    pub initialized: bool,
}

impl ManagerState {
    /// Allocates a new container and holds its number until the record
    /// is committed or the reservation is released.
    pub(crate) fn reserve(
        &mut self,
        prefs: &ContainerPreferences,
        palette: &Palette,
        url: Option<&str>,
    ) -> TempContainer {
        let container = allocator::allocate(&mut self.storage, prefs, palette, url);
        self.reserved_numbers.insert(container.number);
        container
    }

    /// Inserts the record of a reserved container.
    pub(crate) fn commit(&mut self, id: ContainerId, container: TempContainer) {
        self.reserved_numbers.remove(&container.number);
        self.storage.temp_containers_numbers.insert(container.number);
        self.storage.temp_containers.insert(id, container);
    }

    /// Gives back a number whose container never got a record.
    pub(crate) fn release_reservation(&mut self, number: u32) {
        self.reserved_numbers.remove(&number);
        self.storage.temp_containers_numbers.remove(&number);
    }

    /// Rebuilds the allocated-number set from the live records plus the
    /// reservations still in flight.
    pub(crate) fn recompute_numbers(&mut self) {
        self.storage.recompute_numbers();
        self.storage
            .temp_containers_numbers
            .extend(self.reserved_numbers.iter().copied());
    }
}

/// Internal shared state for the manager.
pub(crate) struct ManagerInner {
    /// Host APIs.
    pub hosts: HostApis,
    /// Identity pass-through.
    pub provisioner: IdentityProvisioner,
    /// Durable store.
    pub backend: Arc<dyn StorageBackend>,
    /// Removal statistics sink.
    pub statistics: Arc<dyn StatisticsCollector>,
    /// User preferences.
    pub preferences: RwLock<Preferences>,
    /// Granted optional permissions.
    pub permissions: RwLock<Permissions>,
    /// Colors and icons the host accepts.
    pub palette: Palette,
    /// Mutable state.
    pub state: Mutex<ManagerState>,
    /// Removal worker and delay scheduler bookkeeping.
    pub queue: RemovalQueue,
    /// Serializes flushes so the newest snapshot is written last.
    persist_lock: tokio::sync::Mutex<()>,
    /// Periodic cleanup task.
    pub sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl ManagerInner {
    /// Creates the shared state.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        hosts: HostApis,
        backend: Arc<dyn StorageBackend>,
        statistics: Arc<dyn StatisticsCollector>,
        preferences: Preferences,
        permissions: Permissions,
        palette: Palette,
        queue: RemovalQueue,
    ) -> Self {
        Self {
            provisioner: IdentityProvisioner::new(Arc::clone(&hosts.identities)),
            hosts,
            backend,
            statistics,
            preferences: RwLock::new(preferences),
            permissions: RwLock::new(permissions),
            palette,
            state: Mutex::new(ManagerState::default()),
            queue,
            persist_lock: tokio::sync::Mutex::new(()),
            sweeper: Mutex::new(None),
        }
    }

    /// Flushes the current storage snapshot.
    ///
    /// # Errors
    ///
    /// Whatever the backend reports.
    pub(crate) async fn try_persist(&self) -> Result<()> {
        let _guard = self.persist_lock.lock().await;
        let snapshot = self.state.lock().storage.clone();
        self.backend.persist(&snapshot).await
    }

    /// Flushes the current storage snapshot, logging failures.
    pub(crate) async fn persist(&self) {
        if let Err(e) = self.try_persist().await {
            warn!(error = %e, "Failed to persist container storage");
        }
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}

// ============================================================================
// ContainerManager
// ============================================================================

/// Handle to the temporary container lifecycle manager.
///
/// Clones share the same state. Pass a handle to every caller that needs
/// to create, track or remove containers.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use temporary_containers::{ContainerManager, CreateTabRequest, HostApis, MemoryHost};
///
/// # async fn example() -> temporary_containers::Result<()> {
/// let host = Arc::new(MemoryHost::new());
/// let manager = ContainerManager::builder()
///     .hosts(HostApis::uniform(host))
///     .build()?;
/// manager.initialize().await?;
///
/// let tab = manager
///     .create_tab_in_temp_container(CreateTabRequest::new().with_url("https://example.com"))
///     .await;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ContainerManager {
    /// Shared inner state.
    pub(crate) inner: Arc<ManagerInner>,
}

// ============================================================================
// ContainerManager - Display
// ============================================================================

impl fmt::Debug for ContainerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ContainerManager")
            .field("containers", &state.storage.temp_containers.len())
            .field("tabs", &state.tab_container_map.len())
            .field("initialized", &state.initialized)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ContainerManager - Lifecycle
// ============================================================================

impl ContainerManager {
    /// Creates a configuration builder for the manager.
    #[inline]
    #[must_use]
    pub fn builder() -> ManagerBuilder {
        ManagerBuilder::new()
    }

    /// Loads storage, runs the startup sweep and starts the periodic one.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the store cannot be loaded.
    pub async fn initialize(&self) -> Result<()> {
        let loaded = self.inner.backend.load().await?;
        {
            let mut state = self.inner.state.lock();
            if state.initialized {
                debug!("Already initialized");
                return Ok(());
            }
            state.storage = loaded.unwrap_or_default();
            state.recompute_numbers();
            state.initialized = true;
            info!(
                containers = state.storage.temp_containers.len(),
                "Container manager initialized"
            );
        }

        self.cleanup(true).await;
        self.inner.start_sweeper();
        Ok(())
    }

    /// Returns `true` once [`ContainerManager::initialize`] completed.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.state.lock().initialized
    }

    /// Returns `true` while a removal batch is collecting, delayed or running.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.inner.queue.is_busy()
    }
}

// ============================================================================
// ContainerManager - Configuration
// ============================================================================

impl ContainerManager {
    /// Returns the current preferences.
    #[must_use]
    pub fn preferences(&self) -> Preferences {
        self.inner.preferences.read().clone()
    }

    /// Replaces the preferences.
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::Error::Config) if validation fails.
    pub fn set_preferences(&self, preferences: Preferences) -> Result<()> {
        preferences.validate()?;
        *self.inner.preferences.write() = preferences;
        Ok(())
    }

    /// Replaces the granted permissions.
    pub fn set_permissions(&self, permissions: Permissions) {
        *self.inner.permissions.write() = permissions;
    }
}

// ============================================================================
// ContainerManager - Queries
// ============================================================================

impl ContainerManager {
    /// Returns the record of a temporary container.
    #[must_use]
    pub fn container(&self, id: &ContainerId) -> Option<TempContainer> {
        self.inner.state.lock().storage.temp_containers.get(id).cloned()
    }

    /// Returns all tracked temporary containers.
    #[must_use]
    pub fn containers(&self) -> Vec<(ContainerId, TempContainer)> {
        self.inner
            .state
            .lock()
            .storage
            .temp_containers
            .iter()
            .map(|(id, container)| (id.clone(), container.clone()))
            .collect()
    }

    /// Returns the numbers currently allocated, ascending.
    #[must_use]
    pub fn allocated_numbers(&self) -> Vec<u32> {
        self.inner
            .state
            .lock()
            .storage
            .temp_containers_numbers
            .iter()
            .copied()
            .collect()
    }

    /// Returns the temporary container a tab is bound to.
    #[must_use]
    pub fn container_for_tab(&self, tab_id: TabId) -> Option<ContainerId> {
        self.inner.state.lock().tab_container_map.get(&tab_id).cloned()
    }

    /// Returns `true` for a temporary container.
    #[must_use]
    pub fn is_temporary(&self, id: &ContainerId) -> bool {
        self.inner
            .state
            .lock()
            .storage
            .temp_containers
            .contains_key(id)
    }

    /// Returns `true` for a temporary container that deletes history.
    #[must_use]
    pub fn is_temporary_deleting_history(&self, id: &ContainerId) -> bool {
        self.inner
            .state
            .lock()
            .storage
            .temp_containers
            .get(id)
            .is_some_and(|container| container.deletes_history)
    }

    /// Returns `true` for a container that is neither temporary nor default.
    #[must_use]
    pub fn is_permanent(&self, id: &ContainerId) -> bool {
        !id.is_default() && !self.is_temporary(id)
    }

    /// Returns `true` while a temporary container has not navigated away
    /// from its first URL.
    #[must_use]
    pub fn is_clean(&self, id: &ContainerId) -> bool {
        self.inner
            .state
            .lock()
            .storage
            .temp_containers
            .get(id)
            .is_some_and(TempContainer::is_clean)
    }

    /// Latches the container of a tab to unclean.
    pub fn mark_unclean(&self, tab_id: TabId) {
        let mut state = self.inner.state.lock();
        let Some(id) = state.tab_container_map.get(&tab_id).cloned() else {
            return;
        };
        if let Some(container) = state.storage.temp_containers.get_mut(&id)
            && container.is_clean()
        {
            debug!(container_id = %id, "Marking container as not clean anymore");
            container.mark_unclean();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::container::CreateTabRequest;
    use crate::host::{CreateTabOptions, MemoryHost, TabHost};

    async fn manager() -> (Arc<MemoryHost>, ContainerManager) {
        let host = Arc::new(MemoryHost::new());
        let manager = ContainerManager::builder()
            .hosts(HostApis::uniform(Arc::clone(&host)))
            .build()
            .expect("build");
        manager.initialize().await.expect("initialize");
        (host, manager)
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (_host, manager) = manager().await;
        assert!(manager.is_initialized());
        manager.initialize().await.expect("initialize twice");
        assert!(!manager.is_busy());
    }

    #[tokio::test]
    async fn test_classification() {
        let (_host, manager) = manager().await;
        let tab = manager
            .create_tab_in_temp_container(CreateTabRequest::new())
            .await
            .expect("tab");
        let id = tab.cookie_store_id;

        assert!(manager.is_temporary(&id));
        assert!(!manager.is_temporary_deleting_history(&id));
        assert!(!manager.is_permanent(&id));
        assert!(!manager.is_permanent(&ContainerId::default_store()));
        assert!(manager.is_permanent(&ContainerId::new("firefox-container-42")));
        assert_eq!(manager.container_for_tab(tab.id), Some(id));
    }

    #[tokio::test]
    async fn test_clean_latch_follows_tab() {
        let (host, manager) = manager().await;
        let tab = manager
            .create_tab_in_temp_container(CreateTabRequest::new())
            .await
            .expect("tab");
        let id = tab.cookie_store_id.clone();
        assert!(manager.is_clean(&id));

        let stranger = host
            .create_tab(CreateTabOptions::default())
            .await
            .expect("tab");
        manager.mark_unclean(stranger.id);
        assert!(manager.is_clean(&id));

        manager.mark_unclean(tab.id);
        assert!(!manager.is_clean(&id));
        manager.mark_unclean(tab.id);
        assert!(!manager.is_clean(&id));
    }

    #[tokio::test]
    async fn test_set_preferences_validates() {
        let (_host, manager) = manager().await;
        let mut preferences = Preferences::default();
        preferences.container.name_prefix = String::new();
        assert!(manager.set_preferences(preferences).is_err());

        let mut preferences = Preferences::default();
        preferences.notifications = true;
        manager.set_preferences(preferences).expect("valid");
        assert!(manager.preferences().notifications);
    }

    #[tokio::test]
    async fn test_debug_output() {
        let (_host, manager) = manager().await;
        let debug = format!("{manager:?}");
        assert!(debug.contains("ContainerManager"));
        assert!(debug.contains("initialized: true"));
    }

    #[test]
    fn test_recompute_keeps_reservations() {
        let mut state = ManagerState::default();
        let prefs = ContainerPreferences {
            number_mode: crate::config::NumberMode::Reuse,
            ..Default::default()
        };
        let palette = Palette::default();

        let first = state.reserve(&prefs, &palette, None);
        state.commit(ContainerId::new("firefox-container-1"), first);
        let pending = state.reserve(&prefs, &palette, None);
        assert_eq!(pending.number, 2);

        state.recompute_numbers();
        let next = state.reserve(&prefs, &palette, None);
        assert_eq!(next.number, 3);

        state.release_reservation(pending.number);
        state.recompute_numbers();
        let reused = state.reserve(&prefs, &palette, None);
        assert_eq!(reused.number, 2);
    }
}
