//! Tab creation in new temporary containers and tab→container tracking.
//!
//! Creation is not globally serialized. Two short-lived dedup tables
//! protect against racing duplicates instead:
//!
//! | Table | Key | Expiry |
//! |-------|-----|--------|
//! | Origin requests | request id | 5 minutes |
//! | URLs | URL → container | 1 second |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::host::{CreateTabOptions, TabInfo};
use crate::identifiers::{ContainerId, RequestId, TabId};

use super::manager::{ContainerManager, ManagerInner};

// ============================================================================
// Constants
// ============================================================================

/// How long an origin request id blocks another creation.
pub const REQUEST_DEDUP_TTL: Duration = Duration::from_secs(300);

/// How long a URL remembers the container created for it.
pub const URL_DEDUP_TTL: Duration = Duration::from_secs(1);

/// Appended to the name of history-deleting containers.
pub const DELETES_HISTORY_SUFFIX: &str = "-deletes-history";

// ============================================================================
// OriginRequest
// ============================================================================

/// Web request that triggered a container creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginRequest {
    /// Request id, unique per browser session.
    pub request_id: RequestId,
    /// Requested URL; takes precedence for naming.
    pub url: Option<String>,
}

impl OriginRequest {
    /// Creates an origin request.
    #[must_use]
    pub fn new(request_id: RequestId, url: Option<String>) -> Self {
        Self { request_id, url }
    }
}

// ============================================================================
// CreateTabRequest
// ============================================================================

/// Parameters of [`ContainerManager::create_tab_in_temp_container`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTabRequest {
    /// Tab the new one is opened from.
    pub tab: Option<TabInfo>,
    /// URL to load.
    pub url: Option<String>,
    /// `Some(false)` forces a background tab.
    pub active: Option<bool>,
    /// Triggering web request.
    pub origin: Option<OriginRequest>,
    /// Do not inherit the pinned state of the source tab.
    pub dont_pin: bool,
    /// Create a history-deleting container.
    pub deletes_history: bool,
    /// The tab is a confirmation page.
    pub mac_confirm_page: bool,
}

impl Default for CreateTabRequest {
    fn default() -> Self {
        Self {
            tab: None,
            url: None,
            active: None,
            origin: None,
            dont_pin: true,
            deletes_history: false,
            mac_confirm_page: false,
        }
    }
}

impl CreateTabRequest {
    /// Creates a request with defaults.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source tab.
    #[inline]
    #[must_use]
    pub fn with_tab(mut self, tab: TabInfo) -> Self {
        self.tab = Some(tab);
        self
    }

    /// Sets the URL.
    #[inline]
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets whether the tab is selected.
    #[inline]
    #[must_use]
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    /// Sets the triggering web request.
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: OriginRequest) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Inherits the pinned state of the source tab.
    #[inline]
    #[must_use]
    pub fn with_pinning(mut self) -> Self {
        self.dont_pin = false;
        self
    }

    /// Requests a history-deleting container.
    #[inline]
    #[must_use]
    pub fn with_deletes_history(mut self) -> Self {
        self.deletes_history = true;
        self
    }

    /// Marks the tab as a confirmation page.
    #[inline]
    #[must_use]
    pub fn with_mac_confirm_page(mut self) -> Self {
        self.mac_confirm_page = true;
        self
    }

    /// URL used to name the container.
    fn naming_url(&self) -> Option<&str> {
        self.origin
            .as_ref()
            .and_then(|origin| origin.url.as_deref())
            .or(self.url.as_deref())
    }

    /// Whether the new tab opens in the background.
    fn opens_inactive(&self) -> bool {
        self.active == Some(false) || self.tab.as_ref().is_some_and(|tab| !tab.active)
    }
}

// ============================================================================
// ContainerManager - Tab Creation
// ============================================================================

impl ContainerManager {
    /// Opens a tab in a brand new temporary container.
    ///
    /// Returns `None` for a duplicate origin request or when the host
    /// rejects the identity or tab creation. Nothing is retried; an
    /// identity left without tab is reclaimed by the next sweep.
    pub async fn create_tab_in_temp_container(&self, request: CreateTabRequest) -> Option<TabInfo> {
        self.inner.create_tab_in_temp_container(request).await
    }

    /// Replaces a tab with one in a new temporary container.
    ///
    /// The source tab, if any, is closed after the new tab was created.
    pub async fn reload_tab_in_temp_container(&self, request: CreateTabRequest) -> Option<TabInfo> {
        let source = request.tab.as_ref().map(|tab| tab.id);
        let new_tab = self.inner.create_tab_in_temp_container(request).await;
        let Some(source) = source else {
            return new_tab;
        };
        if let Err(e) = self.inner.hosts.tabs.remove_tab(source).await {
            debug!(tab_id = %source, error = %e, "Failed to remove reloaded tab");
        }
        new_tab
    }
}

// ============================================================================
// ContainerManager - Tab Tracking
// ============================================================================

impl ContainerManager {
    /// Records a tab opened in a temporary container.
    ///
    /// Tabs of other containers are ignored.
    pub fn register_tab(&self, tab_id: TabId, container_id: &ContainerId) {
        let mut state = self.inner.state.lock();
        if state.storage.temp_containers.contains_key(container_id) {
            state
                .tab_container_map
                .insert(tab_id, container_id.clone());
        }
    }

    /// Feeds a closed tab into the removal queue.
    pub fn handle_tab_removed(&self, tab_id: TabId) {
        self.inner.enqueue_removal(tab_id);
        self.inner
            .state
            .lock()
            .tab_created_as_mac_confirm_page
            .remove(&tab_id);
    }

    /// Container created for a URL within the last second.
    #[must_use]
    pub fn container_created_for_url(&self, url: &str) -> Option<ContainerId> {
        self.inner.state.lock().url_created_container.get(url).cloned()
    }

    /// Returns `true` if the tab was created as a confirmation page.
    #[must_use]
    pub fn is_mac_confirm_page(&self, tab_id: TabId) -> bool {
        self.inner
            .state
            .lock()
            .tab_created_as_mac_confirm_page
            .contains(&tab_id)
    }
}

// ============================================================================
// ManagerInner - Tab Creation
// ============================================================================

impl ManagerInner {
    pub(crate) async fn create_tab_in_temp_container(
        self: &Arc<Self>,
        request: CreateTabRequest,
    ) -> Option<TabInfo> {
        if let Some(origin) = &request.origin {
            let fresh = self
                .state
                .lock()
                .request_created_tab
                .insert(origin.request_id.clone());
            if !fresh {
                let err = Error::duplicate_request(origin.request_id.clone());
                debug!(error = %err, "Already created a tab for this request, probably a redirect");
                return None;
            }
            self.forget_request_later(origin.request_id.clone());
        }

        let deletes_history = request.deletes_history && self.history_permitted();
        let mut container = {
            let prefs = self.preferences.read();
            self.state
                .lock()
                .reserve(&prefs.container, &self.palette, request.naming_url())
        };
        if deletes_history {
            container.name.push_str(DELETES_HISTORY_SUFFIX);
            container.deletes_history = true;
        }

        debug!(name = %container.name, "Creating new container");
        let id = match self
            .provisioner
            .create(&container.name, container.color, container.icon)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(name = %container.name, error = %e, "Error while creating container");
                self.state.lock().release_reservation(container.number);
                return None;
            }
        };

        self.state.lock().commit(id.clone(), container);
        self.persist().await;

        let options = self.new_tab_options(&request, &id).await;
        debug!(?options, "Creating tab in temporary container");
        let tab = match self.hosts.tabs.create_tab(options).await {
            Ok(tab) => tab,
            Err(e) => {
                warn!(container_id = %id, error = %e, "Error while creating new tab");
                return None;
            }
        };

        {
            let mut state = self.state.lock();
            if let Some(source) = &request.tab
                && request.opens_inactive()
            {
                state
                    .last_created_inactive_tab
                    .insert(source.window_id, tab.id);
            }
            if let Some(url) = &request.url {
                state
                    .url_created_container
                    .insert(url.clone(), id.clone());
            }
            state.tab_container_map.insert(tab.id, id.clone());
            if request.mac_confirm_page {
                state.tab_created_as_mac_confirm_page.insert(tab.id);
            }
        }
        if let Some(url) = request.url {
            self.forget_url_later(url, id.clone());
        }
        self.persist().await;

        info!(container_id = %id, tab_id = %tab.id, "Tab created in temporary container");
        Some(tab)
    }

    /// Placement and inherited attributes of the new tab.
    async fn new_tab_options(&self, request: &CreateTabRequest, id: &ContainerId) -> CreateTabOptions {
        let mut options = CreateTabOptions {
            url: request.url.clone(),
            cookie_store_id: Some(id.clone()),
            ..Default::default()
        };

        if let Some(tab) = &request.tab {
            options.active = Some(tab.active);
            options.window_id = Some(tab.window_id);

            let last_inactive = if request.opens_inactive() {
                self.state
                    .lock()
                    .last_created_inactive_tab
                    .get(&tab.window_id)
                    .copied()
            } else {
                None
            };
            options.index = Some(match last_inactive {
                Some(last_id) => match self.hosts.tabs.get_tab(last_id).await {
                    Ok(last) => last.index + 1,
                    Err(e) => {
                        debug!(tab_id = %last_id, error = %e, "Failed to get last created inactive tab");
                        tab.index + 1
                    }
                },
                None => tab.index + 1,
            });

            if tab.pinned && !request.dont_pin {
                options.pinned = Some(true);
            }
            options.opener_tab_id = tab.opener_tab_id;
        }

        if request.active == Some(false) {
            options.active = Some(false);
        }
        options
    }

    fn history_permitted(&self) -> bool {
        if self.permissions.read().history {
            return true;
        }
        let err = Error::permission_denied("history");
        debug!(error = %err, "Creating a regular container instead of a history-deleting one");
        false
    }

    fn forget_request_later(self: &Arc<Self>, request_id: RequestId) {
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            sleep(REQUEST_DEDUP_TTL).await;
            if let Some(inner) = manager.upgrade() {
                debug!(request_id = %request_id, "Request dedup entry expired");
                inner.state.lock().request_created_tab.remove(&request_id);
            }
        });
    }

    fn forget_url_later(self: &Arc<Self>, url: String, id: ContainerId) {
        let manager = Arc::downgrade(self);
        tokio::spawn(async move {
            sleep(URL_DEDUP_TTL).await;
            if let Some(inner) = manager.upgrade() {
                let mut state = inner.state.lock();
                if state.url_created_container.get(&url) == Some(&id) {
                    state.url_created_container.remove(&url);
                }
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::identifiers::WindowId;

    fn tab(active: bool) -> TabInfo {
        TabInfo {
            id: TabId::new(3).expect("tab id"),
            index: 2,
            window_id: WindowId::new(1),
            active,
            pinned: true,
            opener_tab_id: None,
            cookie_store_id: ContainerId::default_store(),
            url: Some("https://example.com".into()),
            incognito: false,
        }
    }

    #[test]
    fn test_request_defaults() {
        let request = CreateTabRequest::new();
        assert!(request.dont_pin);
        assert!(!request.deletes_history);
        assert!(!request.mac_confirm_page);
        assert!(request.naming_url().is_none());
    }

    #[test]
    fn test_naming_url_prefers_origin() {
        let request = CreateTabRequest::new()
            .with_url("https://tab.example")
            .with_origin(OriginRequest::new(
                RequestId::new("42"),
                Some("https://request.example".into()),
            ));
        assert_eq!(request.naming_url(), Some("https://request.example"));
    }

    #[test]
    fn test_opens_inactive() {
        assert!(!CreateTabRequest::new().opens_inactive());
        assert!(CreateTabRequest::new().with_active(false).opens_inactive());
        assert!(CreateTabRequest::new().with_tab(tab(false)).opens_inactive());
        assert!(!CreateTabRequest::new().with_tab(tab(true)).opens_inactive());
    }
}
