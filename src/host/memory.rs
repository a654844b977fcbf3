//! In-process host.
//!
//! [`MemoryHost`] keeps identities, tabs, cookies, history deletions and
//! notifications in memory. Individual host calls can be made to fail
//! with [`MemoryHost::fail`] to exercise the manager's failure paths.
//!
//! # Example
//!
//! ```ignore
//! let host = Arc::new(MemoryHost::new());
//! let apis = HostApis::uniform(Arc::clone(&host));
//!
//! host.fail(HostCall::CreateIdentity);
//! assert!(manager.create_tab_in_temp_container(CreateTabRequest::new()).await.is_none());
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::trace;

use crate::error::{Error, Result};
use crate::identifiers::{ContainerId, TabId, WindowId};

use super::types::{
    ContextualIdentity, Cookie, CreateTabOptions, IdentityDetails, IdentityUpdate, Notification,
    TabInfo,
};
use super::{CookieHost, HistoryHost, IdentityHost, NotificationHost, TabHost};

// ============================================================================
// HostCall
// ============================================================================

/// Host calls that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostCall {
    /// `contextualIdentities.create`
    CreateIdentity,
    /// `contextualIdentities.update`
    UpdateIdentity,
    /// `contextualIdentities.remove`
    RemoveIdentity,
    /// `contextualIdentities.get`
    GetIdentity,
    /// `tabs.create`
    CreateTab,
    /// `tabs.get`
    GetTab,
    /// `tabs.query`
    QueryTabs,
    /// `tabs.remove`
    RemoveTab,
    /// `cookies.getAll`
    GetCookies,
    /// `history.deleteUrl`
    DeleteUrl,
    /// `notifications.create`
    CreateNotification,
}

impl HostCall {
    /// Host API name.
    #[must_use]
    pub const fn operation(self) -> &'static str {
        match self {
            Self::CreateIdentity => "contextualIdentities.create",
            Self::UpdateIdentity => "contextualIdentities.update",
            Self::RemoveIdentity => "contextualIdentities.remove",
            Self::GetIdentity => "contextualIdentities.get",
            Self::CreateTab => "tabs.create",
            Self::GetTab => "tabs.get",
            Self::QueryTabs => "tabs.query",
            Self::RemoveTab => "tabs.remove",
            Self::GetCookies => "cookies.getAll",
            Self::DeleteUrl => "history.deleteUrl",
            Self::CreateNotification => "notifications.create",
        }
    }
}

// ============================================================================
// Types
// ============================================================================

#[derive(Default)]
struct HostState {
    identities: BTreeMap<ContainerId, ContextualIdentity>,
    next_identity: u32,
    tabs: BTreeMap<TabId, TabInfo>,
    next_tab: u32,
    cookies: FxHashMap<ContainerId, Vec<Cookie>>,
    deleted_urls: Vec<String>,
    notifications: Vec<Notification>,
    removed_identities: Vec<ContainerId>,
    failing: FxHashSet<HostCall>,
    population_ambiguous: bool,
}

// ============================================================================
// MemoryHost
// ============================================================================

/// Host implementation backed by in-memory maps.
#[derive(Default)]
pub struct MemoryHost {
    state: Mutex<HostState>,
    removals_in_flight: AtomicUsize,
    max_concurrent_removals: AtomicUsize,
}

impl MemoryHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// MemoryHost - Scripting
// ============================================================================

impl MemoryHost {
    /// Makes every subsequent call of `call` fail.
    pub fn fail(&self, call: HostCall) {
        self.state.lock().failing.insert(call);
    }

    /// Lets `call` succeed again.
    pub fn recover(&self, call: HostCall) {
        self.state.lock().failing.remove(&call);
    }

    /// Simulates an empty, incognito-only or restoring tab population.
    pub fn set_population_ambiguous(&self, ambiguous: bool) {
        self.state.lock().population_ambiguous = ambiguous;
    }

    /// Opens a tab as if the user did, appended to the end of its window.
    pub fn open_tab(
        &self,
        window_id: WindowId,
        cookie_store_id: ContainerId,
        url: impl Into<String>,
    ) -> TabInfo {
        let mut state = self.state.lock();
        let index = state
            .tabs
            .values()
            .filter(|tab| tab.window_id == window_id)
            .count() as u32;
        state.insert_tab(CreateTabOptions {
            url: Some(url.into()),
            cookie_store_id: Some(cookie_store_id),
            active: Some(true),
            index: Some(index),
            window_id: Some(window_id),
            ..Default::default()
        })
    }

    /// Closes a tab without going through [`TabHost`].
    pub fn close_tab(&self, tab_id: TabId) -> Option<TabInfo> {
        self.state.lock().tabs.remove(&tab_id)
    }

    /// Deletes an identity behind the manager's back.
    pub fn forget_identity(&self, id: &ContainerId) {
        self.state.lock().identities.remove(id);
    }

    /// Registers an identity that the manager did not create.
    pub fn insert_identity(&self, details: IdentityDetails) -> ContextualIdentity {
        self.state.lock().insert_identity(details)
    }

    /// Stores a cookie in a container.
    pub fn add_cookie(&self, store_id: &ContainerId, cookie: Cookie) {
        self.state
            .lock()
            .cookies
            .entry(store_id.clone())
            .or_default()
            .push(cookie);
    }
}

// ============================================================================
// MemoryHost - Inspection
// ============================================================================

impl MemoryHost {
    /// Returns an identity if it exists.
    #[must_use]
    pub fn identity(&self, id: &ContainerId) -> Option<ContextualIdentity> {
        self.state.lock().identities.get(id).cloned()
    }

    /// Returns the number of identities.
    #[must_use]
    pub fn identity_count(&self) -> usize {
        self.state.lock().identities.len()
    }

    /// Returns a tab if it is open.
    #[must_use]
    pub fn tab(&self, tab_id: TabId) -> Option<TabInfo> {
        self.state.lock().tabs.get(&tab_id).cloned()
    }

    /// Returns the open tabs of a container.
    #[must_use]
    pub fn tabs_in(&self, id: &ContainerId) -> Vec<TabInfo> {
        self.state
            .lock()
            .tabs
            .values()
            .filter(|tab| &tab.cookie_store_id == id)
            .cloned()
            .collect()
    }

    /// Returns every URL deleted from history, in call order.
    #[must_use]
    pub fn deleted_urls(&self) -> Vec<String> {
        self.state.lock().deleted_urls.clone()
    }

    /// Returns every notification shown.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.state.lock().notifications.clone()
    }

    /// Returns removed identities in removal order.
    #[must_use]
    pub fn removed_identities(&self) -> Vec<ContainerId> {
        self.state.lock().removed_identities.clone()
    }

    /// Highest number of identity removals observed running at once.
    #[must_use]
    pub fn max_concurrent_removals(&self) -> usize {
        self.max_concurrent_removals.load(Ordering::SeqCst)
    }
}

// ============================================================================
// HostState
// ============================================================================

impl HostState {
    fn check(&self, call: HostCall) -> Result<()> {
        if self.failing.contains(&call) {
            return Err(Error::host(call.operation(), "scripted failure"));
        }
        Ok(())
    }

    fn insert_identity(&mut self, details: IdentityDetails) -> ContextualIdentity {
        self.next_identity += 1;
        let identity = ContextualIdentity {
            cookie_store_id: ContainerId::new(format!("firefox-container-{}", self.next_identity)),
            name: details.name,
            color: details.color,
            icon: details.icon,
        };
        self.identities
            .insert(identity.cookie_store_id.clone(), identity.clone());
        identity
    }

    fn insert_tab(&mut self, options: CreateTabOptions) -> TabInfo {
        self.next_tab += 1;
        let Some(id) = TabId::new(self.next_tab) else {
            unreachable!("tab counter starts at one");
        };
        let window_id = options.window_id.unwrap_or(WindowId::new(1));
        let window_len = self
            .tabs
            .values()
            .filter(|tab| tab.window_id == window_id)
            .count() as u32;
        let index = options.index.unwrap_or(window_len).min(window_len);

        for tab in self.tabs.values_mut() {
            if tab.window_id == window_id && tab.index >= index {
                tab.index += 1;
            }
        }

        let tab = TabInfo {
            id,
            index,
            window_id,
            active: options.active.unwrap_or(true),
            pinned: options.pinned.unwrap_or(false),
            opener_tab_id: options.opener_tab_id,
            cookie_store_id: options
                .cookie_store_id
                .unwrap_or_else(ContainerId::default_store),
            url: options.url,
            incognito: false,
        };
        self.tabs.insert(id, tab.clone());
        tab
    }
}

// ============================================================================
// Host Traits
// ============================================================================

#[async_trait]
impl IdentityHost for MemoryHost {
    async fn create_identity(&self, details: IdentityDetails) -> Result<ContextualIdentity> {
        let mut state = self.state.lock();
        state.check(HostCall::CreateIdentity)?;
        Ok(state.insert_identity(details))
    }

    async fn update_identity(
        &self,
        id: &ContainerId,
        update: IdentityUpdate,
    ) -> Result<ContextualIdentity> {
        let mut state = self.state.lock();
        state.check(HostCall::UpdateIdentity)?;
        let identity = state
            .identities
            .get_mut(id)
            .ok_or_else(|| Error::container_not_found(id.clone()))?;
        if let Some(name) = update.name {
            identity.name = name;
        }
        if let Some(color) = update.color {
            identity.color = color;
        }
        if let Some(icon) = update.icon {
            identity.icon = icon;
        }
        Ok(identity.clone())
    }

    async fn remove_identity(&self, id: &ContainerId) -> Result<Option<ContextualIdentity>> {
        self.state.lock().check(HostCall::RemoveIdentity)?;

        let running = self.removals_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent_removals
            .fetch_max(running, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let removed = {
            let mut state = self.state.lock();
            let removed = state.identities.remove(id);
            if removed.is_some() {
                state.tabs.retain(|_, tab| &tab.cookie_store_id != id);
                state.cookies.remove(id);
                state.removed_identities.push(id.clone());
            }
            removed
        };

        self.removals_in_flight.fetch_sub(1, Ordering::SeqCst);
        trace!(container_id = %id, found = removed.is_some(), "Identity removed");
        Ok(removed)
    }

    async fn get_identity(&self, id: &ContainerId) -> Result<ContextualIdentity> {
        let state = self.state.lock();
        state.check(HostCall::GetIdentity)?;
        state
            .identities
            .get(id)
            .cloned()
            .ok_or_else(|| Error::container_not_found(id.clone()))
    }
}

#[async_trait]
impl TabHost for MemoryHost {
    async fn create_tab(&self, options: CreateTabOptions) -> Result<TabInfo> {
        let mut state = self.state.lock();
        state.check(HostCall::CreateTab)?;
        Ok(state.insert_tab(options))
    }

    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo> {
        let state = self.state.lock();
        state.check(HostCall::GetTab)?;
        state
            .tabs
            .get(&tab_id)
            .cloned()
            .ok_or_else(|| Error::tab_not_found(tab_id))
    }

    async fn query_tabs(&self, container_id: &ContainerId) -> Result<Vec<TabInfo>> {
        let state = self.state.lock();
        state.check(HostCall::QueryTabs)?;
        Ok(state
            .tabs
            .values()
            .filter(|tab| &tab.cookie_store_id == container_id)
            .cloned()
            .collect())
    }

    async fn remove_tab(&self, tab_id: TabId) -> Result<()> {
        let mut state = self.state.lock();
        state.check(HostCall::RemoveTab)?;
        let removed = state
            .tabs
            .remove(&tab_id)
            .ok_or_else(|| Error::tab_not_found(tab_id))?;
        for tab in state.tabs.values_mut() {
            if tab.window_id == removed.window_id && tab.index > removed.index {
                tab.index -= 1;
            }
        }
        Ok(())
    }

    async fn only_incognito_none_or_session_restore(&self) -> bool {
        let state = self.state.lock();
        state.population_ambiguous
            || state.tabs.is_empty()
            || state.tabs.values().all(|tab| tab.incognito)
    }
}

#[async_trait]
impl CookieHost for MemoryHost {
    async fn get_all_cookies(&self, store_id: &ContainerId) -> Result<Vec<Cookie>> {
        let state = self.state.lock();
        state.check(HostCall::GetCookies)?;
        Ok(state.cookies.get(store_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl HistoryHost for MemoryHost {
    async fn delete_url(&self, url: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.check(HostCall::DeleteUrl)?;
        state.deleted_urls.push(url.to_string());
        Ok(())
    }
}

#[async_trait]
impl NotificationHost for MemoryHost {
    async fn create_notification(&self, notification: Notification) -> Result<()> {
        let mut state = self.state.lock();
        state.check(HostCall::CreateNotification)?;
        state.notifications.push(notification);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::container::palette::{ContainerColor, ContainerIcon};

    fn details(name: &str) -> IdentityDetails {
        IdentityDetails {
            name: name.to_string(),
            color: ContainerColor::Blue,
            icon: ContainerIcon::Circle,
        }
    }

    #[tokio::test]
    async fn test_identity_lifecycle() {
        let host = MemoryHost::new();
        let identity = host.create_identity(details("tmp1")).await.expect("create");

        assert_eq!(identity.cookie_store_id.as_str(), "firefox-container-1");
        assert!(host.get_identity(&identity.cookie_store_id).await.is_ok());

        let removed = host
            .remove_identity(&identity.cookie_store_id)
            .await
            .expect("remove");
        assert!(removed.is_some());

        let err = host
            .get_identity(&identity.cookie_store_id)
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let again = host
            .remove_identity(&identity.cookie_store_id)
            .await
            .expect("remove twice");
        assert!(again.is_none());
    }

    #[tokio::test]
    async fn test_tab_insert_shifts_indices() {
        let host = MemoryHost::new();
        let window = WindowId::new(1);
        let first = host.open_tab(window, ContainerId::default_store(), "about:home");
        let second = host.open_tab(window, ContainerId::default_store(), "about:home");

        let inserted = host
            .create_tab(CreateTabOptions {
                index: Some(1),
                window_id: Some(window),
                ..Default::default()
            })
            .await
            .expect("create tab");

        assert_eq!(inserted.index, 1);
        assert_eq!(host.tab(first.id).map(|tab| tab.index), Some(0));
        assert_eq!(host.tab(second.id).map(|tab| tab.index), Some(2));
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let host = MemoryHost::new();
        host.fail(HostCall::CreateIdentity);
        let err = host.create_identity(details("tmp1")).await.unwrap_err();
        assert!(err.is_host_error());

        host.recover(HostCall::CreateIdentity);
        assert!(host.create_identity(details("tmp1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_population_check() {
        let host = MemoryHost::new();
        assert!(host.only_incognito_none_or_session_restore().await);

        host.open_tab(WindowId::new(1), ContainerId::default_store(), "about:home");
        assert!(!host.only_incognito_none_or_session_restore().await);

        host.set_population_ambiguous(true);
        assert!(host.only_incognito_none_or_session_restore().await);
    }
}
