//! Host browser APIs consumed by the lifecycle manager.
//!
//! The manager never talks to the browser directly. Every capability it
//! needs is an async trait, bundled into [`HostApis`]:
//!
//! | Trait | Host API |
//! |-------|----------|
//! | [`IdentityHost`] | `contextualIdentities.*` |
//! | [`TabHost`] | `tabs.*` plus the tab-population check |
//! | [`CookieHost`] | `cookies.getAll` |
//! | [`HistoryHost`] | `history.deleteUrl` |
//! | [`NotificationHost`] | `notifications.create` |
//!
//! [`MemoryHost`] implements all of them in-process.

// ============================================================================
// Submodules
// ============================================================================

/// In-process host implementation.
pub mod memory;

/// Host data types.
pub mod types;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::identifiers::{ContainerId, TabId};

// ============================================================================
// Re-exports
// ============================================================================

pub use memory::{HostCall, MemoryHost};
pub use types::{
    ContextualIdentity, Cookie, CreateTabOptions, IdentityDetails, IdentityUpdate, Notification,
    TabInfo,
};

// ============================================================================
// Traits
// ============================================================================

/// Isolated browsing identities.
#[async_trait]
pub trait IdentityHost: Send + Sync {
    /// Creates an identity and returns it with its new id.
    async fn create_identity(&self, details: IdentityDetails) -> Result<ContextualIdentity>;

    /// Updates name, color or icon of an identity.
    async fn update_identity(
        &self,
        id: &ContainerId,
        update: IdentityUpdate,
    ) -> Result<ContextualIdentity>;

    /// Removes an identity. `Ok(None)` means it was already gone.
    async fn remove_identity(&self, id: &ContainerId) -> Result<Option<ContextualIdentity>>;

    /// Looks up an identity.
    ///
    /// # Errors
    ///
    /// [`Error::ContainerNotFound`](crate::Error::ContainerNotFound) for unknown ids.
    async fn get_identity(&self, id: &ContainerId) -> Result<ContextualIdentity>;
}

/// Tabs, plus the tab-population check of the tab helper.
#[async_trait]
pub trait TabHost: Send + Sync {
    /// Creates a tab.
    async fn create_tab(&self, options: CreateTabOptions) -> Result<TabInfo>;

    /// Looks up a tab.
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo>;

    /// Returns all tabs bound to a container.
    async fn query_tabs(&self, container_id: &ContainerId) -> Result<Vec<TabInfo>>;

    /// Removes a tab.
    async fn remove_tab(&self, tab_id: TabId) -> Result<()>;

    /// Returns `true` when the visible tab population is empty,
    /// incognito-only, or still being restored from a previous session.
    async fn only_incognito_none_or_session_restore(&self) -> bool;
}

/// Cookies scoped to a container.
#[async_trait]
pub trait CookieHost: Send + Sync {
    /// Returns all cookies in a container's cookie store.
    async fn get_all_cookies(&self, store_id: &ContainerId) -> Result<Vec<Cookie>>;
}

/// Global browsing history.
#[async_trait]
pub trait HistoryHost: Send + Sync {
    /// Deletes all visits of a URL.
    async fn delete_url(&self, url: &str) -> Result<()>;
}

/// User notifications.
#[async_trait]
pub trait NotificationHost: Send + Sync {
    /// Shows a basic notification.
    async fn create_notification(&self, notification: Notification) -> Result<()>;
}

// ============================================================================
// HostApis
// ============================================================================

/// Handles to every host capability the manager uses.
#[derive(Clone)]
pub struct HostApis {
    /// Identity API.
    pub identities: Arc<dyn IdentityHost>,
    /// Tab API.
    pub tabs: Arc<dyn TabHost>,
    /// Cookie API.
    pub cookies: Arc<dyn CookieHost>,
    /// History API.
    pub history: Arc<dyn HistoryHost>,
    /// Notification API.
    pub notifications: Arc<dyn NotificationHost>,
}

impl HostApis {
    /// Uses one object for every host capability.
    #[must_use]
    pub fn uniform<H>(host: Arc<H>) -> Self
    where
        H: IdentityHost + TabHost + CookieHost + HistoryHost + NotificationHost + 'static,
    {
        Self {
            identities: host.clone(),
            tabs: host.clone(),
            cookies: host.clone(),
            history: host.clone(),
            notifications: host,
        }
    }
}

impl fmt::Debug for HostApis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostApis").finish_non_exhaustive()
    }
}
