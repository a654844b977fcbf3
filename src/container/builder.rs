//! Builder pattern for manager configuration.
//!
//! Provides a fluent API for configuring and creating
//! [`ContainerManager`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use temporary_containers::{ContainerManager, HostApis, JsonFileBackend, MemoryHost};
//!
//! # fn example() -> temporary_containers::Result<()> {
//! let manager = ContainerManager::builder()
//!     .hosts(HostApis::uniform(Arc::new(MemoryHost::new())))
//!     .backend(Arc::new(JsonFileBackend::new("./storage.json")))
//!     .browser_version(68)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::{Permissions, Preferences};
use crate::error::{Error, Result};
use crate::host::HostApis;
use crate::statistics::{RemovalStatistics, StatisticsCollector};
use crate::storage::{MemoryBackend, StorageBackend};

use super::manager::{ContainerManager, ManagerInner};
use super::palette::{EXTENDED_PALETTE_VERSION, Palette};
use super::removal::{RemovalQueue, run_worker};

// ============================================================================
// ManagerBuilder
// ============================================================================

/// Builder for configuring a [`ContainerManager`] instance.
///
/// Use [`ContainerManager::builder()`] to create a new builder.
#[derive(Clone)]
pub struct ManagerBuilder {
    /// Host APIs.
    hosts: Option<HostApis>,
    /// Durable store, in-memory when unset.
    backend: Option<Arc<dyn StorageBackend>>,
    /// Statistics sink, [`RemovalStatistics`] when unset.
    statistics: Option<Arc<dyn StatisticsCollector>>,
    /// User preferences.
    preferences: Preferences,
    /// Granted optional permissions.
    permissions: Permissions,
    /// Host browser major version.
    browser_version: u32,
}

impl Default for ManagerBuilder {
    fn default() -> Self {
        Self {
            hosts: None,
            backend: None,
            statistics: None,
            preferences: Preferences::default(),
            permissions: Permissions::default(),
            browser_version: EXTENDED_PALETTE_VERSION,
        }
    }
}

impl fmt::Debug for ManagerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerBuilder")
            .field("hosts", &self.hosts)
            .field("custom_backend", &self.backend.is_some())
            .field("custom_statistics", &self.statistics.is_some())
            .field("preferences", &self.preferences)
            .field("permissions", &self.permissions)
            .field("browser_version", &self.browser_version)
            .finish()
    }
}

// ============================================================================
// ManagerBuilder Implementation
// ============================================================================

impl ManagerBuilder {
    /// Creates a new builder with default preferences and no hosts.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host APIs.
    #[inline]
    #[must_use]
    pub fn hosts(mut self, hosts: HostApis) -> Self {
        self.hosts = Some(hosts);
        self
    }

    /// Sets the durable store.
    #[inline]
    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Sets the removal statistics sink.
    #[inline]
    #[must_use]
    pub fn statistics(mut self, statistics: Arc<dyn StatisticsCollector>) -> Self {
        self.statistics = Some(statistics);
        self
    }

    /// Sets the user preferences.
    #[inline]
    #[must_use]
    pub fn preferences(mut self, preferences: Preferences) -> Self {
        self.preferences = preferences;
        self
    }

    /// Sets the granted optional permissions.
    #[inline]
    #[must_use]
    pub fn permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }

    /// Sets the host browser major version.
    ///
    /// Versions before 67 lack the toolbar color and the fence icon.
    #[inline]
    #[must_use]
    pub fn browser_version(mut self, version: u32) -> Self {
        self.browser_version = version;
        self
    }

    /// Builds the manager and starts its removal worker.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no hosts are set
    /// - [`Error::Config`] if the preferences are invalid
    /// - [`Error::Config`] if no Tokio runtime is running
    pub fn build(self) -> Result<ContainerManager> {
        let hosts = self.validate_hosts()?;
        self.preferences.validate()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::config("ContainerManager must be built inside a Tokio runtime"))?;

        let palette = Palette::for_browser_version(self.browser_version);
        let backend = self
            .backend
            .unwrap_or_else(|| Arc::new(MemoryBackend::new()));
        let statistics = self
            .statistics
            .unwrap_or_else(|| Arc::new(RemovalStatistics::new()));

        let (queue, rx) = RemovalQueue::new();
        let inner = Arc::new(ManagerInner::new(
            hosts,
            backend,
            statistics,
            self.preferences,
            self.permissions,
            palette,
            queue,
        ));
        runtime.spawn(run_worker(Arc::downgrade(&inner), rx));

        debug!(browser_version = self.browser_version, "Container manager built");
        Ok(ContainerManager { inner })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ManagerBuilder {
    /// Validates the host configuration.
    fn validate_hosts(&self) -> Result<HostApis> {
        self.hosts.clone().ok_or_else(|| {
            Error::config(
                "Host APIs are required. Use .hosts() to set them.\n\
                 Example: ContainerManager::builder().hosts(HostApis::uniform(host))",
            )
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NumberMode;
    use crate::container::palette::{ContainerColor, ContainerIcon};
    use crate::host::MemoryHost;

    fn hosts() -> HostApis {
        HostApis::uniform(Arc::new(MemoryHost::new()))
    }

    #[test]
    fn test_new_creates_default_builder() {
        let builder = ManagerBuilder::new();
        assert!(builder.hosts.is_none());
        assert!(builder.backend.is_none());
        assert_eq!(builder.browser_version, EXTENDED_PALETTE_VERSION);
    }

    #[test]
    fn test_build_fails_without_hosts() {
        let err = ManagerBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("Host APIs"));
    }

    #[test]
    fn test_build_fails_outside_runtime() {
        let err = ManagerBuilder::new().hosts(hosts()).build().unwrap_err();
        assert!(err.to_string().contains("Tokio runtime"));
    }

    #[tokio::test]
    async fn test_build_fails_with_blank_template() {
        let mut preferences = Preferences::default();
        preferences.container.name_prefix = "  ".to_string();

        let result = ManagerBuilder::new()
            .hosts(hosts())
            .preferences(preferences)
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_build_applies_preferences() {
        let mut preferences = Preferences::default();
        preferences.container.number_mode = NumberMode::Reuse;

        let manager = ManagerBuilder::new()
            .hosts(hosts())
            .preferences(preferences.clone())
            .permissions(Permissions::all())
            .build()
            .unwrap();
        assert_eq!(manager.preferences(), preferences);
        assert!(!manager.is_initialized());
    }

    #[tokio::test]
    async fn test_old_browser_gets_base_palette() {
        let manager = ManagerBuilder::new()
            .hosts(hosts())
            .browser_version(60)
            .build()
            .unwrap();
        let palette = &manager.inner.palette;
        assert!(!palette.colors.contains(&ContainerColor::Toolbar));
        assert!(!palette.icons.contains(&ContainerIcon::Fence));
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = ManagerBuilder::new().browser_version(70);
        let cloned = builder.clone();
        assert_eq!(builder.browser_version, cloned.browser_version);
    }
}
