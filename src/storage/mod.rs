//! Durable container bookkeeping.
//!
//! [`StorageData`] is the state that must survive a restart: every
//! temporary container record, the monotonic counter and the set of
//! numbers currently handed out. A [`StorageBackend`] flushes it.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`TempContainer`] | One temporary container record |
//! | [`StorageData`] | Everything persisted |
//! | [`StorageBackend`] | Load/persist seam |
//! | [`MemoryBackend`] | Keeps the last snapshot in memory |
//! | [`JsonFileBackend`] | JSON file with atomic replace |

// ============================================================================
// Submodules
// ============================================================================

/// Storage backend implementations.
pub mod backend;

// ============================================================================
// Imports
// ============================================================================

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::container::palette::{ContainerColor, ContainerIcon};
use crate::error::Result;
use crate::identifiers::{ContainerId, TabId};

// ============================================================================
// Re-exports
// ============================================================================

pub use backend::{JsonFileBackend, MemoryBackend};

// ============================================================================
// TempContainer
// ============================================================================

/// A logged navigation of a history-deleting container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Tab the navigation happened in.
    pub tab_id: TabId,
}

/// Record of one temporary container.
///
/// A record exists exactly as long as the container is temporary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempContainer {
    /// Display name.
    pub name: String,
    /// Color.
    pub color: ContainerColor,
    /// Icon.
    pub icon: ContainerIcon,
    /// Number shown in the name.
    pub number: u32,
    /// Not yet navigated away from its initial URL.
    clean: bool,
    /// Navigations are purged from history on removal.
    #[serde(default)]
    pub deletes_history: bool,
    /// Logged navigations by URL, only for history-deleting containers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<BTreeMap<String, HistoryEntry>>,
}

impl TempContainer {
    /// Creates a clean record.
    #[must_use]
    pub fn new(name: String, color: ContainerColor, icon: ContainerIcon, number: u32) -> Self {
        Self {
            name,
            color,
            icon,
            number,
            clean: true,
            deletes_history: false,
            history: None,
        }
    }

    /// Returns `true` until the container navigates away from its first URL.
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.clean
    }

    /// Latches the container to unclean. There is no way back.
    #[inline]
    pub fn mark_unclean(&mut self) {
        self.clean = false;
    }

    /// Number of logged navigations.
    #[inline]
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.history.as_ref().map_or(0, BTreeMap::len)
    }
}

// ============================================================================
// StorageData
// ============================================================================

/// Everything the manager persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageData {
    /// Last number handed out in keep mode.
    pub temp_container_counter: u32,
    /// Records by container id.
    pub temp_containers: BTreeMap<ContainerId, TempContainer>,
    /// Numbers currently allocated.
    pub temp_containers_numbers: BTreeSet<u32>,
}

impl StorageData {
    /// Releases the number of a container, if it is known.
    pub fn release_number(&mut self, id: &ContainerId) {
        if let Some(container) = self.temp_containers.get(id) {
            self.temp_containers_numbers.remove(&container.number);
        }
    }

    /// Rebuilds the allocated-number set from the live records.
    pub fn recompute_numbers(&mut self) {
        self.temp_containers_numbers = self
            .temp_containers
            .values()
            .map(|container| container.number)
            .collect();
    }

    /// Counts how many records use each color.
    #[must_use]
    pub fn color_usage(&self) -> FxHashMap<ContainerColor, usize> {
        let mut usage = FxHashMap::default();
        for container in self.temp_containers.values() {
            *usage.entry(container.color).or_insert(0) += 1;
        }
        usage
    }
}

// ============================================================================
// StorageBackend
// ============================================================================

/// Durable store for [`StorageData`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Loads the stored data, `None` if nothing was persisted yet.
    async fn load(&self) -> Result<Option<StorageData>>;

    /// Flushes a snapshot.
    async fn persist(&self, data: &StorageData) -> Result<()>;
}

// ============================================================================
// Tests
// ============================================================================
