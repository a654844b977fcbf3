//! Storage backends.

// ============================================================================
// Imports
// ============================================================================

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{Error, Result};

use super::{StorageBackend, StorageData};

// ============================================================================
// MemoryBackend
// ============================================================================

/// Keeps the last persisted snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: Mutex<Option<StorageData>>,
    persist_count: AtomicUsize,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend that already holds data, as after a restart.
    #[must_use]
    pub fn with_data(data: StorageData) -> Self {
        Self {
            data: Mutex::new(Some(data)),
            persist_count: AtomicUsize::new(0),
        }
    }

    /// Returns the last persisted snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<StorageData> {
        self.data.lock().clone()
    }

    /// Number of persists so far.
    #[must_use]
    pub fn persist_count(&self) -> usize {
        self.persist_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn load(&self) -> Result<Option<StorageData>> {
        Ok(self.data.lock().clone())
    }

    async fn persist(&self, data: &StorageData) -> Result<()> {
        *self.data.lock() = Some(data.clone());
        self.persist_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// JsonFileBackend
// ============================================================================

/// Stores the data as a JSON file.
///
/// Persists write a sibling temporary file and rename it over the
/// target, so a crash never leaves a half-written store behind.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    /// Creates a backend for a file path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the file path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

#[async_trait]
impl StorageBackend for JsonFileBackend {
    async fn load(&self) -> Result<Option<StorageData>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    Error::storage(format!("Corrupt store at {}: {e}", self.path.display()))
                })?;
                debug!(path = %self.path.display(), "Storage loaded");
                Ok(Some(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, data: &StorageData) -> Result<()> {
        let json = serde_json::to_vec_pretty(data)?;
        let staging = self.staging_path();
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        trace!(path = %self.path.display(), "Storage persisted");
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
    use crate::identifiers::ContainerId;
    use crate::storage::TempContainer;

    fn sample() -> StorageData {
        let mut data = StorageData {
            temp_container_counter: 2,
            ..Default::default()
        };
        data.temp_containers.insert(
            ContainerId::new("firefox-container-2"),
            TempContainer::new("tmp2".into(), ContainerColor::Green, ContainerIcon::Tree, 2),
        );
        data.recompute_numbers();
        data
    }

    #[tokio::test]
    async fn test_memory_backend() {
        let backend = MemoryBackend::new();
        assert!(backend.load().await.expect("load").is_none());

        backend.persist(&sample()).await.expect("persist");
        assert_eq!(backend.persist_count(), 1);
        assert_eq!(backend.load().await.expect("load"), Some(sample()));
    }

    #[tokio::test]
    async fn test_json_file_missing_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = JsonFileBackend::new(dir.path().join("store.json"));
        assert!(backend.load().await.expect("load").is_none());
    }

    #[tokio::test]
    async fn test_json_file_persist_then_load() {
        let dir = tempfile::tempdir().expect("tempdir");
        let backend = JsonFileBackend::new(dir.path().join("store.json"));

        backend.persist(&sample()).await.expect("persist");
        assert!(!backend.staging_path().exists());
        assert_eq!(backend.load().await.expect("load"), Some(sample()));
    }

    #[tokio::test]
    async fn test_json_file_corrupt() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        tokio::fs::write(&path, "{ not json").await.expect("write");

        let backend = JsonFileBackend::new(path);
        let err = backend.load().await.unwrap_err();
        assert!(matches!(err, Error::Storage { .. }));
    }
}
