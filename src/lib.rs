//! Temporary Containers - Disposable browsing identities.
//!
//! This library manages the lifecycle of temporary containers: isolated
//! cookie stores created on demand for a tab, tracked while they have
//! tabs, and removed once their last tab closes.
//!
//! # Architecture
//!
//! The manager sits between browser events and the host identity APIs:
//!
//! - **Host (traits)**: Identities, tabs, cookies, history, notifications
//! - **Manager (Rust)**: Allocation, tab tracking, batched removal
//!
//! Key design principles:
//!
//! - All state is owned by one [`ContainerManager`] handle
//! - Removal runs on a single worker, one container at a time
//! - Delayed removal is batched per policy and persisted before it runs
//! - Host failures are logged and never crash the manager
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use temporary_containers::{
//!     ContainerManager, CreateTabRequest, HostApis, JsonFileBackend, MemoryHost, Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let manager = ContainerManager::builder()
//!         .hosts(HostApis::uniform(Arc::new(MemoryHost::new())))
//!         .backend(Arc::new(JsonFileBackend::new("./storage.json")))
//!         .build()?;
//!     manager.initialize().await?;
//!
//!     // Open a tab in a fresh container
//!     let request = CreateTabRequest::new().with_url("https://example.com");
//!     if let Some(tab) = manager.create_tab_in_temp_container(request).await {
//!         println!("Opened tab {} in {}", tab.id, tab.cookie_store_id);
//!
//!         // Closing the last tab queues the container for removal
//!         manager.handle_tab_removed(tab.id);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | [`Preferences`] and [`Permissions`] |
//! | [`container`] | [`ContainerManager`] and lifecycle operations |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`host`] | Host API traits and the in-memory [`MemoryHost`] |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`statistics`] | Removal statistics |
//! | [`storage`] | Persisted state and backends |

// ============================================================================
// Modules
// ============================================================================

/// User preferences and permissions.
pub mod config;

/// Temporary container lifecycle.
///
/// Use [`ContainerManager::builder()`] to create a configured manager.
pub mod container;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Host API seam.
///
/// Internal module boundary; the manager only talks to the browser
/// through these traits.
pub mod host;

/// Type-safe identifiers for browser entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Removal statistics.
pub mod statistics;

/// Persisted state and storage backends.
pub mod storage;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration types
pub use config::{NumberMode, Permissions, Preferences, RemovalPolicy};

// Container types
pub use container::{
    ContainerColor, ContainerIcon, ContainerManager, CreateTabRequest, ManagerBuilder,
    OriginRequest, Palette, RemovalClass,
};

// Error types
pub use error::{Error, Result};

// Host types
pub use host::{HostApis, MemoryHost, TabInfo};

// Identifier types
pub use identifiers::{ContainerId, RequestId, TabId, WindowId};

// Statistics types
pub use statistics::{RemovalStatistics, StatisticsCollector};

// Storage types
pub use storage::{JsonFileBackend, MemoryBackend, StorageBackend, StorageData, TempContainer};
