//! Temporary container lifecycle.
//!
//! This module owns every temporary container from creation to removal.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ContainerManager`] | Handle to all lifecycle operations |
//! | [`ManagerBuilder`] | Fluent configuration builder |
//! | [`CreateTabRequest`] | Parameters for opening a tab in a new container |
//! | [`OriginRequest`] | Navigation request that triggered a creation |
//! | [`RemovalClass`] | Regular or history-deleting removal class |
//! | [`Palette`] | Colors and icons the host accepts |
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use temporary_containers::{ContainerManager, CreateTabRequest, HostApis, MemoryHost, Result};
//!
//! # async fn example() -> Result<()> {
//! let manager = ContainerManager::builder()
//!     .hosts(HostApis::uniform(Arc::new(MemoryHost::new())))
//!     .build()?;
//! manager.initialize().await?;
//!
//! if let Some(tab) = manager
//!     .create_tab_in_temp_container(CreateTabRequest::new().with_url("https://example.com"))
//!     .await
//! {
//!     manager.handle_tab_removed(tab.id);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Name, number, color and icon selection.
mod allocator;

/// Fluent builder pattern for manager configuration.
mod builder;

/// Periodic sweep.
mod cleanup;

/// Conversions between container kinds.
mod convert;

/// History logging and erasure.
mod history;

/// Manager handle and shared state.
mod manager;

/// Container colors and icons.
pub mod palette;

/// Host identity pass-through.
mod provisioner;

/// Removal batching, delay scheduling and the removal worker.
mod removal;

/// Tab creation and tab bookkeeping.
mod tracker;

// ============================================================================
// Re-exports
// ============================================================================

pub use allocator::allocate;
pub use builder::ManagerBuilder;
pub use cleanup::SWEEP_INTERVAL;
pub use manager::ContainerManager;
pub use palette::{ContainerColor, ContainerIcon, EXTENDED_PALETTE_VERSION, Palette};
pub use removal::{COLLECTION_WINDOW, RemovalClass, SETTLE_DELAY};
pub use tracker::{
    CreateTabRequest, DELETES_HISTORY_SUFFIX, OriginRequest, REQUEST_DEDUP_TTL, URL_DEDUP_TTL,
};
