//! Error types for the temporary container manager.
//!
//! # Usage
//!
//! Fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use temporary_containers::{ContainerManager, Result};
//!
//! async fn example(manager: &ContainerManager, tab: TabId) -> Result<()> {
//!     manager.convert_temp_container_to_regular(&id, tab, "https://example.com").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Host | [`Error::HostUnavailable`], [`Error::PermissionDenied`] |
//! | Steady state | [`Error::ContainerNotFound`], [`Error::TabNotFound`], [`Error::StillInUse`] |
//! | Dedup | [`Error::DuplicateRequest`] |
//! | Configuration | [`Error::Config`], [`Error::Storage`] |
//! | External | [`Error::InvalidUrl`], [`Error::Io`], [`Error::Json`] |
//!
//! Steady-state errors are not failures: the lifecycle manager uses them
//! to short-circuit an operation while leaving its state consistent.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::{ContainerId, RequestId, TabId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Host Errors
    // ========================================================================
    /// A host API call was rejected.
    #[error("Host call {operation} failed: {message}")]
    HostUnavailable {
        /// Host operation that failed, e.g. `contextualIdentities.create`.
        operation: String,
        /// Description of the failure.
        message: String,
    },

    /// A host permission is missing.
    #[error("Permission denied: {permission}")]
    PermissionDenied {
        /// The missing permission.
        permission: String,
    },

    // ========================================================================
    // Steady-State Errors
    // ========================================================================
    /// Identity is unknown to the host.
    #[error("Container not found: {container_id}")]
    ContainerNotFound {
        /// The missing container.
        container_id: ContainerId,
    },

    /// Tab is unknown to the host.
    #[error("Tab not found: {tab_id}")]
    TabNotFound {
        /// The missing tab.
        tab_id: TabId,
    },

    /// Container still owns open tabs.
    #[error("Container {container_id} still has {tab_count} tab(s)")]
    StillInUse {
        /// The container in use.
        container_id: ContainerId,
        /// Number of open tabs.
        tab_count: usize,
    },

    /// Origin request already created a container.
    #[error("Duplicate request: {request_id}")]
    DuplicateRequest {
        /// The request seen before.
        request_id: RequestId,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Container store error.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// URL parse error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a host unavailable error.
    #[inline]
    pub fn host(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::HostUnavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Creates a permission denied error.
    #[inline]
    pub fn permission_denied(permission: impl Into<String>) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
        }
    }

    /// Creates a container not found error.
    #[inline]
    pub fn container_not_found(container_id: ContainerId) -> Self {
        Self::ContainerNotFound { container_id }
    }

    /// Creates a tab not found error.
    #[inline]
    pub fn tab_not_found(tab_id: TabId) -> Self {
        Self::TabNotFound { tab_id }
    }

    /// Creates a still-in-use error.
    #[inline]
    pub fn still_in_use(container_id: ContainerId, tab_count: usize) -> Self {
        Self::StillInUse {
            container_id,
            tab_count,
        }
    }

    /// Creates a duplicate request error.
    #[inline]
    pub fn duplicate_request(request_id: RequestId) -> Self {
        Self::DuplicateRequest { request_id }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a storage error.
    #[inline]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if the container or tab is already gone.
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ContainerNotFound { .. } | Self::TabNotFound { .. }
        )
    }

    /// Returns `true` for expected steady states that are not failures.
    #[inline]
    #[must_use]
    pub fn is_expected(&self) -> bool {
        self.is_not_found() || matches!(self, Self::StillInUse { .. })
    }

    /// Returns `true` if a host API call failed.
    #[inline]
    #[must_use]
    pub fn is_host_error(&self) -> bool {
        matches!(
            self,
            Self::HostUnavailable { .. } | Self::PermissionDenied { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
