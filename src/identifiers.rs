//! Type-safe identifiers for browser entities.
//!
//! Newtype wrappers keep container, tab, window and request identifiers
//! apart at compile time.
//!
//! | Type | Host meaning |
//! |------|--------------|
//! | [`ContainerId`] | `cookieStoreId` of a contextual identity |
//! | [`TabId`] | Tab ID (never zero) |
//! | [`WindowId`] | Browser window ID |
//! | [`RequestId`] | `webRequest` request ID |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// ContainerId
// ============================================================================

/// Opaque identity id, used as the container id throughout the crate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Cookie store of the default (non-container) browsing context.
    pub const DEFAULT: &'static str = "firefox-default";

    /// Creates a container id from its host representation.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id of the default cookie store.
    #[inline]
    #[must_use]
    pub fn default_store() -> Self {
        Self(Self::DEFAULT.to_string())
    }

    /// Returns `true` for the default cookie store.
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == Self::DEFAULT
    }

    /// Returns the host representation.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ContainerId {
    #[inline]
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// TabId
// ============================================================================

/// Browser tab id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(u32);

impl TabId {
    /// Creates a tab id, returning `None` for zero.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Option<Self> {
        if id == 0 { None } else { Some(Self(id)) }
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// WindowId
// ============================================================================

/// Browser window id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(u32);

impl WindowId {
    /// Creates a window id.
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Id of the web request that triggered a container creation.
///
/// Request ids are unique per browser session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Creates a request id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
