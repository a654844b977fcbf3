//! User preferences that drive naming, styling and removal.
//!
//! Preferences are stored as camelCase JSON. Missing keys take their
//! defaults, so a preference file written by an older version loads
//! cleanly.
//!
//! # Example
//!
//! ```
//! use temporary_containers::config::{NumberMode, Preferences, RemovalPolicy};
//!
//! let prefs = Preferences::from_json_str(r#"{
//!     "container": { "numberMode": "reuse", "removal": "2minutes" }
//! }"#).unwrap();
//!
//! assert_eq!(prefs.container.number_mode, NumberMode::Reuse);
//! assert_eq!(prefs.container.removal, RemovalPolicy::TwoMinutes);
//! assert_eq!(prefs.container.name_prefix, "tmp");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::container::palette::{ContainerColor, ContainerIcon};
use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Name placeholder replaced by the full hostname.
pub const FULL_DOMAIN_PLACEHOLDER: &str = "%fulldomain%";

/// Name placeholder replaced by the registrable domain.
pub const DOMAIN_PLACEHOLDER: &str = "%domain%";

// ============================================================================
// NumberMode
// ============================================================================

/// How container numbers are assigned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberMode {
    /// Monotonic counter, numbers are never handed out twice.
    #[default]
    Keep,
    /// Smallest positive number not currently in use.
    Reuse,
}

// ============================================================================
// RemovalPolicy
// ============================================================================

/// When a container whose last tab closed gets removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalPolicy {
    /// Right after the collection window.
    #[serde(rename = "instant")]
    Instant,
    /// Two minutes after the collection window.
    #[serde(rename = "2minutes")]
    TwoMinutes,
    /// Five minutes after the collection window.
    #[serde(rename = "5minutes")]
    FiveMinutes,
    /// Fifteen minutes after the collection window.
    #[default]
    #[serde(rename = "15minutes")]
    FifteenMinutes,
}

impl RemovalPolicy {
    /// Delay before the batch reaches the worker, `None` for instant.
    #[must_use]
    pub const fn delay(self) -> Option<Duration> {
        match self {
            Self::Instant => None,
            Self::TwoMinutes => Some(Duration::from_secs(120)),
            Self::FiveMinutes => Some(Duration::from_secs(300)),
            Self::FifteenMinutes => Some(Duration::from_secs(900)),
        }
    }
}

// ============================================================================
// ContainerPreferences
// ============================================================================

/// Naming, styling and removal of regular temporary containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerPreferences {
    /// Name template, may contain `%fulldomain%` and `%domain%`.
    pub name_prefix: String,
    /// Fixed color.
    pub color: ContainerColor,
    /// Draw the color at random instead.
    pub color_random: bool,
    /// Colors never drawn.
    pub color_random_excluded: Vec<ContainerColor>,
    /// Fixed icon.
    pub icon: ContainerIcon,
    /// Draw the icon at random instead.
    pub icon_random: bool,
    /// Icons never drawn.
    pub icon_random_excluded: Vec<ContainerIcon>,
    /// Numbering strategy.
    pub number_mode: NumberMode,
    /// Removal policy.
    pub removal: RemovalPolicy,
}

impl Default for ContainerPreferences {
    fn default() -> Self {
        Self {
            name_prefix: "tmp".to_string(),
            color: ContainerColor::Toolbar,
            color_random: false,
            color_random_excluded: Vec::new(),
            icon: ContainerIcon::Circle,
            icon_random: false,
            icon_random_excluded: Vec::new(),
            number_mode: NumberMode::Keep,
            removal: RemovalPolicy::FifteenMinutes,
        }
    }
}

// ============================================================================
// DeletesHistoryPreferences
// ============================================================================

/// Removal of history-deleting containers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeletesHistoryPreferences {
    /// Removal policy.
    pub container_removal: RemovalPolicy,
}

impl Default for DeletesHistoryPreferences {
    fn default() -> Self {
        Self {
            container_removal: RemovalPolicy::Instant,
        }
    }
}

// ============================================================================
// Preferences
// ============================================================================

/// All preferences the lifecycle manager reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Regular containers.
    pub container: ContainerPreferences,
    /// History-deleting containers.
    pub deletes_history: DeletesHistoryPreferences,
    /// Show a notification when a delayed removal is queued.
    pub notifications: bool,
}

impl Preferences {
    /// Parses preferences from JSON.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if the JSON is malformed
    /// - [`Error::Config`] if validation fails
    pub fn from_json_str(json: &str) -> Result<Self> {
        let prefs: Self = serde_json::from_str(json)?;
        prefs.validate()?;
        Ok(prefs)
    }

    /// Loads preferences from a JSON file.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the file cannot be read, otherwise as
    /// [`Preferences::from_json_str`].
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        Self::from_json_str(&json)
    }

    /// Validates the preferences.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if the name template is blank.
    pub fn validate(&self) -> Result<()> {
        if self.container.name_prefix.trim().is_empty() {
            return Err(Error::config("Container name template must not be empty"));
        }
        Ok(())
    }

    /// Removal policy of a container class.
    #[inline]
    #[must_use]
    pub fn removal_policy(&self, deletes_history: bool) -> RemovalPolicy {
        if deletes_history {
            self.deletes_history.container_removal
        } else {
            self.container.removal
        }
    }
}

// ============================================================================
// Permissions
// ============================================================================

/// Optional host permissions granted by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Access to global history; required for history-deleting containers.
    pub history: bool,
    /// Access to notifications.
    pub notifications: bool,
}

impl Permissions {
    /// Every optional permission granted.
    #[inline]
    #[must_use]
    pub const fn all() -> Self {
        Self {
            history: true,
            notifications: true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
