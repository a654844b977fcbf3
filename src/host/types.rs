//! Data exchanged with the host APIs.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::container::palette::{ContainerColor, ContainerIcon};
use crate::identifiers::{ContainerId, TabId, WindowId};

// ============================================================================
// Identities
// ============================================================================

/// An isolated browsing identity as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextualIdentity {
    /// Identity id.
    pub cookie_store_id: ContainerId,
    /// Display name.
    pub name: String,
    /// Color.
    pub color: ContainerColor,
    /// Icon.
    pub icon: ContainerIcon,
}

/// Attributes of a new identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityDetails {
    /// Display name.
    pub name: String,
    /// Color.
    pub color: ContainerColor,
    /// Icon.
    pub icon: ContainerIcon,
}

/// Partial identity update. `None` fields stay unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New color.
    pub color: Option<ContainerColor>,
    /// New icon.
    pub icon: Option<ContainerIcon>,
}

impl IdentityUpdate {
    /// Sets the name.
    #[inline]
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the color.
    #[inline]
    #[must_use]
    pub fn with_color(mut self, color: ContainerColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Sets the icon.
    #[inline]
    #[must_use]
    pub fn with_icon(mut self, icon: ContainerIcon) -> Self {
        self.icon = Some(icon);
        self
    }
}

// ============================================================================
// Tabs
// ============================================================================

/// A tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    /// Tab id.
    pub id: TabId,
    /// Zero-based position in its window.
    pub index: u32,
    /// Owning window.
    pub window_id: WindowId,
    /// Whether the tab is selected in its window.
    pub active: bool,
    /// Whether the tab is pinned.
    pub pinned: bool,
    /// Tab that opened this one.
    pub opener_tab_id: Option<TabId>,
    /// Cookie store the tab belongs to.
    pub cookie_store_id: ContainerId,
    /// Current URL.
    pub url: Option<String>,
    /// Private browsing tab.
    pub incognito: bool,
}

/// Options for creating a tab.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateTabOptions {
    /// URL to load.
    pub url: Option<String>,
    /// Cookie store to bind the tab to.
    pub cookie_store_id: Option<ContainerId>,
    /// Select the tab on creation.
    pub active: Option<bool>,
    /// Position in the window.
    pub index: Option<u32>,
    /// Pin the tab.
    pub pinned: Option<bool>,
    /// Opener tab.
    pub opener_tab_id: Option<TabId>,
    /// Window to open the tab in.
    pub window_id: Option<WindowId>,
}

// ============================================================================
// Cookies
// ============================================================================

/// A cookie in a container's cookie store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Owning cookie store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_id: Option<ContainerId>,
}

impl Cookie {
    /// Creates a cookie with name and value.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            store_id: None,
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// A basic notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Title line.
    pub title: String,
    /// Icon resource.
    pub icon_url: String,
    /// Body text.
    pub message: String,
}

impl Notification {
    /// Title used for every notification the manager raises.
    pub const TITLE: &'static str = "Temporary Containers";

    /// Icon used for every notification the manager raises.
    pub const ICON_URL: &'static str = "icons/page-w-32.svg";

    /// Creates a notification with the manager's title and icon.
    #[must_use]
    pub fn basic(message: impl Into<String>) -> Self {
        Self {
            title: Self::TITLE.to_string(),
            icon_url: Self::ICON_URL.to_string(),
            message: message.into(),
        }
    }
}
