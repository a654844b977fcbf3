//! Container colors and icons.
//!
//! The host accepts a fixed set of values for both. Browser versions
//! before 67 lack the `toolbar` color and the `fence` icon.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// First browser version with the `toolbar` color and `fence` icon.
pub const EXTENDED_PALETTE_VERSION: u32 = 67;

// ============================================================================
// ContainerColor
// ============================================================================

/// Container color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerColor {
    /// `#37ADFF`
    Blue,
    /// `#00C79A`
    Turquoise,
    /// `#51CD00`
    Green,
    /// `#FFCB00`
    Yellow,
    /// `#FF9F00`
    Orange,
    /// `#FF613D`
    Red,
    /// `#FF4BDA`
    Pink,
    /// `#AF51F5`
    Purple,
    /// Follows the toolbar color.
    Toolbar,
}

impl ContainerColor {
    /// Colors available on every browser version.
    pub const BASE: [Self; 8] = [
        Self::Blue,
        Self::Turquoise,
        Self::Green,
        Self::Yellow,
        Self::Orange,
        Self::Red,
        Self::Pink,
        Self::Purple,
    ];

    /// Host name of the color.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Blue => "blue",
            Self::Turquoise => "turquoise",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Orange => "orange",
            Self::Red => "red",
            Self::Pink => "pink",
            Self::Purple => "purple",
            Self::Toolbar => "toolbar",
        }
    }
}

impl fmt::Display for ContainerColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ContainerIcon
// ============================================================================

/// Container icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum ContainerIcon {
    Fingerprint,
    Briefcase,
    Dollar,
    Cart,
    Circle,
    Gift,
    Vacation,
    Food,
    Fruit,
    Pet,
    Tree,
    Chill,
    Fence,
}

impl ContainerIcon {
    /// Icons available on every browser version.
    pub const BASE: [Self; 12] = [
        Self::Fingerprint,
        Self::Briefcase,
        Self::Dollar,
        Self::Cart,
        Self::Circle,
        Self::Gift,
        Self::Vacation,
        Self::Food,
        Self::Fruit,
        Self::Pet,
        Self::Tree,
        Self::Chill,
    ];
}

// ============================================================================
// Palette
// ============================================================================

/// Colors and icons the host accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    /// Accepted colors, in rotation order.
    pub colors: Vec<ContainerColor>,
    /// Accepted icons.
    pub icons: Vec<ContainerIcon>,
}

impl Palette {
    /// Returns the palette of a browser version.
    #[must_use]
    pub fn for_browser_version(version: u32) -> Self {
        let mut colors = ContainerColor::BASE.to_vec();
        let mut icons = ContainerIcon::BASE.to_vec();
        if version >= EXTENDED_PALETTE_VERSION {
            colors.push(ContainerColor::Toolbar);
            icons.push(ContainerIcon::Fence);
        }
        Self { colors, icons }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::for_browser_version(EXTENDED_PALETTE_VERSION)
    }
}

// ============================================================================
// Tests
// ============================================================================
