//! Configuration consumed by the lifecycle manager.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Preferences`] | User preferences (naming, styling, removal) |
//! | [`Permissions`] | Optional host permissions |
//! | [`NumberMode`] | Keep or reuse container numbers |
//! | [`RemovalPolicy`] | Instant or delayed removal |

// ============================================================================
// Submodules
// ============================================================================

/// Preference types and loading.
pub mod preferences;

// ============================================================================
// Re-exports
// ============================================================================

pub use preferences::{
    ContainerPreferences, DOMAIN_PLACEHOLDER, DeletesHistoryPreferences,
    FULL_DOMAIN_PLACEHOLDER, NumberMode, Permissions, Preferences, RemovalPolicy,
};
