//! Naming and styling of new containers.
//!
//! A new container gets a number, a name built from the name template
//! and the URL it is opened for, a color and an icon. Random colors are
//! load-balanced: a color is only drawn while it is used less than the
//! most-used color, so colors rotate evenly as containers come and go.

// ============================================================================
// Imports
// ============================================================================

use rand::seq::IndexedRandom;
use tracing::{debug, warn};
use url::Url;

use crate::config::{ContainerPreferences, DOMAIN_PLACEHOLDER, FULL_DOMAIN_PLACEHOLDER, NumberMode};
use crate::storage::{StorageData, TempContainer};

use super::palette::{ContainerColor, ContainerIcon, Palette};

// ============================================================================
// Allocation
// ============================================================================

/// Allocates name, color, icon and number for a new container.
///
/// The number is registered as allocated before returning, so callers
/// holding the storage lock get a number unique among live containers.
#[must_use]
pub fn allocate(
    storage: &mut StorageData,
    prefs: &ContainerPreferences,
    palette: &Palette,
    url: Option<&str>,
) -> TempContainer {
    let number = next_number(storage, prefs.number_mode);
    storage.temp_containers_numbers.insert(number);

    let name = container_name(&prefs.name_prefix, url, number);

    let color = if prefs.color_random {
        let colors = available_colors(storage, palette, &prefs.color_random_excluded);
        colors
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(prefs.color)
    } else {
        prefs.color
    };

    let icon = if prefs.icon_random {
        let icons = available_icons(palette, &prefs.icon_random_excluded);
        icons
            .choose(&mut rand::rng())
            .copied()
            .unwrap_or(prefs.icon)
    } else {
        prefs.icon
    };

    debug!(name = %name, number, %color, ?icon, "Allocated container options");
    TempContainer::new(name, color, icon, number)
}

// ============================================================================
// Numbers
// ============================================================================

/// Returns the next container number.
///
/// Keep mode bumps the persisted counter. Reuse mode returns the first
/// gap in the allocated set, or one past its maximum.
pub(crate) fn next_number(storage: &mut StorageData, mode: NumberMode) -> u32 {
    match mode {
        NumberMode::Keep => {
            storage.temp_container_counter += 1;
            storage.temp_container_counter
        }
        NumberMode::Reuse => first_unused_number(storage),
    }
}

fn first_unused_number(storage: &StorageData) -> u32 {
    let mut candidate = 1;
    for &number in storage.temp_containers_numbers.range(1..) {
        if number != candidate {
            break;
        }
        candidate += 1;
    }
    candidate
}

// ============================================================================
// Names
// ============================================================================

/// Builds the display name from the template, URL and number.
pub(crate) fn container_name(template: &str, url: Option<&str>, number: u32) -> String {
    let host = url.and_then(|url| match Url::parse(url) {
        Ok(parsed) => Some(parsed.host_str().unwrap_or_default().to_string()),
        Err(e) => {
            warn!(url, error = %e, "Unparsable URL, dropping domain placeholders");
            None
        }
    });

    let name = match host {
        Some(host) => {
            let mut name = template.to_string();
            if name.contains(FULL_DOMAIN_PLACEHOLDER) {
                name = name.replace(FULL_DOMAIN_PLACEHOLDER, &host);
            }
            if name.contains(DOMAIN_PLACEHOLDER) {
                name = name.replace(DOMAIN_PLACEHOLDER, registrable_domain(&host));
            }
            name
        }
        None => template
            .replace(FULL_DOMAIN_PLACEHOLDER, "")
            .replace(DOMAIN_PLACEHOLDER, ""),
    };

    format!("{name}{number}")
}

/// Registrable domain of a host, or the host itself when the public
/// suffix list has no answer.
fn registrable_domain(host: &str) -> &str {
    psl::domain_str(host).unwrap_or(host)
}

// ============================================================================
// Colors & Icons
// ============================================================================

/// Colors eligible for random selection.
pub(crate) fn available_colors(
    storage: &StorageData,
    palette: &Palette,
    excluded: &[ContainerColor],
) -> Vec<ContainerColor> {
    let usage = storage.color_usage();
    let max_usage = usage.values().copied().max().unwrap_or(0);

    let available: Vec<_> = palette
        .colors
        .iter()
        .copied()
        .filter(|color| !excluded.contains(color))
        .filter(|color| {
            let used = usage.get(color).copied().unwrap_or(0);
            used == 0 || used < max_usage
        })
        .collect();
    if !available.is_empty() {
        return available;
    }

    let allowed: Vec<_> = palette
        .colors
        .iter()
        .copied()
        .filter(|color| !excluded.contains(color))
        .collect();
    if !allowed.is_empty() {
        return allowed;
    }

    palette.colors.clone()
}

/// Icons eligible for random selection.
pub(crate) fn available_icons(palette: &Palette, excluded: &[ContainerIcon]) -> Vec<ContainerIcon> {
    let allowed: Vec<_> = palette
        .icons
        .iter()
        .copied()
        .filter(|icon| !excluded.contains(icon))
        .collect();
    if allowed.is_empty() {
        palette.icons.clone()
    } else {
        allowed
    }
}

// ============================================================================
// Tests
// ============================================================================
