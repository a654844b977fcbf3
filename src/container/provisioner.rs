//! Thin pass-through over the host identity API.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::host::{ContextualIdentity, IdentityDetails, IdentityHost, IdentityUpdate};
use crate::identifiers::ContainerId;

use super::palette::{ContainerColor, ContainerIcon};

// ============================================================================
// IdentityProvisioner
// ============================================================================

/// Creates, updates, removes and looks up isolated identities.
#[derive(Clone)]
pub(crate) struct IdentityProvisioner {
    host: Arc<dyn IdentityHost>,
}

impl IdentityProvisioner {
    pub(crate) fn new(host: Arc<dyn IdentityHost>) -> Self {
        Self { host }
    }

    /// Creates an identity and returns its id.
    pub(crate) async fn create(
        &self,
        name: &str,
        color: ContainerColor,
        icon: ContainerIcon,
    ) -> Result<ContainerId> {
        debug!(name, %color, ?icon, "Creating contextual identity");
        let identity = self
            .host
            .create_identity(IdentityDetails {
                name: name.to_string(),
                color,
                icon,
            })
            .await?;
        debug!(container_id = %identity.cookie_store_id, "Contextual identity created");
        Ok(identity.cookie_store_id)
    }

    /// Updates identity attributes.
    pub(crate) async fn update(&self, id: &ContainerId, update: IdentityUpdate) -> Result<()> {
        debug!(container_id = %id, ?update, "Updating contextual identity");
        self.host.update_identity(id, update).await?;
        Ok(())
    }

    /// Removes an identity. `false` means the host no longer knew it.
    pub(crate) async fn remove(&self, id: &ContainerId) -> Result<bool> {
        let removed = self.host.remove_identity(id).await?.is_some();
        if removed {
            debug!(container_id = %id, "Contextual identity removed");
        } else {
            debug!(container_id = %id, "Contextual identity was already removed");
        }
        Ok(removed)
    }

    /// Looks up an identity.
    pub(crate) async fn get(&self, id: &ContainerId) -> Result<ContextualIdentity> {
        self.host.get_identity(id).await
    }
}

// ============================================================================
// Tests
// ============================================================================
