//! Conversions between temporary, regular and permanent containers.
//!
//! Each conversion is an ordered sequence of steps: local record, host
//! identity, replacement tab, closing the prior tab. A failing step
//! stops the sequence; earlier steps are not reverted.

// ============================================================================
// Imports
// ============================================================================

use tracing::info;

use crate::error::{Error, Result};
use crate::host::{CreateTabOptions, IdentityUpdate, TabInfo};
use crate::identifiers::{ContainerId, TabId};

use super::manager::{ContainerManager, ManagerInner};
use super::palette::ContainerColor;
use super::tracker::DELETES_HISTORY_SUFFIX;

// ============================================================================
// ContainerManager - Conversions
// ============================================================================

impl ContainerManager {
    /// Turns a temporary container into a permanent one.
    ///
    /// # Errors
    ///
    /// The first failing host call; earlier steps stay applied.
    pub async fn convert_temp_container_to_permanent(
        &self,
        id: &ContainerId,
        tab_id: TabId,
        name: &str,
        url: &str,
    ) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            state.storage.release_number(id);
            state.storage.temp_containers.remove(id);
            state.tab_container_map.retain(|_, container| container != id);
        }
        self.inner.try_persist().await?;

        self.inner
            .provisioner
            .update(
                id,
                IdentityUpdate::default()
                    .with_name(name)
                    .with_color(ContainerColor::Blue),
            )
            .await?;
        self.inner.replace_tab(id, tab_id, url).await?;

        info!(container_id = %id, name, "Converted temporary container to permanent");
        Ok(())
    }

    /// Turns a history-deleting temporary container into a regular one.
    ///
    /// # Errors
    ///
    /// - [`Error::ContainerNotFound`] if the container is not temporary
    /// - The first failing host call; earlier steps stay applied.
    pub async fn convert_temp_container_to_regular(
        &self,
        id: &ContainerId,
        tab_id: TabId,
        url: &str,
    ) -> Result<()> {
        let name = {
            let mut state = self.inner.state.lock();
            let container = state
                .storage
                .temp_containers
                .get_mut(id)
                .ok_or_else(|| Error::container_not_found(id.clone()))?;
            container.deletes_history = false;
            container.history = None;
            container.name = container.name.replace(DELETES_HISTORY_SUFFIX, "");
            container.name.clone()
        };
        self.inner.try_persist().await?;

        self.inner
            .provisioner
            .update(id, IdentityUpdate::default().with_name(name))
            .await?;
        let tab = self.inner.replace_tab(id, tab_id, url).await?;
        self.register_tab(tab.id, id);

        info!(container_id = %id, "Converted history-deleting container to regular");
        Ok(())
    }

    /// Turns a permanent container into a temporary one.
    ///
    /// # Errors
    ///
    /// The first failing host call; earlier steps stay applied.
    pub async fn convert_permanent_to_temp_container(
        &self,
        id: &ContainerId,
        tab_id: TabId,
        url: &str,
    ) -> Result<()> {
        let container = {
            let prefs = self.inner.preferences.read();
            self.inner
                .state
                .lock()
                .reserve(&prefs.container, &self.inner.palette, None)
        };

        let renamed = self
            .inner
            .provisioner
            .update(
                id,
                IdentityUpdate::default()
                    .with_name(container.name.clone())
                    .with_icon(container.icon)
                    .with_color(container.color),
            )
            .await;
        if let Err(e) = renamed {
            self.inner.state.lock().release_reservation(container.number);
            return Err(e);
        }

        self.inner.state.lock().commit(id.clone(), container);
        self.inner.try_persist().await?;

        let tab = self.inner.replace_tab(id, tab_id, url).await?;
        self.register_tab(tab.id, id);

        info!(container_id = %id, "Converted permanent container to temporary");
        Ok(())
    }
}

// ============================================================================
// ManagerInner - Helpers
// ============================================================================

impl ManagerInner {
    /// Opens `url` in the container, then closes the prior tab.
    async fn replace_tab(&self, id: &ContainerId, tab_id: TabId, url: &str) -> Result<TabInfo> {
        let tab = self
            .hosts
            .tabs
            .create_tab(CreateTabOptions {
                url: Some(url.to_string()),
                cookie_store_id: Some(id.clone()),
                ..Default::default()
            })
            .await?;
        self.hosts.tabs.remove_tab(tab_id).await?;
        Ok(tab)
    }
}
