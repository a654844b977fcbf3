//! End-to-end lifecycle tests against the in-memory host.
//!
//! Time is paused, so collection windows, removal delays and dedup
//! expiries elapse instantly once every task is idle.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::sleep;

use temporary_containers::container::{
    COLLECTION_WINDOW, REQUEST_DEDUP_TTL, SETTLE_DELAY, SWEEP_INTERVAL,
};
use temporary_containers::host::{Cookie, HostCall};
use temporary_containers::{
    ContainerColor, ContainerId, ContainerManager, CreateTabRequest, HostApis, MemoryBackend,
    MemoryHost, NumberMode, OriginRequest, Permissions, Preferences, RemovalPolicy,
    RemovalStatistics, RequestId, TabInfo, WindowId,
};

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    host: Arc<MemoryHost>,
    backend: Arc<MemoryBackend>,
    statistics: Arc<RemovalStatistics>,
    manager: ContainerManager,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn instant_preferences() -> Preferences {
    let mut preferences = Preferences::default();
    preferences.container.removal = RemovalPolicy::Instant;
    preferences
}

async fn harness(preferences: Preferences, permissions: Permissions) -> Result<Harness> {
    init_tracing();
    let host = Arc::new(MemoryHost::new());
    let backend = Arc::new(MemoryBackend::new());
    let statistics = Arc::new(RemovalStatistics::new());

    // Keeps the tab population unambiguous once temporary tabs close.
    host.open_tab(WindowId::new(1), ContainerId::default_store(), "about:home");

    let manager = ContainerManager::builder()
        .hosts(HostApis::uniform(Arc::clone(&host)))
        .backend(backend.clone())
        .statistics(statistics.clone())
        .preferences(preferences)
        .permissions(permissions)
        .build()?;
    manager.initialize().await?;

    Ok(Harness {
        host,
        backend,
        statistics,
        manager,
    })
}

impl Harness {
    async fn open(&self, url: &str) -> Result<TabInfo> {
        self.manager
            .create_tab_in_temp_container(CreateTabRequest::new().with_url(url))
            .await
            .context("tab was not created")
    }

    fn close(&self, tab: &TabInfo) {
        self.host.close_tab(tab.id);
        self.manager.handle_tab_removed(tab.id);
    }

    fn number_of(&self, id: &ContainerId) -> Option<u32> {
        self.manager.container(id).map(|container| container.number)
    }
}

/// Long enough for one collection window plus a few settle delays.
fn removal_cycle() -> Duration {
    COLLECTION_WINDOW + SETTLE_DELAY * 4
}

// ============================================================================
// Allocation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_keep_mode_numbers_increase() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;

    let mut numbers = Vec::new();
    for _ in 0..3 {
        let tab = h.open("https://example.com").await?;
        numbers.push(h.number_of(&tab.cookie_store_id).context("number")?);
    }

    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(h.manager.allocated_numbers(), vec![1, 2, 3]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reuse_mode_fills_gap() -> Result<()> {
    let mut preferences = instant_preferences();
    preferences.container.number_mode = NumberMode::Reuse;
    let h = harness(preferences, Permissions::default()).await?;

    let mut tabs = Vec::new();
    for _ in 0..4 {
        tabs.push(h.open("https://example.com").await?);
    }
    h.close(&tabs[2]);
    sleep(removal_cycle()).await;

    assert_eq!(h.manager.allocated_numbers(), vec![1, 2, 4]);
    let tab = h.open("https://example.com").await?;
    assert_eq!(h.number_of(&tab.cookie_store_id), Some(3));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_name_uses_domain_placeholder() -> Result<()> {
    let mut preferences = Preferences::default();
    preferences.container.name_prefix = "tmp %domain%".to_string();
    let h = harness(preferences, Permissions::default()).await?;

    let tab = h.open("https://www.example.co.uk/login").await?;
    let container = h.manager.container(&tab.cookie_store_id).context("record")?;
    assert_eq!(container.name, "tmp example.co.uk1");

    let identity = h.host.identity(&tab.cookie_store_id).context("identity")?;
    assert_eq!(identity.name, container.name);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_create_failure_releases_number() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;

    h.host.fail(HostCall::CreateIdentity);
    let tab = h
        .manager
        .create_tab_in_temp_container(CreateTabRequest::new().with_url("https://example.com"))
        .await;
    assert!(tab.is_none());
    assert!(h.manager.allocated_numbers().is_empty());
    assert!(h.manager.containers().is_empty());

    h.host.recover(HostCall::CreateIdentity);
    assert!(h.open("https://example.com").await.is_ok());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_tab_failure_keeps_identity_for_sweep() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;

    h.host.fail(HostCall::CreateTab);
    let tab = h
        .manager
        .create_tab_in_temp_container(CreateTabRequest::new().with_url("https://example.com"))
        .await;
    assert!(tab.is_none());
    assert_eq!(h.manager.containers().len(), 1);
    assert_eq!(h.host.identity_count(), 1);

    h.host.recover(HostCall::CreateTab);
    h.manager.cleanup(false).await;
    sleep(removal_cycle()).await;

    assert!(h.manager.containers().is_empty());
    assert_eq!(h.host.identity_count(), 0);
    Ok(())
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_duplicate_request_is_ignored() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;
    let origin = OriginRequest::new(RequestId::new("7"), Some("https://example.com".into()));
    let request = CreateTabRequest::new()
        .with_url("https://example.com")
        .with_origin(origin);

    assert!(h.manager.create_tab_in_temp_container(request.clone()).await.is_some());
    assert!(h.manager.create_tab_in_temp_container(request.clone()).await.is_none());
    assert_eq!(h.manager.containers().len(), 1);

    sleep(REQUEST_DEDUP_TTL + Duration::from_secs(1)).await;
    assert!(h.manager.create_tab_in_temp_container(request).await.is_some());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_url_dedup_expires() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;

    let tab = h.open("https://example.com").await?;
    assert_eq!(
        h.manager.container_created_for_url("https://example.com"),
        Some(tab.cookie_store_id.clone())
    );

    sleep(Duration::from_secs(2)).await;
    assert!(h.manager.container_created_for_url("https://example.com").is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_inactive_tabs_open_after_each_other() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;
    let window = WindowId::new(2);
    let source = h
        .host
        .open_tab(window, ContainerId::default_store(), "https://news.example");

    let request = CreateTabRequest::new()
        .with_tab(source.clone())
        .with_url("https://a.example")
        .with_active(false);
    let first = h
        .manager
        .create_tab_in_temp_container(request)
        .await
        .context("first")?;

    let request = CreateTabRequest::new()
        .with_tab(source)
        .with_url("https://b.example")
        .with_active(false);
    let second = h
        .manager
        .create_tab_in_temp_container(request)
        .await
        .context("second")?;

    assert_eq!(first.index, 1);
    assert_eq!(second.index, 2);
    assert!(!second.active);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_reload_replaces_source_tab() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;
    let source = h
        .host
        .open_tab(WindowId::new(1), ContainerId::default_store(), "https://example.com");

    let tab = h
        .manager
        .reload_tab_in_temp_container(
            CreateTabRequest::new()
                .with_tab(source.clone())
                .with_url("https://example.com"),
        )
        .await
        .context("tab")?;

    assert!(h.host.tab(source.id).is_none());
    assert!(h.manager.is_temporary(&tab.cookie_store_id));
    assert_eq!(h.host.tab(tab.id).context("open")?.index, source.index);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_mac_confirm_page_flag() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;
    let tab = h
        .manager
        .create_tab_in_temp_container(
            CreateTabRequest::new()
                .with_url("https://example.com")
                .with_mac_confirm_page(),
        )
        .await
        .context("tab")?;

    assert!(h.manager.is_mac_confirm_page(tab.id));
    h.close(&tab);
    assert!(!h.manager.is_mac_confirm_page(tab.id));
    Ok(())
}

// ============================================================================
// Removal
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_container_with_open_tab_survives() -> Result<()> {
    let h = harness(instant_preferences(), Permissions::default()).await?;

    let tab = h.open("https://example.com").await?;
    let id = tab.cookie_store_id.clone();
    let sibling = h.host.open_tab(tab.window_id, id.clone(), "https://example.com/2");
    h.manager.register_tab(sibling.id, &id);

    h.close(&tab);
    sleep(removal_cycle()).await;
    assert!(h.manager.is_temporary(&id));
    assert!(h.host.identity(&id).is_some());

    h.close(&sibling);
    sleep(removal_cycle()).await;
    assert!(!h.manager.is_temporary(&id));
    assert!(h.host.identity(&id).is_none());
    assert!(h.manager.allocated_numbers().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_instant_batch_removes_in_close_order() -> Result<()> {
    let h = harness(instant_preferences(), Permissions::default()).await?;

    let a = h.open("https://a.example").await?;
    let b = h.open("https://b.example").await?;
    let c = h.open("https://c.example").await?;
    for tab in [&c, &a, &b] {
        h.close(tab);
    }
    assert!(h.manager.is_busy());

    sleep(removal_cycle()).await;
    assert_eq!(
        h.host.removed_identities(),
        vec![c.cookie_store_id, a.cookie_store_id, b.cookie_store_id]
    );
    assert_eq!(h.host.max_concurrent_removals(), 1);
    assert!(!h.manager.is_busy());

    let snapshot = h.backend.snapshot().context("persisted")?;
    assert!(snapshot.temp_containers.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_removal_counts_cookies() -> Result<()> {
    let h = harness(instant_preferences(), Permissions::default()).await?;

    let tab = h.open("https://example.com").await?;
    h.host
        .add_cookie(&tab.cookie_store_id, Cookie::new("session", "abc"));
    h.host
        .add_cookie(&tab.cookie_store_id, Cookie::new("theme", "dark"));
    h.close(&tab);
    sleep(removal_cycle()).await;

    let totals = h.statistics.total();
    assert_eq!(totals.containers_deleted, 1);
    assert_eq!(totals.cookies_deleted, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_delayed_removal_notifies_once() -> Result<()> {
    let mut preferences = Preferences::default();
    preferences.container.removal = RemovalPolicy::FiveMinutes;
    preferences.notifications = true;
    let h = harness(preferences, Permissions::all()).await?;

    let tab = h.open("https://example.com").await?;
    let id = tab.cookie_store_id.clone();
    h.close(&tab);

    sleep(COLLECTION_WINDOW + Duration::from_secs(5)).await;
    let notifications = h.host.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].message,
        "Queued 1 Temporary Containers for removal in 5minutes"
    );

    sleep(Duration::from_secs(4 * 60)).await;
    assert!(h.manager.is_temporary(&id));
    assert!(h.manager.is_busy());

    sleep(Duration::from_secs(80)).await;
    assert!(!h.manager.is_temporary(&id));
    assert_eq!(h.host.notifications().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_ambiguous_population_defers_removal() -> Result<()> {
    let h = harness(instant_preferences(), Permissions::default()).await?;

    let tab = h.open("https://example.com").await?;
    let id = tab.cookie_store_id.clone();
    h.host.set_population_ambiguous(true);
    h.close(&tab);
    sleep(removal_cycle()).await;
    assert!(h.manager.is_temporary(&id));

    h.host.set_population_ambiguous(false);
    h.manager.cleanup(false).await;
    sleep(removal_cycle()).await;
    assert!(!h.manager.is_temporary(&id));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_periodic_sweep_purges_vanished_identity() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;

    let tab = h.open("https://example.com").await?;
    let id = tab.cookie_store_id.clone();
    h.host.forget_identity(&id);
    assert!(h.manager.is_temporary(&id));

    sleep(SWEEP_INTERVAL + Duration::from_secs(1)).await;
    assert!(!h.manager.is_temporary(&id));
    assert!(h.manager.allocated_numbers().is_empty());
    Ok(())
}

// ============================================================================
// History
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_history_deleting_container_clears_history() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::all()).await?;

    let tab = h
        .manager
        .create_tab_in_temp_container(
            CreateTabRequest::new()
                .with_url("https://a.example")
                .with_deletes_history(),
        )
        .await
        .context("tab")?;
    let id = tab.cookie_store_id.clone();
    assert!(h.manager.is_temporary_deleting_history(&id));
    assert!(
        h.manager
            .container(&id)
            .context("record")?
            .name
            .ends_with("-deletes-history")
    );

    h.manager.maybe_add_history(&tab, "https://a.example").await;
    h.manager.maybe_add_history(&tab, "https://b.example").await;
    h.manager.maybe_add_history(&tab, "about:blank").await;
    assert_eq!(h.manager.container(&id).context("record")?.history_len(), 2);

    h.close(&tab);
    sleep(removal_cycle()).await;

    let mut deleted = h.host.deleted_urls();
    deleted.sort();
    assert_eq!(deleted, vec!["https://a.example", "https://b.example"]);
    assert_eq!(h.statistics.total().history_cleared, 2);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_deletes_history_requires_permission() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;

    let tab = h
        .manager
        .create_tab_in_temp_container(CreateTabRequest::new().with_deletes_history())
        .await
        .context("tab")?;
    assert!(!h.manager.is_temporary_deleting_history(&tab.cookie_store_id));
    assert!(h.manager.is_temporary(&tab.cookie_store_id));
    Ok(())
}

// ============================================================================
// Conversions
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_convert_round_trip() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::default()).await?;

    let tab = h.open("https://example.com").await?;
    let id = tab.cookie_store_id.clone();
    h.manager
        .convert_temp_container_to_permanent(&id, tab.id, "Work", "https://example.com")
        .await?;

    assert!(h.manager.is_permanent(&id));
    assert!(h.manager.allocated_numbers().is_empty());
    let identity = h.host.identity(&id).context("identity")?;
    assert_eq!(identity.name, "Work");
    assert_eq!(identity.color, ContainerColor::Blue);
    assert!(h.host.tab(tab.id).is_none());

    let permanent_tab = h.host.tabs_in(&id).pop().context("replacement tab")?;
    h.manager
        .convert_permanent_to_temp_container(&id, permanent_tab.id, "https://example.com")
        .await?;

    assert!(h.manager.is_temporary(&id));
    assert_eq!(h.manager.allocated_numbers(), vec![2]);
    let temp_tab = h.host.tabs_in(&id).pop().context("replacement tab")?;
    assert_eq!(h.manager.container_for_tab(temp_tab.id), Some(id.clone()));
    assert_eq!(
        h.host.identity(&id).context("identity")?.name,
        h.manager.container(&id).context("record")?.name
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_convert_to_regular_strips_suffix() -> Result<()> {
    let h = harness(Preferences::default(), Permissions::all()).await?;

    let tab = h
        .manager
        .create_tab_in_temp_container(
            CreateTabRequest::new()
                .with_url("https://example.com")
                .with_deletes_history(),
        )
        .await
        .context("tab")?;
    let id = tab.cookie_store_id.clone();

    h.manager
        .convert_temp_container_to_regular(&id, tab.id, "https://example.com")
        .await?;

    let container = h.manager.container(&id).context("record")?;
    assert!(!container.deletes_history);
    assert!(container.history.is_none());
    assert_eq!(container.name, "tmp1");
    assert_eq!(h.host.identity(&id).context("identity")?.name, "tmp1");

    let err = h
        .manager
        .convert_temp_container_to_regular(&ContainerId::new("firefox-container-99"), tab.id, "x")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}
