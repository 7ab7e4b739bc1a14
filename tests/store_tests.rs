//! Integration tests for the dashboard store.
//!
//! Covers first-run defaults, widget list edits, filtering, persistence
//! round-trips and the periodic refresh task.

use async_trait::async_trait;
use project_dashboard::config::SimulatorConfig;
use project_dashboard::services::{
    FetchError, FileStorage, MemoryStorage, MockProjectSource, ProjectSource, StorageService,
};
use project_dashboard::services::projects::seed_projects;
use project_dashboard::services::storage::{StorageBackend, StorageError};
use project_dashboard::store::{DashboardStore, StoreError, StoreOptions, StoreStatus};
use project_dashboard::types::{
    FilterPatch, FilterSettings, Project, ProjectStatus, StatusFilter, WidgetType,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

fn instant_simulator() -> SimulatorConfig {
    SimulatorConfig {
        latency_min_ms: 0,
        latency_max_ms: 0,
        lookup_latency_ms: 0,
        ..SimulatorConfig::default()
    }
}

/// Source that never changes the seed data.
fn frozen_source() -> Arc<dyn ProjectSource> {
    let config = SimulatorConfig {
        progress_chance: 0.0,
        ..instant_simulator()
    };
    Arc::new(MockProjectSource::with_seed(config, 7))
}

fn memory_storage() -> (Arc<MemoryStorage>, StorageService) {
    let backend = Arc::new(MemoryStorage::new());
    let service = StorageService::new(backend.clone());
    (backend, service)
}

fn store_with(storage: StorageService) -> Arc<DashboardStore> {
    Arc::new(DashboardStore::new(
        frozen_source(),
        storage,
        StoreOptions::default(),
    ))
}

/// Counts fetches and can be switched into a failing mode.
#[derive(Default)]
struct CountingSource {
    fetches: AtomicUsize,
    failing: AtomicBool,
}

#[async_trait]
impl ProjectSource for CountingSource {
    async fn fetch_projects(&self) -> Result<Vec<Project>, FetchError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("connection refused".into()));
        }
        Ok(seed_projects())
    }

    async fn fetch_project(&self, id: u32) -> Result<Option<Project>, FetchError> {
        Ok(seed_projects().into_iter().find(|p| p.id == id))
    }
}

/// Memory-backed storage whose first write stalls, and which counts reads.
#[derive(Default)]
struct SlowFirstWriteStorage {
    inner: MemoryStorage,
    writes: AtomicUsize,
    reads: AtomicUsize,
}

impl StorageBackend for SlowFirstWriteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.writes.fetch_add(1, Ordering::SeqCst) == 0 {
            std::thread::sleep(Duration::from_millis(300));
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove_item(key)
    }
}

#[tokio::test]
async fn first_run_creates_default_widgets_and_loads_projects() {
    let store = store_with(StorageService::headless());
    assert_eq!(store.status(), StoreStatus::Uninitialized);

    store.initialize().await;

    let widgets = store.widgets();
    let types: Vec<WidgetType> = widgets.iter().map(|w| w.widget_type).collect();
    assert_eq!(
        types,
        vec![WidgetType::TaskStats, WidgetType::ProgressBar, WidgetType::Timeline]
    );
    let positions: Vec<u32> = widgets.iter().map(|w| w.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);

    assert_eq!(store.status(), StoreStatus::Ready);
    assert!(!store.is_loading());
    assert_eq!(store.projects().len(), 4);
    assert!(store.last_data_update().is_some());
}

#[tokio::test]
async fn filters_match_name_and_status() {
    let store = store_with(StorageService::headless());
    store.initialize().await;

    let all = store.projects();
    let queries = ["", "project", "PROJECT A", "b", "zzz"];
    let statuses = [
        StatusFilter::All,
        StatusFilter::Only(ProjectStatus::Active),
        StatusFilter::Only(ProjectStatus::Completed),
        StatusFilter::Only(ProjectStatus::OnHold),
    ];

    for query in queries {
        for status in statuses {
            store.update_filters(FilterPatch {
                search_query: Some(query.to_string()),
                status_filter: Some(status),
            });
            let filtered = store.filtered_projects();
            let expected: Vec<&Project> = all
                .iter()
                .filter(|p| {
                    p.name.to_lowercase().contains(&query.to_lowercase())
                        && status.matches(p.status)
                })
                .collect();
            assert_eq!(
                filtered.iter().collect::<Vec<_>>(),
                expected,
                "query {:?} status {}",
                query,
                status
            );
        }
    }
}

#[tokio::test]
async fn partial_filter_update_keeps_other_field() {
    let store = store_with(StorageService::headless());
    store.update_filters(FilterPatch {
        search_query: Some("Project".into()),
        status_filter: None,
    });
    let filters = store.update_filters(FilterPatch {
        search_query: None,
        status_filter: Some(StatusFilter::Only(ProjectStatus::Active)),
    });
    assert_eq!(filters.search_query, "Project");
    assert_eq!(filters.status_filter, StatusFilter::Only(ProjectStatus::Active));
}

#[tokio::test]
async fn reorder_renumbers_positions() {
    let store = store_with(StorageService::headless());
    store.initialize().await;
    let ids: Vec<String> = store.widgets().iter().map(|w| w.id.clone()).collect();

    store.reorder_widget(2, 0).unwrap();

    let widgets = store.widgets();
    let reordered: Vec<&str> = widgets.iter().map(|w| w.id.as_str()).collect();
    assert_eq!(reordered, vec![ids[2].as_str(), ids[0].as_str(), ids[1].as_str()]);
    let positions: Vec<u32> = widgets.iter().map(|w| w.position).collect();
    assert_eq!(positions, vec![0, 1, 2]);
}

#[tokio::test]
async fn reorder_rejects_out_of_range_source() {
    let store = store_with(StorageService::headless());
    store.initialize().await;
    let before = store.widgets();

    let err = store.reorder_widget(5, 0).unwrap_err();
    assert_eq!(err, StoreError::IndexOutOfRange { index: 5, len: 3 });
    assert_eq!(store.widgets(), before);
}

#[tokio::test]
async fn remove_unknown_widget_is_noop() {
    let (backend, storage) = memory_storage();
    let store = store_with(storage);
    store.initialize().await;
    let before = store.widgets();

    assert!(!store.remove_widget("does-not-exist"));
    assert_eq!(store.widgets(), before);
    // Initialization only reads, and the ignored remove writes nothing.
    assert!(backend.is_empty());
}

#[tokio::test]
async fn add_after_remove_never_reuses_positions() {
    let store = store_with(StorageService::headless());
    store.initialize().await;
    let middle = store.widgets()[1].id.clone();

    assert!(store.remove_widget(&middle));
    let positions: Vec<u32> = store.widgets().iter().map(|w| w.position).collect();
    assert_eq!(positions, vec![0, 2]);

    let added = store.add_widget(WidgetType::Timeline);
    assert_eq!(added.position, 3);

    let widgets = store.widgets();
    let unique_ids: HashSet<&str> = widgets.iter().map(|w| w.id.as_str()).collect();
    let unique_positions: HashSet<u32> = widgets.iter().map(|w| w.position).collect();
    assert_eq!(unique_ids.len(), widgets.len());
    assert_eq!(unique_positions.len(), widgets.len());
}

#[tokio::test]
async fn state_survives_reload_from_memory_storage() {
    let backend = Arc::new(MemoryStorage::new());

    let first = store_with(StorageService::new(backend.clone()));
    first.initialize().await;
    let added = first.add_widget(WidgetType::ProgressBar);
    first.update_filters(FilterPatch {
        search_query: Some("c".into()),
        status_filter: Some(StatusFilter::Only(ProjectStatus::Completed)),
    });
    let saved_widgets = first.widgets();
    drop(first);

    let second = store_with(StorageService::new(backend));
    second.initialize().await;
    assert_eq!(second.widgets(), saved_widgets);
    assert!(second.widget(&added.id).is_some());
    assert_eq!(second.filters().search_query, "c");

    let filtered = second.filtered_projects();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].name, "Project C");
}

#[tokio::test]
async fn state_survives_reload_from_file_storage() {
    let dir = tempfile::tempdir().unwrap();

    let first = store_with(StorageService::new(Arc::new(FileStorage::new(dir.path()))));
    first.restore_state();
    first.reorder_widget(0, 2).unwrap();
    let saved = first.widgets();
    drop(first);

    assert!(dir.path().join("project-dashboard-state.json").exists());

    let second = store_with(StorageService::new(Arc::new(FileStorage::new(dir.path()))));
    second.restore_state();
    assert_eq!(second.widgets(), saved);
}

#[tokio::test]
async fn reset_restores_defaults_and_overwrites_storage() {
    let backend = Arc::new(MemoryStorage::new());
    let store = store_with(StorageService::new(backend.clone()));
    store.initialize().await;
    store.add_widget(WidgetType::Timeline);
    store.update_filters(FilterPatch {
        search_query: Some("x".into()),
        status_filter: None,
    });

    store.reset();
    assert_eq!(store.widgets().len(), 3);
    assert_eq!(*store.filters(), FilterSettings::default());

    let reloaded = store_with(StorageService::new(backend));
    reloaded.restore_state();
    assert_eq!(reloaded.widgets().len(), 3);
    assert_eq!(*reloaded.filters(), FilterSettings::default());
}

#[tokio::test]
async fn headless_store_persists_nothing() {
    let store = store_with(StorageService::headless());
    store.initialize().await;
    store.add_widget(WidgetType::TaskStats);

    let other = store_with(StorageService::headless());
    other.restore_state();
    assert_eq!(other.widgets().len(), 3);
}

#[tokio::test]
async fn failed_refresh_keeps_previous_projects() {
    let source = Arc::new(CountingSource::default());
    let store = Arc::new(DashboardStore::new(
        source.clone(),
        StorageService::headless(),
        StoreOptions::default(),
    ));
    store.initialize().await;
    let loaded = store.projects();
    let updated_at = store.last_data_update();

    source.failing.store(true, Ordering::SeqCst);
    assert!(store.refresh().await.is_err());

    assert_eq!(store.status(), StoreStatus::Ready);
    assert!(!store.is_loading());
    assert_eq!(store.projects(), loaded);
    assert_eq!(store.last_data_update(), updated_at);
}

#[tokio::test]
async fn failed_first_fetch_leaves_store_uninitialized() {
    let source = Arc::new(CountingSource::default());
    source.failing.store(true, Ordering::SeqCst);
    let store = Arc::new(DashboardStore::new(
        source,
        StorageService::headless(),
        StoreOptions::default(),
    ));

    store.initialize().await;
    assert_eq!(store.status(), StoreStatus::Uninitialized);
    assert!(store.projects().is_empty());
    // Widgets are still restored.
    assert_eq!(store.widgets().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn auto_refresh_ticks_until_stopped() {
    let source = Arc::new(CountingSource::default());
    let options = StoreOptions {
        refresh_interval: Duration::from_millis(5_000),
        ..StoreOptions::default()
    };
    let store = Arc::new(DashboardStore::new(
        source.clone(),
        StorageService::headless(),
        options,
    ));
    store.initialize().await;
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

    assert!(store.start_auto_refresh());
    assert!(!store.start_auto_refresh());
    assert!(store.is_auto_refreshing());

    tokio::time::sleep(Duration::from_millis(4_900)).await;
    assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

    tokio::time::sleep(Duration::from_millis(10_200)).await;
    assert_eq!(source.fetches.load(Ordering::SeqCst), 4);

    assert!(store.stop_auto_refresh());
    assert!(!store.stop_auto_refresh());
    assert!(!store.is_auto_refreshing());

    tokio::time::sleep(Duration::from_millis(30_000)).await;
    assert_eq!(source.fetches.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn auto_refresh_survives_fetch_errors() {
    let source = Arc::new(CountingSource::default());
    source.failing.store(true, Ordering::SeqCst);
    let options = StoreOptions {
        refresh_interval: Duration::from_millis(1_000),
        ..StoreOptions::default()
    };
    let store = Arc::new(DashboardStore::new(
        source.clone(),
        StorageService::headless(),
        options,
    ));

    store.start_auto_refresh();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    assert!(store.is_auto_refreshing());

    source.failing.store(false, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(1_000)).await;
    assert_eq!(store.status(), StoreStatus::Ready);
    assert_eq!(store.projects().len(), 4);
}

#[tokio::test]
async fn subscribers_see_widget_changes() {
    let store = store_with(StorageService::headless());
    store.restore_state();

    let mut changes = store.subscribe();
    let mut widgets = store.watch_widgets();
    changes.borrow_and_update();
    widgets.borrow_and_update();

    store.add_widget(WidgetType::Timeline);
    assert!(changes.has_changed().unwrap());
    assert!(widgets.has_changed().unwrap());

    let mut projects = store.watch_projects();
    projects.borrow_and_update();
    store.update_filters(FilterPatch::default());
    assert!(!projects.has_changed().unwrap());
}

#[test]
fn concurrent_mutations_persist_in_apply_order() {
    let backend = Arc::new(SlowFirstWriteStorage::default());
    let store = store_with(StorageService::new(backend.clone()));
    store.restore_state();

    let adder = {
        let store = Arc::clone(&store);
        std::thread::spawn(move || store.add_widget(WidgetType::Timeline))
    };
    std::thread::sleep(Duration::from_millis(50));
    store.update_filters(FilterPatch {
        search_query: Some("zzz".into()),
        status_filter: None,
    });
    let added = adder.join().unwrap();

    assert_eq!(store.filters().search_query, "zzz");

    let reloaded = store_with(StorageService::new(backend));
    reloaded.restore_state();
    assert_eq!(reloaded.filters().search_query, "zzz");
    assert!(reloaded.widget(&added.id).is_some());
    assert_eq!(reloaded.widgets(), store.widgets());
}

#[tokio::test]
async fn initialize_reads_storage_once() {
    let backend = Arc::new(SlowFirstWriteStorage::default());
    let store = store_with(StorageService::new(backend.clone()));

    store.initialize().await;

    assert_eq!(backend.reads.load(Ordering::SeqCst), 1);
    assert_eq!(backend.writes.load(Ordering::SeqCst), 0);
    assert_eq!(store.widgets().len(), 3);
}
