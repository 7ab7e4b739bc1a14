//! Dashboard store.
//!
//! Owns the project list, the widget list and the filter settings as
//! [`Signal`]s. The filtered project view is derived on read. Widget and
//! filter mutations are persisted through [`StorageService`] before they
//! return; the project list is refreshed from a [`ProjectSource`] on demand
//! and by an optional periodic task.

use crate::config::DashboardConfig;
use crate::services::projects::{FetchError, ProjectSource};
use crate::services::storage::StorageService;
use crate::signal::Signal;
use crate::types::{
    DashboardState, FilterPatch, FilterSettings, LayoutSettings, Project, Widget, WidgetType,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Widgets created on first run, in display order.
pub const DEFAULT_WIDGETS: [WidgetType; 3] = [
    WidgetType::TaskStats,
    WidgetType::ProgressBar,
    WidgetType::Timeline,
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Widget index {index} out of range for {len} widgets")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Store lifecycle: `Uninitialized -> Loading -> Ready`, with `Ready`
/// re-entered after every refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreStatus {
    #[default]
    Uninitialized,
    Loading,
    Ready,
}

/// Store tuning taken from [`DashboardConfig`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub refresh_interval: Duration,
    pub layout: LayoutSettings,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self::from(&DashboardConfig::default())
    }
}

impl From<&DashboardConfig> for StoreOptions {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval(),
            layout: config.layout,
        }
    }
}

/// Serializable point-in-time view of the store.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub status: StoreStatus,
    pub is_loading: bool,
    pub last_data_update: Option<DateTime<Utc>>,
    pub layout: LayoutSettings,
    pub filters: FilterSettings,
    pub widgets: Vec<Widget>,
    pub projects: Vec<Project>,
    pub total_projects: usize,
}

/// Handle to the periodic refresh task. Stopping consumes the handle, so a
/// task is stopped at most once; dropping it stops the task as well.
pub struct RefreshHandle {
    task: JoinHandle<()>,
    interval: Duration,
}

impl RefreshHandle {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(self) {
        info!("Auto refresh stopped");
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct DashboardStore {
    source: Arc<dyn ProjectSource>,
    storage: StorageService,
    options: StoreOptions,

    projects: Signal<Vec<Project>>,
    widgets: Signal<Vec<Widget>>,
    filters: Signal<FilterSettings>,
    status: Signal<StoreStatus>,
    last_data_update: Signal<Option<DateTime<Utc>>>,

    changes: watch::Sender<u64>,
    refresh_handle: Mutex<Option<RefreshHandle>>,
    /// Held across a persisting mutation and its `save_state` so writes
    /// reach storage in the order they were applied.
    persist_lock: Mutex<()>,
}

impl DashboardStore {
    pub fn new(
        source: Arc<dyn ProjectSource>,
        storage: StorageService,
        options: StoreOptions,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            source,
            storage,
            options,
            projects: Signal::default(),
            widgets: Signal::default(),
            filters: Signal::default(),
            status: Signal::default(),
            last_data_update: Signal::default(),
            changes,
            refresh_handle: Mutex::new(None),
            persist_lock: Mutex::new(()),
        }
    }

    // Lifecycle

    /// Restore persisted widgets and filters (or defaults), then fetch the
    /// initial project list.
    pub async fn initialize(&self) {
        self.restore_state();
        // Fetch failures are already logged; the next refresh retries.
        let _ = self.refresh().await;
    }

    /// Restore persisted widgets and filters without touching the project list.
    pub fn restore_state(&self) {
        let _persist = self.lock_persist();
        match self.storage.load_state() {
            Some(saved) => {
                let widgets = saved.widgets.unwrap_or_else(default_widgets);
                info!(widgets = widgets.len(), "Restored dashboard state");
                self.widgets.set(widgets);
                if let Some(filters) = saved.filters {
                    self.filters.set(filters);
                }
            }
            None => {
                debug!("No saved dashboard state, using defaults");
                self.widgets.set(default_widgets());
            }
        }
        self.notify();
    }

    /// Re-fetch projects and replace the in-memory list wholesale.
    ///
    /// On failure the error is logged, the loading flag is cleared and the
    /// previous list is kept.
    pub async fn refresh(&self) -> Result<(), FetchError> {
        self.status.set(StoreStatus::Loading);
        self.notify();

        let result = self.source.fetch_projects().await;
        match &result {
            Ok(projects) => {
                debug!(count = projects.len(), "Projects refreshed");
                self.projects.set(projects.clone());
                self.last_data_update.set(Some(Utc::now()));
                self.status.set(StoreStatus::Ready);
            }
            Err(e) => {
                error!("Error loading projects: {}", e);
                self.status.set(self.settled_status());
            }
        }
        self.notify();
        result.map(|_| ())
    }

    fn settled_status(&self) -> StoreStatus {
        if self.last_data_update.get().is_some() {
            StoreStatus::Ready
        } else {
            StoreStatus::Uninitialized
        }
    }

    /// Start refreshing every `refresh_interval`. Returns `false` if a
    /// refresh task is already running.
    ///
    /// The first tick fires one interval after the call. Each refresh is
    /// awaited before the next tick, so refreshes of one store never overlap.
    pub fn start_auto_refresh(self: &Arc<Self>) -> bool {
        let mut slot = self
            .refresh_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            warn!("Auto refresh already running");
            return false;
        }

        let period = self.options.refresh_interval;
        let store: Weak<Self> = Arc::downgrade(self);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    debug!("Store dropped, ending auto refresh");
                    break;
                };
                if store.refresh().await.is_ok() {
                    debug!("Data refreshed automatically");
                }
            }
        });

        info!(interval_ms = period.as_millis() as u64, "Auto refresh started");
        *slot = Some(RefreshHandle {
            task,
            interval: period,
        });
        true
    }

    /// Stop the periodic refresh. Returns `false` if none was running.
    pub fn stop_auto_refresh(&self) -> bool {
        let handle = self
            .refresh_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        match handle {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    pub fn is_auto_refreshing(&self) -> bool {
        self.refresh_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    // Actions

    /// Merge `patch` into the current filters and persist.
    pub fn update_filters(&self, patch: FilterPatch) -> FilterSettings {
        let _persist = self.lock_persist();
        let merged = self.filters.update(|current| {
            let merged = patch.apply(current);
            (merged.clone(), merged)
        });
        debug!(query = %merged.search_query, status = %merged.status_filter, "Filters updated");
        self.save_state();
        self.notify();
        merged
    }

    /// Append a widget one past the highest existing position and persist.
    pub fn add_widget(&self, widget_type: WidgetType) -> Widget {
        let _persist = self.lock_persist();
        let widget = self.widgets.update(|widgets| {
            let position = next_position(widgets);
            let widget = Widget::new(generate_widget_id(widgets), widget_type, position);
            let mut next = widgets.clone();
            next.push(widget.clone());
            (next, widget)
        });
        info!(id = %widget.id, widget_type = %widget_type, position = widget.position, "Widget added");
        self.save_state();
        self.notify();
        widget
    }

    /// Remove a widget by id. Remaining positions are left as they are.
    ///
    /// Returns `false` (and writes nothing) when no widget has that id.
    pub fn remove_widget(&self, widget_id: &str) -> bool {
        let _persist = self.lock_persist();
        let removed = self.widgets.update_if(|widgets| {
            if !widgets.iter().any(|w| w.id == widget_id) {
                return None;
            }
            Some(
                widgets
                    .iter()
                    .filter(|w| w.id != widget_id)
                    .cloned()
                    .collect(),
            )
        });
        if removed {
            info!(id = %widget_id, "Widget removed");
            self.save_state();
            self.notify();
        } else {
            debug!(id = %widget_id, "Remove ignored, no such widget");
        }
        removed
    }

    /// Move the widget at `from` to `to` and renumber positions `0..n`.
    ///
    /// `to` past the end is clamped to the last slot.
    pub fn reorder_widget(&self, from: usize, to: usize) -> Result<(), StoreError> {
        let _persist = self.lock_persist();
        let mut outcome = Ok(());
        let moved = self.widgets.update_if(|widgets| {
            if from >= widgets.len() {
                outcome = Err(StoreError::IndexOutOfRange {
                    index: from,
                    len: widgets.len(),
                });
                return None;
            }
            Some(move_widget(widgets, from, to))
        });
        outcome?;

        if moved {
            debug!(from, to, "Widget reordered");
            self.save_state();
            self.notify();
        }
        Ok(())
    }

    /// Restore default widgets and filters and overwrite persisted state.
    pub fn reset(&self) {
        let _persist = self.lock_persist();
        self.storage.clear_state();
        self.widgets.set(default_widgets());
        self.filters.set(FilterSettings::default());
        info!("Dashboard reset to defaults");
        self.save_state();
        self.notify();
    }

    // Reads

    pub fn projects(&self) -> Arc<Vec<Project>> {
        self.projects.get()
    }

    pub fn widgets(&self) -> Arc<Vec<Widget>> {
        self.widgets.get()
    }

    pub fn widget(&self, widget_id: &str) -> Option<Widget> {
        self.widgets.get().iter().find(|w| w.id == widget_id).cloned()
    }

    pub fn filters(&self) -> Arc<FilterSettings> {
        self.filters.get()
    }

    pub fn layout(&self) -> LayoutSettings {
        self.options.layout
    }

    pub fn status(&self) -> StoreStatus {
        *self.status.get()
    }

    pub fn is_loading(&self) -> bool {
        self.status() == StoreStatus::Loading
    }

    pub fn last_data_update(&self) -> Option<DateTime<Utc>> {
        *self.last_data_update.get()
    }

    /// Projects passing the current filters, recomputed on every call.
    pub fn filtered_projects(&self) -> Vec<Project> {
        filter_projects(&self.projects.get(), &self.filters.get())
    }

    /// Look up a project through the data source.
    pub async fn fetch_project(&self, id: u32) -> Result<Option<Project>, FetchError> {
        self.source.fetch_project(id).await
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let status = self.status();
        DashboardSnapshot {
            status,
            is_loading: status == StoreStatus::Loading,
            last_data_update: self.last_data_update(),
            layout: self.layout(),
            filters: (*self.filters()).clone(),
            widgets: (*self.widgets()).clone(),
            projects: self.filtered_projects(),
            total_projects: self.projects.get().len(),
        }
    }

    // Observation

    /// Ticks after every change to projects, widgets, filters or status.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    /// Ticks only when the project list is replaced.
    pub fn watch_projects(&self) -> watch::Receiver<u64> {
        self.projects.subscribe()
    }

    pub fn watch_widgets(&self) -> watch::Receiver<u64> {
        self.widgets.subscribe()
    }

    fn notify(&self) {
        self.changes.send_modify(|v| *v = v.wrapping_add(1));
    }

    // Persistence

    fn lock_persist(&self) -> std::sync::MutexGuard<'_, ()> {
        self.persist_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn save_state(&self) {
        let state = DashboardState {
            widgets: Some((*self.widgets.get()).clone()),
            filters: Some((*self.filters.get()).clone()),
            layout: self.options.layout,
        };
        self.storage.save_state(&state);
    }
}

impl Drop for DashboardStore {
    fn drop(&mut self) {
        self.stop_auto_refresh();
    }
}

impl std::fmt::Debug for DashboardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardStore")
            .field("status", &self.status())
            .field("projects", &self.projects.get().len())
            .field("widgets", &self.widgets.get().len())
            .field("storage", &self.storage)
            .finish()
    }
}

/// Projects whose name contains the query (case-insensitive) and whose
/// status passes the status filter.
pub fn filter_projects(projects: &[Project], filters: &FilterSettings) -> Vec<Project> {
    projects
        .iter()
        .filter(|p| filters.matches(p))
        .cloned()
        .collect()
}

/// The first-run widget set: TaskStats, ProgressBar, Timeline at 0, 1, 2.
pub fn default_widgets() -> Vec<Widget> {
    let mut widgets: Vec<Widget> = Vec::with_capacity(DEFAULT_WIDGETS.len());
    for (position, widget_type) in DEFAULT_WIDGETS.into_iter().enumerate() {
        let id = generate_widget_id(&widgets);
        widgets.push(Widget::new(id, widget_type, position as u32));
    }
    widgets
}

fn next_position(widgets: &[Widget]) -> u32 {
    widgets
        .iter()
        .map(|w| w.position + 1)
        .max()
        .unwrap_or(0)
}

fn move_widget(widgets: &[Widget], from: usize, to: usize) -> Vec<Widget> {
    let mut next = widgets.to_vec();
    let moved = next.remove(from);
    let to = to.min(next.len());
    next.insert(to, moved);
    for (index, widget) in next.iter_mut().enumerate() {
        widget.position = index as u32;
    }
    next
}

/// Random human-readable id, unique within `existing`.
fn generate_widget_id(existing: &[Widget]) -> String {
    use petname::{Generator, Petnames};

    let taken = |id: &str| existing.iter().any(|w| w.id == id);
    let petnames = Petnames::medium();
    for _ in 0..8 {
        if let Some(id) = petnames.generate_one(2, "-")
            && !taken(&id)
        {
            return id;
        }
    }

    let base = format!("widget-{}", Utc::now().timestamp_millis());
    let mut id = base.clone();
    let mut suffix = 1;
    while taken(&id) {
        id = format!("{}-{}", base, suffix);
        suffix += 1;
    }
    id
}
