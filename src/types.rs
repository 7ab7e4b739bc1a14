//! Core types for the project dashboard.
//!
//! Field and variant names on the wire follow the persisted JSON shape
//! (camelCase fields, `on_hold`, `task-stats`, ...).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
    OnHold,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 3] = [
        ProjectStatus::Active,
        ProjectStatus::Completed,
        ProjectStatus::OnHold,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectStatus::Active => "active",
            ProjectStatus::Completed => "completed",
            ProjectStatus::OnHold => "on_hold",
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "active" => Ok(ProjectStatus::Active),
            "completed" => Ok(ProjectStatus::Completed),
            "on_hold" | "onhold" => Ok(ProjectStatus::OnHold),
            other => Err(format!("unknown project status: {}", other)),
        }
    }
}

/// A project record as produced by the data source.
///
/// `progress` tracks `tasks_completed / tasks_total` only loosely; seeded
/// records are allowed to disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: u32,
    pub name: String,
    pub tasks_completed: u32,
    pub tasks_total: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: ProjectStatus,
    /// Percentage in `0..=100`.
    pub progress: u8,
}

/// Kind of dashboard panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetType {
    ProgressBar,
    TaskStats,
    Timeline,
}

impl WidgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WidgetType::ProgressBar => "progress-bar",
            WidgetType::TaskStats => "task-stats",
            WidgetType::Timeline => "timeline",
        }
    }

    /// Human-readable panel title.
    pub fn title(&self) -> &'static str {
        match self {
            WidgetType::ProgressBar => "Project progress",
            WidgetType::TaskStats => "Task statistics",
            WidgetType::Timeline => "Timeline",
        }
    }
}

impl fmt::Display for WidgetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WidgetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "progress-bar" | "progress" => Ok(WidgetType::ProgressBar),
            "task-stats" | "stats" => Ok(WidgetType::TaskStats),
            "timeline" => Ok(WidgetType::Timeline),
            other => Err(format!("unknown widget type: {}", other)),
        }
    }
}

/// A configurable dashboard panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    #[serde(rename = "type")]
    pub widget_type: WidgetType,
    /// Zero-based order index, unique within the widget list.
    pub position: u32,
    /// Per-widget settings. Opaque to the store.
    #[serde(default = "empty_config")]
    pub config: Value,
}

fn empty_config() -> Value {
    Value::Object(Default::default())
}

impl Widget {
    pub fn new(id: impl Into<String>, widget_type: WidgetType, position: u32) -> Self {
        Self {
            id: id.into(),
            widget_type,
            position,
            config: empty_config(),
        }
    }
}

/// Status predicate of the filter settings: `all` or one exact status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum StatusFilter {
    #[default]
    All,
    Only(ProjectStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: ProjectStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

impl TryFrom<String> for StatusFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StatusFilter> for String {
    fn from(filter: StatusFilter) -> Self {
        filter.to_string()
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("all"),
            StatusFilter::Only(status) => f.write_str(status.as_str()),
        }
    }
}

/// Active search/status predicate applied to the project list.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterSettings {
    #[serde(default)]
    pub search_query: String,
    #[serde(default)]
    pub status_filter: StatusFilter,
}

impl FilterSettings {
    /// Case-insensitive substring match on the name combined with the
    /// status predicate.
    pub fn matches(&self, project: &Project) -> bool {
        let query = self.search_query.to_lowercase();
        project.name.to_lowercase().contains(&query) && self.status_filter.matches(project.status)
    }
}

/// Partial update of [`FilterSettings`]. Unset fields keep their value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_filter: Option<StatusFilter>,
}

impl FilterPatch {
    pub fn apply(self, current: &FilterSettings) -> FilterSettings {
        FilterSettings {
            search_query: self
                .search_query
                .unwrap_or_else(|| current.search_query.clone()),
            status_filter: self.status_filter.unwrap_or(current.status_filter),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.search_query.is_none() && self.status_filter.is_none()
    }
}

/// Grid layout hint stored alongside the widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSettings {
    pub columns: u32,
    pub gap: u32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            columns: 3,
            gap: 16,
        }
    }
}

/// Persisted aggregate, written wholesale on every mutation.
///
/// Every field is optional on read: a missing `widgets` entry means
/// "use the defaults", unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub widgets: Option<Vec<Widget>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSettings>,
    #[serde(default)]
    pub layout: LayoutSettings,
}
