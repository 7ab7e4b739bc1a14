//! Widget computations over the filtered project list.
//!
//! Everything here is pure: callers pass the projects (and today's date where
//! it matters) and get plain data back.

use crate::types::{Project, ProjectStatus, WidgetType};
use chrono::NaiveDate;
use serde::Serialize;

/// Days before the end date at which a lagging project counts as delayed.
pub const DELAY_WINDOW_DAYS: i64 = 30;

/// Progress below which a project close to its end date counts as delayed.
pub const DELAY_PROGRESS_THRESHOLD: u8 = 50;

/// Number of entries the timeline shows.
pub const TIMELINE_LIMIT: usize = 5;

/// A project is delayed when its end date is at most 30 days away (or has
/// passed) and it is less than half done.
///
/// The end date counts from its midnight while today is already under way,
/// so a project exactly 30 calendar days out is inside the window.
pub fn is_project_delayed(project: &Project, today: NaiveDate) -> bool {
    let days_left = (project.end_date - today).num_days();
    days_left <= DELAY_WINDOW_DAYS && project.progress < DELAY_PROGRESS_THRESHOLD
}

/// Whole days between two dates, regardless of order.
pub fn duration_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days().abs()
}

/// The most recently started projects, newest first.
pub fn recent_projects(projects: &[Project]) -> Vec<Project> {
    let mut sorted = projects.to_vec();
    sorted.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    sorted.truncate(TIMELINE_LIMIT);
    sorted
}

/// Aggregate counts for the task statistics panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total_projects: usize,
    pub total_tasks: u64,
    pub completed_tasks: u64,
    /// Rounded percentage of completed tasks, 0 when there are no tasks.
    pub completion_rate: u32,
    pub active_projects: usize,
    pub completed_projects: usize,
    pub on_hold_projects: usize,
}

impl TaskStats {
    pub fn compute(projects: &[Project]) -> Self {
        let total_tasks: u64 = projects.iter().map(|p| u64::from(p.tasks_total)).sum();
        let completed_tasks: u64 = projects.iter().map(|p| u64::from(p.tasks_completed)).sum();
        let completion_rate = if total_tasks > 0 {
            (completed_tasks as f64 / total_tasks as f64 * 100.0).round() as u32
        } else {
            0
        };
        let count = |status: ProjectStatus| projects.iter().filter(|p| p.status == status).count();

        Self {
            total_projects: projects.len(),
            total_tasks,
            completed_tasks,
            completion_rate,
            active_projects: count(ProjectStatus::Active),
            completed_projects: count(ProjectStatus::Completed),
            on_hold_projects: count(ProjectStatus::OnHold),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub project: Project,
    pub delayed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub project: Project,
    pub duration_days: i64,
}

/// Data behind one widget panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum WidgetView {
    ProgressBar(Vec<ProgressEntry>),
    TaskStats(TaskStats),
    Timeline(Vec<TimelineEntry>),
}

impl WidgetView {
    pub fn render(widget_type: WidgetType, projects: &[Project], today: NaiveDate) -> Self {
        match widget_type {
            WidgetType::ProgressBar => WidgetView::ProgressBar(
                projects
                    .iter()
                    .map(|p| ProgressEntry {
                        delayed: is_project_delayed(p, today),
                        project: p.clone(),
                    })
                    .collect(),
            ),
            WidgetType::TaskStats => WidgetView::TaskStats(TaskStats::compute(projects)),
            WidgetType::Timeline => WidgetView::Timeline(
                recent_projects(projects)
                    .into_iter()
                    .map(|p| TimelineEntry {
                        duration_days: duration_days(p.start_date, p.end_date),
                        project: p,
                    })
                    .collect(),
            ),
        }
    }
}
