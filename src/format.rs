//! Output formatting for the CLI: JSON or markdown.

use crate::store::DashboardSnapshot;
use crate::types::{Project, Widget};
use crate::widgets::{TaskStats, WidgetView, is_project_delayed};
use chrono::NaiveDate;
use clap::ValueEnum;

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Markdown,
}

/// Render a full dashboard snapshot.
pub fn format_snapshot(
    snapshot: &DashboardSnapshot,
    format: OutputFormat,
    today: NaiveDate,
) -> serde_json::Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(snapshot),
        OutputFormat::Markdown => Ok(format_snapshot_markdown(snapshot, today)),
    }
}

/// Format the dashboard as markdown, one section per widget in position order.
pub fn format_snapshot_markdown(snapshot: &DashboardSnapshot, today: NaiveDate) -> String {
    let mut md = String::new();

    md.push_str(&format!(
        "# Dashboard ({} of {} projects)\n\n",
        snapshot.projects.len(),
        snapshot.total_projects
    ));
    md.push_str(&format!(
        "- **filter**: \"{}\" / {}\n",
        snapshot.filters.search_query, snapshot.filters.status_filter
    ));
    if let Some(updated) = snapshot.last_data_update {
        md.push_str(&format!("- **updated**: {}\n", updated.format("%Y-%m-%d %H:%M:%S UTC")));
    }
    if any_delayed(&snapshot.projects, today) {
        md.push_str("- **attention**: some projects are delayed\n");
    }
    md.push('\n');

    let mut widgets: Vec<&Widget> = snapshot.widgets.iter().collect();
    widgets.sort_by_key(|w| w.position);

    for widget in widgets {
        md.push_str(&format!(
            "## {} `{}` (#{})\n\n",
            widget.widget_type.title(),
            widget.id,
            widget.position
        ));
        match WidgetView::render(widget.widget_type, &snapshot.projects, today) {
            WidgetView::ProgressBar(entries) => {
                for entry in entries {
                    md.push_str(&format_progress_line(&entry.project, entry.delayed));
                }
            }
            WidgetView::TaskStats(stats) => md.push_str(&format_task_stats(&stats)),
            WidgetView::Timeline(entries) => {
                for entry in entries {
                    md.push_str(&format!(
                        "- {} → {} **{}** ({} days)\n",
                        entry.project.start_date,
                        entry.project.end_date,
                        entry.project.name,
                        entry.duration_days
                    ));
                }
            }
        }
        md.push('\n');
    }

    md
}

fn format_progress_line(project: &Project, delayed: bool) -> String {
    const WIDTH: usize = 20;
    let filled = usize::from(project.progress.min(100)) * WIDTH / 100;
    format!(
        "- **{}** [{}{}] {}% ({}/{}) {}{}\n",
        project.name,
        "#".repeat(filled),
        "-".repeat(WIDTH - filled),
        project.progress,
        project.tasks_completed,
        project.tasks_total,
        project.status,
        if delayed { " ⚠ delayed" } else { "" }
    )
}

fn format_task_stats(stats: &TaskStats) -> String {
    format!(
        "- **projects**: {} (active {}, completed {}, on hold {})\n\
         - **tasks**: {}/{} ({}%)\n",
        stats.total_projects,
        stats.active_projects,
        stats.completed_projects,
        stats.on_hold_projects,
        stats.completed_tasks,
        stats.total_tasks,
        stats.completion_rate
    )
}

/// Format the widget list as a markdown table.
pub fn format_widgets_markdown(widgets: &[Widget]) -> String {
    let mut md = String::from("| # | id | type |\n|---|----|------|\n");
    for widget in widgets {
        md.push_str(&format!(
            "| {} | `{}` | {} |\n",
            widget.position, widget.id, widget.widget_type
        ));
    }
    md
}

/// Whether any project in the list is flagged as delayed.
pub fn any_delayed(projects: &[Project], today: NaiveDate) -> bool {
    projects.iter().any(|p| is_project_delayed(p, today))
}
