//! Widget subcommand for the project-dashboard CLI
//!
//! Edits the persisted widget list without starting the server.

use crate::types::WidgetType;
use clap::{Args, Subcommand};

/// Arguments for the widget subcommand
#[derive(Args, Debug)]
pub struct WidgetArgs {
    #[command(subcommand)]
    pub action: WidgetAction,
}

#[derive(Subcommand, Debug)]
pub enum WidgetAction {
    /// List widgets in display order
    List,

    /// Append a widget: progress-bar, task-stats or timeline
    Add {
        #[arg(value_name = "TYPE", value_parser = parse_widget_type)]
        widget_type: WidgetType,
    },

    /// Remove a widget by id (unknown ids are ignored)
    Remove {
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Move the widget at index FROM to index TO and renumber positions
    Move {
        #[arg(value_name = "FROM")]
        from: usize,
        #[arg(value_name = "TO")]
        to: usize,
    },
}

fn parse_widget_type(value: &str) -> Result<WidgetType, String> {
    value.parse()
}
