//! CLI command definitions for project-dashboard
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod widget;

use crate::format::OutputFormat;
use crate::types::StatusFilter;
use clap::{Args, Parser, Subcommand};
use widget::WidgetArgs;

/// Project dashboard server and CLI tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Directory for persisted dashboard state (overrides config)
    #[arg(short, long, global = true)]
    pub storage_dir: Option<String>,

    /// Run without persistence: nothing is loaded or saved
    #[arg(long, global = true)]
    pub headless: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    /// Port for the web dashboard (default: 31995)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Refresh interval in milliseconds (overrides config)
    #[arg(long, global = true)]
    pub refresh_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the web dashboard with periodic refresh (default if no subcommand given)
    Serve,

    /// Fetch projects once and print the dashboard
    Show(ShowArgs),

    /// Add, remove or move widgets in the persisted layout
    Widget(WidgetArgs),

    /// Update the persisted search and status filter
    Filter(FilterArgs),

    /// Restore default widgets and filters
    Reset,
}

/// Arguments for the show subcommand
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,
}

/// Arguments for the filter subcommand
#[derive(Args, Debug)]
pub struct FilterArgs {
    /// Case-insensitive substring matched against project names ("" clears it)
    #[arg(long)]
    pub search: Option<String>,

    /// Status filter: all, active, completed or on_hold
    #[arg(long, value_parser = parse_status_filter)]
    pub status: Option<StatusFilter>,
}

fn parse_status_filter(value: &str) -> Result<StatusFilter, String> {
    value.parse()
}
