//! Project Dashboard
//!
//! Serves a widget dashboard over a simulated project data source, and
//! offers CLI commands to inspect and edit the persisted dashboard layout.

use anyhow::{Result, anyhow};
use clap::Parser;
use project_dashboard::cli::widget::{WidgetAction, WidgetArgs};
use project_dashboard::cli::{Cli, Command, FilterArgs, ShowArgs};
use project_dashboard::config::{Config, ConfigLoader};
use project_dashboard::dashboard;
use project_dashboard::format::{format_snapshot, format_widgets_markdown};
use project_dashboard::logging::{LogTarget, init_logging};
use project_dashboard::services::projects::{MockProjectSource, ProjectSource};
use project_dashboard::services::storage::{FileStorage, StorageService};
use project_dashboard::store::{DashboardStore, StoreOptions};
use project_dashboard::types::FilterPatch;
use std::sync::Arc;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;

    // SAFETY: set before any other threads read the environment
    if let Some(config_path) = &cli.config {
        unsafe {
            std::env::set_var("PROJECT_DASHBOARD_CONFIG_PATH", config_path);
        }
    }
    let mut loader = ConfigLoader::load()?;
    if let Some(path) = loader.config_path() {
        debug!("Using config file {}", path.display());
    }

    let config = loader.config_mut();
    if let Some(storage_dir) = &cli.storage_dir {
        config.dashboard.storage_dir = storage_dir.into();
    }
    if cli.headless {
        config.dashboard.headless = true;
    }
    if let Some(port) = cli.port {
        config.server.ui.port = port;
    }
    if let Some(refresh_ms) = cli.refresh_ms {
        config.dashboard.refresh_interval_ms = refresh_ms;
    }

    let config = loader.into_config();
    config.validate()?;
    config.ensure_storage_dir()?;

    match cli.command {
        Some(Command::Show(args)) => run_show(&config, args).await?,
        Some(Command::Widget(args)) => run_widget(&config, args)?,
        Some(Command::Filter(args)) => run_filter(&config, args)?,
        Some(Command::Reset) => {
            let store = build_store(&config, mock_source(&config));
            store.reset();
            println!("{}", format_widgets_markdown(&store.widgets()));
        }
        Some(Command::Serve) | None => run_server(config).await?,
    }

    Ok(())
}

fn storage_service(config: &Config) -> StorageService {
    if config.dashboard.headless {
        StorageService::headless()
    } else {
        StorageService::new(Arc::new(FileStorage::new(&config.dashboard.storage_dir)))
    }
}

fn mock_source(config: &Config) -> Arc<dyn ProjectSource> {
    Arc::new(MockProjectSource::new(config.simulator.clone()))
}

fn new_store(config: &Config, source: Arc<dyn ProjectSource>) -> Arc<DashboardStore> {
    Arc::new(DashboardStore::new(
        source,
        storage_service(config),
        StoreOptions::from(&config.dashboard),
    ))
}

/// Build a store with persisted state restored but no projects fetched yet.
fn build_store(config: &Config, source: Arc<dyn ProjectSource>) -> Arc<DashboardStore> {
    let store = new_store(config, source);
    store.restore_state();
    store
}

async fn run_server(config: Config) -> Result<()> {
    // initialize() restores persisted state itself
    let store = new_store(&config, mock_source(&config));

    info!(
        storage = %config.dashboard.storage_dir.display(),
        headless = config.dashboard.headless,
        "Starting project dashboard"
    );
    store.initialize().await;
    store.start_auto_refresh();

    let handle = dashboard::start_server_with_retry(Arc::clone(&store), &config.server.ui);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    handle.shutdown();
    store.stop_auto_refresh();
    Ok(())
}

async fn run_show(config: &Config, args: ShowArgs) -> Result<()> {
    // One-shot output; the simulated network delay only slows the CLI down.
    let mut simulator = config.simulator.clone();
    simulator.latency_min_ms = 0;
    simulator.latency_max_ms = 0;

    let store = build_store(config, Arc::new(MockProjectSource::new(simulator)));
    store
        .refresh()
        .await
        .map_err(|e| anyhow!("Failed to load projects: {}", e))?;

    let today = chrono::Local::now().date_naive();
    println!("{}", format_snapshot(&store.snapshot(), args.format, today)?);
    Ok(())
}

fn run_widget(config: &Config, args: WidgetArgs) -> Result<()> {
    let store = build_store(config, mock_source(config));

    match args.action {
        WidgetAction::List => {}
        WidgetAction::Add { widget_type } => {
            let widget = store.add_widget(widget_type);
            println!("Added {} widget `{}`", widget.widget_type, widget.id);
        }
        WidgetAction::Remove { id } => {
            if store.remove_widget(&id) {
                println!("Removed widget `{}`", id);
            } else {
                println!("No widget with id `{}`", id);
            }
        }
        WidgetAction::Move { from, to } => store.reorder_widget(from, to)?,
    }

    println!("{}", format_widgets_markdown(&store.widgets()));
    Ok(())
}

fn run_filter(config: &Config, args: FilterArgs) -> Result<()> {
    let store = build_store(config, mock_source(config));
    let filters = store.update_filters(FilterPatch {
        search_query: args.search,
        status_filter: args.status,
    });
    println!(
        "search: \"{}\"\nstatus: {}",
        filters.search_query, filters.status_filter
    );
    Ok(())
}
