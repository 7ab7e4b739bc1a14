//! Web dashboard HTTP server.
//!
//! Serves the dashboard page and a JSON API over the shared store.
//! Started by the `serve` command unless disabled.

mod server;
pub mod templates;

pub use server::{
    DashboardHandle, DashboardServer, DashboardStatus, build_router, start_server,
    start_server_with_retry,
};
