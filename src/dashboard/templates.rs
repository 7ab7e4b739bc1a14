//! HTML page for the web dashboard, embedded at compile time.

/// Single-page dashboard. Polls `/api/dashboard` and renders each widget view.
pub const INDEX_TEMPLATE: &str = include_str!("templates/index.html");
