//! Tiered configuration.
//!
//! Sources, lowest to highest priority, merged field by field:
//! 1. **Defaults** - compiled in
//! 2. **Project** - `$CWD/project-dashboard/config.yaml`
//! 3. **User** - `~/.project-dashboard/config.yaml`
//! 4. **Environment** - see below
//!
//! ## Environment Variables
//! - `PROJECT_DASHBOARD_CONFIG_PATH` - Explicit config file (overrides tiers 2-3)
//! - `PROJECT_DASHBOARD_STORAGE_DIR` - Storage directory
//! - `PROJECT_DASHBOARD_REFRESH_MS` - Refresh interval in milliseconds
//! - `PROJECT_DASHBOARD_PORT` - Web dashboard port
//! - `PROJECT_DASHBOARD_USER_DIR` - User config dir (default: `~/.project-dashboard`)
//! - `PROJECT_DASHBOARD_PROJECT_DIR` - Project config dir (default: `./project-dashboard`)

mod loader;
mod merge;
mod types;

pub use loader::{ConfigLoader, ConfigPaths, ConfigTier};
pub use merge::overlay_tier;
pub use types::*;
