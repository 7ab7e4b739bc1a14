//! Configuration types and structures.

use crate::types::LayoutSettings;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default port for the web dashboard.
pub const DEFAULT_UI_PORT: u16 = 31995;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub dashboard: DashboardConfig,

    #[serde(default)]
    pub simulator: SimulatorConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from a single YAML file.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Reject values the store and simulator cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.dashboard.refresh_interval_ms == 0 {
            return Err(anyhow!("dashboard.refresh_interval_ms must be greater than 0"));
        }
        if !(0.0..=1.0).contains(&self.simulator.progress_chance) {
            return Err(anyhow!(
                "simulator.progress_chance must be between 0 and 1, got {}",
                self.simulator.progress_chance
            ));
        }
        if self.simulator.max_increment == 0 {
            return Err(anyhow!("simulator.max_increment must be at least 1"));
        }
        if self.simulator.latency_min_ms > self.simulator.latency_max_ms {
            return Err(anyhow!(
                "simulator.latency_min_ms ({}) exceeds latency_max_ms ({})",
                self.simulator.latency_min_ms,
                self.simulator.latency_max_ms
            ));
        }
        if self.dashboard.layout.columns == 0 {
            return Err(anyhow!("dashboard.layout.columns must be at least 1"));
        }
        Ok(())
    }

    /// Ensure the storage directory exists (no-op when headless).
    pub fn ensure_storage_dir(&self) -> Result<()> {
        if !self.dashboard.headless {
            std::fs::create_dir_all(&self.dashboard.storage_dir)?;
        }
        Ok(())
    }
}

/// Store behaviour and persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Interval between automatic project refreshes (default: 5000).
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// Directory holding persisted dashboard state.
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// Run without a storage medium: nothing is loaded or saved.
    #[serde(default)]
    pub headless: bool,

    /// Grid layout hint written alongside the widgets.
    #[serde(default)]
    pub layout: LayoutSettings,
}

impl DashboardConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            storage_dir: default_storage_dir(),
            headless: false,
            layout: LayoutSettings::default(),
        }
    }
}

fn default_refresh_interval_ms() -> u64 {
    5_000
}

fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("project-dashboard"))
        .unwrap_or_else(|| PathBuf::from("project-dashboard/storage"))
}

/// Mock data source tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Probability that an active project advances on a fetch (default: 0.3).
    #[serde(default = "default_progress_chance")]
    pub progress_chance: f64,

    /// Largest progress step in percent (default: 5).
    #[serde(default = "default_max_increment")]
    pub max_increment: u8,

    /// Lower bound of the artificial list latency (default: 500).
    #[serde(default = "default_latency_min_ms")]
    pub latency_min_ms: u64,

    /// Upper bound of the artificial list latency (default: 1000).
    #[serde(default = "default_latency_max_ms")]
    pub latency_max_ms: u64,

    /// Latency of a single project lookup (default: 200).
    #[serde(default = "default_lookup_latency_ms")]
    pub lookup_latency_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            progress_chance: default_progress_chance(),
            max_increment: default_max_increment(),
            latency_min_ms: default_latency_min_ms(),
            latency_max_ms: default_latency_max_ms(),
            lookup_latency_ms: default_lookup_latency_ms(),
        }
    }
}

fn default_progress_chance() -> f64 {
    0.3
}

fn default_max_increment() -> u8 {
    5
}

fn default_latency_min_ms() -> u64 {
    500
}

fn default_latency_max_ms() -> u64 {
    1_000
}

fn default_lookup_latency_ms() -> u64 {
    200
}

/// Server-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// UI configuration for the web dashboard.
    #[serde(default)]
    pub ui: UiConfig,
}

/// UI configuration for the web dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Port for the web dashboard (default: 31995).
    #[serde(default = "default_ui_port")]
    pub port: u16,

    /// Initial retry delay in milliseconds when the dashboard fails to start (default: 15000).
    #[serde(default = "default_retry_initial_ms")]
    pub retry_initial_ms: u64,

    /// Jitter range in milliseconds for retry delay (default: 5000, meaning ±5s).
    #[serde(default = "default_retry_jitter_ms")]
    pub retry_jitter_ms: u64,

    /// Maximum retry interval in milliseconds (default: 240000 = 4 minutes).
    #[serde(default = "default_retry_max_ms")]
    pub retry_max_ms: u64,

    /// Exponential backoff multiplier (default: 2.0).
    #[serde(default = "default_retry_multiplier")]
    pub retry_multiplier: f64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            port: default_ui_port(),
            retry_initial_ms: default_retry_initial_ms(),
            retry_jitter_ms: default_retry_jitter_ms(),
            retry_max_ms: default_retry_max_ms(),
            retry_multiplier: default_retry_multiplier(),
        }
    }
}

fn default_ui_port() -> u16 {
    DEFAULT_UI_PORT
}

fn default_retry_initial_ms() -> u64 {
    15_000
}

fn default_retry_jitter_ms() -> u64 {
    5_000
}

fn default_retry_max_ms() -> u64 {
    240_000
}

fn default_retry_multiplier() -> f64 {
    2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dashboard.refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.dashboard.layout.columns, 3);
        assert_eq!(config.server.ui.port, DEFAULT_UI_PORT);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config: Config = serde_yaml::from_str(
            r#"
simulator:
  progress_chance: 0.5
dashboard:
  layout:
    columns: 2
    gap: 8
"#,
        )
        .unwrap();
        assert_eq!(config.simulator.progress_chance, 0.5);
        assert_eq!(config.simulator.max_increment, 5);
        assert_eq!(config.dashboard.layout.columns, 2);
        assert_eq!(config.dashboard.refresh_interval_ms, 5_000);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.simulator.progress_chance = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.dashboard.refresh_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.simulator.latency_min_ms = 2_000;
        assert!(config.validate().is_err());
    }
}
