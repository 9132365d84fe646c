use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api.exchangerate-api.com";

/// What to do when a fresh rate table has no rate for the selected target.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StaleTargetPolicy {
    /// Keep the selection and report conversions as unavailable.
    #[default]
    Unavailable,
    /// Switch the target to another currency present in the table.
    Reset,
}

/// Whether a refresh tick may start a fetch while another one is outstanding.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    Allow,
    #[default]
    SkipTick,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ChartConfig {
    pub canvas_id: String,
    pub width: u32,
    pub height: u32,
    pub output_dir: PathBuf,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            canvas_id: "myChart".to_string(),
            width: 700,
            height: 200,
            output_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub base_currency: String,
    pub target_currency: String,
    pub amount: f64,
    pub refresh_interval_secs: u64,
    pub stale_target: StaleTargetPolicy,
    pub overlap: OverlapPolicy,
    pub chart: ChartConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            provider: ProviderConfig::default(),
            base_currency: "USD".to_string(),
            target_currency: "INR".to_string(),
            amount: 1.0,
            refresh_interval_secs: 60,
            stale_target: StaleTargetPolicy::default(),
            overlap: OverlapPolicy::default(),
            chart: ChartConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults when
    /// no file exists there.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "fxconv", "fxconv")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}
