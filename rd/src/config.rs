//! Rankdaemon configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use crate::scheduler::SchedulerConfig;

/// Main rankdaemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration
    pub storage: StorageConfig,

    /// Scheduler configuration
    pub scheduler: SchedulerConfig,

    /// Page fetcher configuration
    pub fetcher: FetcherConfig,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .rankdaemon.yml
        let local_config = PathBuf::from(".rankdaemon.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/rankdaemon/rankdaemon.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("rankdaemon").join("rankdaemon.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        // No config file found, use defaults
        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read just the log level, for logging setup before the full load
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        Self::load(config_path).ok().and_then(|config| config.log_level)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "db-path")]
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: keywordstore::config::default_db_path(),
        }
    }
}

/// Page fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Base URL of the Browserless-style rendering service
    #[serde(rename = "browserless-url")]
    pub browserless_url: String,

    /// Environment variable holding the rendering service token
    #[serde(rename = "token-env")]
    pub token_env: String,

    /// Search endpoint the query is appended to
    #[serde(rename = "search-url")]
    pub search_url: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// How long the rendering service waits for delayed content before
    /// snapshotting the page
    #[serde(rename = "render-wait-ms")]
    pub render_wait_ms: u64,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            browserless_url: "http://localhost:3000".to_string(),
            token_env: "BROWSERLESS_TOKEN".to_string(),
            search_url: "https://search.naver.com/search.naver".to_string(),
            timeout_ms: 30_000,
            render_wait_ms: 3_000,
        }
    }
}
