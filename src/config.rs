//! TOML configuration.
//!
//! Every section has defaults, so an empty file (or no file at all, see
//! [`load_or_minimal`]) yields a working setup that stores tab captures in
//! `./tab_data` and listens on `0.0.0.0:5000`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
    #[serde(default)]
    pub stocks: StocksConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from("tab_data")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Request body cap in bytes. Unset means no cap: a batch carries the
    /// full page text of every tab in the window.
    #[serde(default)]
    pub max_body_bytes: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: None,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:5000".to_string()
}

/// Artifacts are never deleted during ingestion. `keep` only supplies the
/// default for `tabr prune` when `--keep` is not given.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RetentionConfig {
    #[serde(default)]
    pub keep: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StocksConfig {
    #[serde(default = "default_stocks_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_chart_days")]
    pub chart_days: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// TrueType font for chart text. Unset means a well-known system font.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

impl Default for StocksConfig {
    fn default() -> Self {
        Self {
            base_url: default_stocks_base_url(),
            api_key: None,
            chart_days: default_chart_days(),
            timeout_secs: default_timeout_secs(),
            font_path: None,
        }
    }
}

fn default_stocks_base_url() -> String {
    "https://www.alphavantage.co/query".to_string()
}
fn default_chart_days() -> usize {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl StocksConfig {
    /// API key from the config file, else `ALPHA_VANTAGE_API_KEY`.
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        match std::env::var("ALPHA_VANTAGE_API_KEY") {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => anyhow::bail!(
                "Alpha Vantage API key is required: set stocks.api_key or ALPHA_VANTAGE_API_KEY"
            ),
        }
    }
}

impl Config {
    /// Built-in defaults, used when no config file exists.
    pub fn minimal() -> Self {
        Self {
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
            retention: RetentionConfig::default(),
            stocks: StocksConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config(&content)
}

/// Like [`load_config`], but a missing file falls back to [`Config::minimal`].
/// A file that exists and fails to parse is still an error.
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file not found, using defaults");
        return Ok(Config::minimal());
    }
    load_config(path)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.server.max_body_bytes == Some(0) {
        anyhow::bail!("server.max_body_bytes must be >= 1");
    }

    if config.stocks.chart_days < 2 {
        anyhow::bail!("stocks.chart_days must be >= 2");
    }

    if config.retention.keep == Some(0) {
        anyhow::bail!("retention.keep must be >= 1");
    }

    Ok(config)
}
