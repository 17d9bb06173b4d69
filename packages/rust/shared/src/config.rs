//! Application configuration for dexrefresh.
//!
//! User config lives at `~/.dexrefresh/dexrefresh.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DexError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "dexrefresh.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".dexrefresh";

// ---------------------------------------------------------------------------
// Config structs (matching dexrefresh.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Record source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Ability fetcher settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Cache sink settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Degree of parallelism for both segmentation and enrichment.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
        }
    }
}

fn default_worker_count() -> usize {
    3
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Path to the flat record file.
    #[serde(default = "default_source_path")]
    pub path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
        }
    }
}

fn default_source_path() -> String {
    "resources/pokemons.csv".into()
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum redirects followed per request.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Keep only effect entries in this language (all languages when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            language: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_max_redirects() -> usize {
    5
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path to the libSQL cache database.
    #[serde(default = "default_cache_path")]
    pub path: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
        }
    }
}

fn default_cache_path() -> String {
    "var/cache/dexrefresh.db".into()
}

impl AppConfig {
    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.worker_count == 0 {
            return Err(DexError::config("pipeline.worker_count must be at least 1"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(DexError::config("fetch.timeout_secs must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Refresh config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime refresh configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    /// Number of segments and enrichment workers.
    pub worker_count: usize,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
        }
    }
}

impl From<&AppConfig> for RefreshConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            worker_count: config.pipeline.worker_count,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.dexrefresh/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| DexError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.dexrefresh/dexrefresh.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load and validate the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DexError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| DexError::config(format!("failed to parse {}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DexError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content = toml::to_string_pretty(&config).map_err(|e| DexError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DexError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
