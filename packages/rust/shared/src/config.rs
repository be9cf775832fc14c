//! Application configuration for MarketScope.
//!
//! User config lives at `~/.marketscope/marketscope.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MarketScopeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "marketscope.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".marketscope";

// ---------------------------------------------------------------------------
// Config structs (matching marketscope.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// OpenRouter settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineSection,

    /// Page fetcher settings.
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Web search settings.
    #[serde(default)]
    pub search: SearchConfig,

    /// Storefront lookup endpoints.
    #[serde(default)]
    pub stores: StoresConfig,

    /// Report database settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// OpenAI-compatible API root.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for every inference task.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Per-request timeout.
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            default_model: default_model(),
            timeout_secs: default_inference_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_model() -> String {
    "openai/gpt-4o".into()
}
fn default_inference_timeout() -> u64 {
    60
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Maximum concurrent fan-out tasks (per-URL, per-competitor).
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,

    /// Country code used for trend discovery.
    #[serde(default = "default_trends_country")]
    pub trends_country: String,

    /// Below this many characters the secondary extractor is tried.
    #[serde(default = "default_primary_min_chars")]
    pub primary_min_chars: usize,

    /// Below this many characters a page is reported as failed.
    #[serde(default = "default_final_min_chars")]
    pub final_min_chars: usize,

    /// Maximum characters of page text sent to the model.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    /// Characters of page text kept in the report.
    #[serde(default = "default_stored_excerpt_chars")]
    pub stored_excerpt_chars: usize,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
            trends_country: default_trends_country(),
            primary_min_chars: default_primary_min_chars(),
            final_min_chars: default_final_min_chars(),
            excerpt_chars: default_excerpt_chars(),
            stored_excerpt_chars: default_stored_excerpt_chars(),
        }
    }
}

fn default_max_concurrency() -> u32 {
    4
}
fn default_trends_country() -> String {
    "US".into()
}
fn default_primary_min_chars() -> usize {
    100
}
fn default_final_min_chars() -> usize {
    50
}
fn default_excerpt_chars() -> usize {
    8000
}
fn default_stored_excerpt_chars() -> usize {
    500
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-page timeout.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Redirects followed before giving up.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    15
}
fn default_max_redirects() -> usize {
    5
}

/// `[search]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// HTML results endpoint; the query is sent as `?q=`.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,

    /// Upper bound on returned URLs.
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            max_results: default_max_results(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://html.duckduckgo.com/html/".into()
}
fn default_max_results() -> usize {
    5
}

/// `[stores]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoresConfig {
    /// iTunes Search API endpoint.
    #[serde(default = "default_app_store_endpoint")]
    pub app_store_endpoint: String,

    /// Google Play search page endpoint.
    #[serde(default = "default_google_play_endpoint")]
    pub google_play_endpoint: String,
}

impl Default for StoresConfig {
    fn default() -> Self {
        Self {
            app_store_endpoint: default_app_store_endpoint(),
            google_play_endpoint: default_google_play_endpoint(),
        }
    }
}

fn default_app_store_endpoint() -> String {
    "https://itunes.apple.com/search".into()
}
fn default_google_play_endpoint() -> String {
    "https://play.google.com/store/search".into()
}

/// `[storage]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Report database path. `~` expands to the home directory.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> String {
    "~/.marketscope/reports.db".into()
}

impl StorageConfig {
    /// Resolve `db_path`, expanding a leading `~`.
    pub fn resolved_db_path(&self) -> Result<PathBuf> {
        match self.db_path.strip_prefix("~/") {
            Some(rest) => {
                let home = dirs::home_dir().ok_or_else(|| {
                    MarketScopeError::config("could not determine home directory")
                })?;
                Ok(home.join(rest))
            }
            None => Ok(PathBuf::from(&self.db_path)),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime pipeline configuration, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum concurrent fan-out tasks.
    pub max_concurrency: usize,
    /// Country code for trend discovery.
    pub trends_country: String,
    /// Primary-extractor threshold in characters.
    pub primary_min_chars: usize,
    /// Final extraction threshold in characters.
    pub final_min_chars: usize,
    /// Characters of page text sent to the model.
    pub excerpt_chars: usize,
    /// Characters of page text kept in the report.
    pub stored_excerpt_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        let p = &config.pipeline;
        Self {
            max_concurrency: p.max_concurrency.max(1) as usize,
            trends_country: p.trends_country.clone(),
            primary_min_chars: p.primary_min_chars,
            final_min_chars: p.final_min_chars,
            excerpt_chars: p.excerpt_chars,
            stored_excerpt_chars: p.stored_excerpt_chars,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.marketscope/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MarketScopeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.marketscope/marketscope.toml`).
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

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MarketScopeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        MarketScopeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| MarketScopeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MarketScopeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| MarketScopeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Check that the OpenRouter API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    let var_name = &config.openrouter.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(()),
        _ => Err(MarketScopeError::config(format!(
            "OpenRouter API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://openrouter.ai/keys"
        ))),
    }
}
