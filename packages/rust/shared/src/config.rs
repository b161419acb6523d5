//! Application configuration for LessonForge.
//!
//! User config lives at `~/.lessonforge/lessonforge.toml`.
//! CLI flags override config file values, which override defaults.
//! The config stores the *names* of the credential env vars, never the keys.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{LessonForgeError, Result};
use crate::types::ScalePreset;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "lessonforge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".lessonforge";

// ---------------------------------------------------------------------------
// Config structs (matching lessonforge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Completion-gateway (OpenRouter) settings.
    #[serde(default)]
    pub openrouter: OpenRouterConfig,

    /// Search-gateway (Tavily) settings.
    #[serde(default)]
    pub tavily: TavilyConfig,

    /// Gateway retry policy.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Source-collection policies.
    #[serde(default)]
    pub collector: CollectorConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default generation scale.
    #[serde(default = "default_scale")]
    pub scale: ScalePreset,

    /// Default proficiency level tag passed to discovery/synthesis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Target language for language-learning runs (enables localized fields).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Default database path for the libsql job store.
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            level: None,
            language: None,
            db_path: default_db_path(),
        }
    }
}

fn default_scale() -> ScalePreset {
    ScalePreset::Standard
}
fn default_db_path() -> String {
    "~/.lessonforge/lessonforge.db".into()
}

/// `[openrouter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_openrouter_key_env")]
    pub api_key_env: String,

    /// Default completion model.
    #[serde(default = "default_model")]
    pub default_model: String,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_openrouter_key_env(),
            default_model: default_model(),
        }
    }
}

fn default_openrouter_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_model() -> String {
    "moonshotai/kimi-k2.5".into()
}

/// `[tavily]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TavilyConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_tavily_key_env")]
    pub api_key_env: String,
}

impl Default for TavilyConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_tavily_key_env(),
        }
    }
}

fn default_tavily_key_env() -> String {
    "TAVILY_API_KEY".into()
}

/// `[retry]` section — exponential backoff for both gateways.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call (1 = no retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay before the first retry; doubles per attempt.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay_ms() -> u64 {
    500
}

/// `[collector]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Curated quality-domain allow-list for non-broad presets.
    #[serde(default = "default_domain_allowlist")]
    pub domain_allowlist: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            domain_allowlist: default_domain_allowlist(),
        }
    }
}

fn default_domain_allowlist() -> Vec<String> {
    [
        "en.wikipedia.org",
        "britishcouncil.org",
        "learnenglish.britishcouncil.org",
        "cambridge.org",
        "dictionary.cambridge.org",
        "merriam-webster.com",
        "grammarly.com",
        "thoughtco.com",
        "bbc.co.uk",
        "ef.com",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Resolved API credentials for both gateways.
///
/// Resolution fails fast with a [`LessonForgeError::Config`] when either env
/// var is unset or empty, so a misconfigured run never reaches the paid APIs.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub openrouter_api_key: String,
    pub tavily_api_key: String,
}

impl Credentials {
    /// Resolve credentials from the env vars named in `config`.
    pub fn resolve(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            openrouter_api_key: require_env(&config.openrouter.api_key_env, "OpenRouter")?,
            tavily_api_key: require_env(&config.tavily.api_key_env, "Tavily")?,
        })
    }
}

fn require_env(var_name: &str, provider: &str) -> Result<String> {
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(LessonForgeError::config(format!(
            "{provider} API key not found. Set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.lessonforge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| LessonForgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.lessonforge/lessonforge.toml`).
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
    let content = std::fs::read_to_string(path)
        .map_err(|e| LessonForgeError::config(format!("{}: {e}", path.display())))?;

    toml::from_str(&content).map_err(|e| {
        LessonForgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir)
        .map_err(|e| LessonForgeError::config(format!("{}: {e}", dir.display())))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| LessonForgeError::config(e.to_string()))?;

    std::fs::write(&path, content)
        .map_err(|e| LessonForgeError::config(format!("{}: {e}", path.display())))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
