//! Configuration management for sqlchat.
//!
//! Loads optional settings from a TOML file: the model endpoint, where the
//! bundled database lives, how long database handles stay cached, and
//! defaults for the remote connection form.

use crate::error::{Result, SqlChatError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default time-to-live of a cached database handle (2 hours).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 2 * 60 * 60;

/// File name of the bundled read-only database.
pub const LOCAL_DB_FILE: &str = "example.db";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    /// Pre-filled values for the remote connection form.
    #[serde(default)]
    pub remote: RemoteDefaults,
}

/// Language model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// Model name (e.g., "llama3-8b-8192").
    #[serde(default = "default_model")]
    pub model: String,

    /// Chat completions endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_model() -> String {
    "llama3-8b-8192".to_string()
}

fn default_base_url() -> String {
    "https://api.groq.com/openai/v1/chat/completions".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Overrides the location of the bundled database file.
    pub local_path: Option<PathBuf>,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            local_path: None,
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

/// Defaults for the remote connection form. The password is never read from
/// the file.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RemoteDefaults {
    pub host: Option<String>,
    pub port: Option<String>,
    pub user: Option<String>,
    pub database: Option<String>,
}

impl DatabaseConfig {
    /// Resolves the bundled database path.
    ///
    /// Without an override, the file sits next to the crate manifest.
    pub fn local_db_path(&self) -> PathBuf {
        self.local_path
            .clone()
            .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join(LOCAL_DB_FILE))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sqlchat")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file. A missing file yields defaults.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| SqlChatError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            SqlChatError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }
}
