//! TOML configuration for the router and the task pipeline.
//!
//! Credentials never live in the file. Sections name the environment
//! variables to read instead, so a checked-in configuration stays free of
//! secrets.

use crate::router::services::{DEFAULT_MAX_CALL_DEPTH, RouterOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwitchboardConfig {
    /// Agent router settings.
    pub router: RouterConfig,
    /// Language model settings.
    pub llm: LlmConfig,
    /// Event intake settings.
    pub intake: IntakeConfig,
    /// `PostgreSQL` settings.
    pub database: DatabaseConfig,
}

impl SwitchboardConfig {
    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the file cannot be read and
    /// [`ConfigError::Parse`] or [`ConfigError::Invalid`] when its contents
    /// are rejected.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file_path = path.as_ref();
        let text = std::fs::read_to_string(file_path).map_err(|source| ConfigError::Io {
            path: file_path.to_path_buf(),
            message: source.to_string(),
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] for values outside their allowed range.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that the type system cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router.max_call_depth == 0 {
            return Err(ConfigError::Invalid("router.max_call_depth must be positive"));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid("llm.timeout_secs must be positive"));
        }
        if self.intake.recent_task_limit == 0 {
            return Err(ConfigError::Invalid("intake.recent_task_limit must be positive"));
        }
        if self.database.pool_size == 0 {
            return Err(ConfigError::Invalid("database.pool_size must be positive"));
        }
        Ok(())
    }
}

/// Agent router settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Maximum nesting depth of internal agent and tool calls.
    pub max_call_depth: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

impl From<RouterConfig> for RouterOptions {
    fn from(config: RouterConfig) -> Self {
        Self {
            max_call_depth: config.max_call_depth,
        }
    }
}

/// Language model settings for an `OpenAI`-compatible endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model name.
    pub model: String,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Environment variable holding the API key.
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_owned(),
            model: "gpt-4o-mini".to_owned(),
            timeout_secs: 30,
            api_key_env: "OPENAI_API_KEY".to_owned(),
        }
    }
}

impl LlmConfig {
    /// Returns the per-call timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Reads the API key from the configured environment variable.
    ///
    /// Blank values count as absent.
    #[must_use]
    pub fn api_key(&self) -> Option<String> {
        self.api_key_from(|name| std::env::var(name).ok())
    }

    /// Resolves the API key through `lookup` instead of the process
    /// environment.
    #[must_use]
    pub fn api_key_from(&self, lookup: impl FnOnce(&str) -> Option<String>) -> Option<String> {
        lookup(&self.api_key_env)
            .map(|key| key.trim().to_owned())
            .filter(|key| !key.is_empty())
    }
}

/// Event intake settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Number of recent tasks offered to the classifier as context.
    pub recent_task_limit: usize,
    /// Runs a cheap triage pass before full classification.
    pub triage: bool,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            recent_task_limit: 10,
            triage: false,
        }
    }
}

/// `PostgreSQL` settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Environment variable holding the connection URL.
    pub url_env: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url_env: "DATABASE_URL".to_owned(),
            pool_size: 8,
        }
    }
}

impl DatabaseConfig {
    /// Reads the connection URL from the configured environment variable.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        std::env::var(&self.url_env)
            .ok()
            .filter(|url| !url.trim().is_empty())
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {}: {message}", .path.display())]
    Io {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O error.
        message: String,
    },

    /// The TOML was malformed or had the wrong shape.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// A value was outside its allowed range.
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}
