//! Configuration: `logtriage.toml` parsing and runtime settings
//!
//! [`LogTriageConfig`] is the top-level structure holding every section.
//!
//! # Precedence
//! 1. CLI arguments (applied by the binary)
//! 2. Environment variables (`LOGTRIAGE_SOURCE_LOKI_SERVER=...`)
//! 3. The config file (`logtriage.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), logtriage_core::error::LogTriageError> {
//! use logtriage_core::config::LogTriageConfig;
//!
//! let config = LogTriageConfig::load("logtriage.toml").await?;
//! let config = LogTriageConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogTriageError};

/// Stream labels left out of rules synthesized by classify-by-hash.
pub const DEFAULT_IGNORED_STREAM_KEYS: [&str; 4] =
    ["forwarder", "host", "source_source", "source_type"];

/// logtriage configuration
///
/// Maps the top level of `logtriage.toml`. Each consumer reads only its own section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogTriageConfig {
    /// Logging settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Rule database settings
    #[serde(default)]
    pub database: DatabaseSection,
    /// Upstream log source settings
    #[serde(default)]
    pub source: SourceSection,
}

impl LogTriageConfig {
    /// Loads a TOML file and applies environment overrides.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogTriageError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogTriageError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogTriageError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogTriageError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, LogTriageError> {
        toml::from_str(toml_str).map_err(|e| {
            LogTriageError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies `LOGTRIAGE_{SECTION}_{FIELD}` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGTRIAGE_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGTRIAGE_GENERAL_LOG_FORMAT");

        // Database
        override_string(&mut self.database.path, "LOGTRIAGE_DATABASE_PATH");
        override_csv(
            &mut self.database.ignored_stream_keys,
            "LOGTRIAGE_DATABASE_IGNORED_STREAM_KEYS",
        );

        // Source
        override_string(&mut self.source.loki_server, "LOGTRIAGE_SOURCE_LOKI_SERVER");
        override_string(
            &mut self.source.loki_selector,
            "LOGTRIAGE_SOURCE_LOKI_SELECTOR",
        );
        override_usize(&mut self.source.query_limit, "LOGTRIAGE_SOURCE_QUERY_LIMIT");
        override_u64(
            &mut self.source.retry_cooldown_secs,
            "LOGTRIAGE_SOURCE_RETRY_COOLDOWN_SECS",
        );
        override_u64(
            &mut self.source.request_timeout_secs,
            "LOGTRIAGE_SOURCE_REQUEST_TIMEOUT_SECS",
        );
    }

    /// Validates field values.
    pub fn validate(&self) -> Result<(), LogTriageError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.database.path.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "database.path".to_owned(),
                reason: "path must not be empty".to_owned(),
            }
            .into());
        }

        if self.source.query_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "source.query_limit".to_owned(),
                reason: "must be greater than 0".to_owned(),
            }
            .into());
        }

        if self.source.is_configured() && self.source.loki_selector.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source.loki_selector".to_owned(),
                reason: "selector must not be empty when loki_server is set".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Rule database settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// JSON file holding the ruleset
    pub path: String,
    /// Stream labels never copied into rules created from a log line
    pub ignored_stream_keys: Vec<String>,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            path: "db.json".to_owned(),
            ignored_stream_keys: DEFAULT_IGNORED_STREAM_KEYS
                .iter()
                .map(|k| (*k).to_owned())
                .collect(),
        }
    }
}

/// Upstream log source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    /// Loki base URL; empty means no source is configured
    pub loki_server: String,
    /// LogQL stream selector
    pub loki_selector: String,
    /// Maximum entries per query
    pub query_limit: usize,
    /// Minimum pause after a failed fetch before the source is contacted again
    pub retry_cooldown_secs: u64,
    /// Timeout of one HTTP request
    pub request_timeout_secs: u64,
}

impl SourceSection {
    /// Whether a remote source has been configured.
    pub fn is_configured(&self) -> bool {
        !self.loki_server.is_empty()
    }
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            loki_server: String::new(),
            loki_selector: "{host=~\".+\"}".to_owned(),
            query_limit: 5000,
            retry_cooldown_secs: 5,
            request_timeout_secs: 30,
        }
    }
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
