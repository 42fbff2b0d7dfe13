//! Engine settings
//!
//! [`EngineConfig`] is derived from the `[database]` and `[source]` sections of
//! [`LogTriageConfig`]; the engine never reads TOML or the environment itself.
//!
//! ```ignore
//! let core_config = LogTriageConfig::load("logtriage.toml").await?;
//! let config = EngineConfig::from_core(&core_config);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use logtriage_core::config::{DEFAULT_IGNORED_STREAM_KEYS, LogTriageConfig};

/// Rule store and ingestion settings
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// JSON file holding the ruleset
    pub database_path: PathBuf,
    /// Stream labels left out of rules synthesized by classify-by-hash
    pub ignored_stream_keys: Vec<String>,
    /// Pause after a failed poll before the source is contacted again
    pub retry_cooldown: Duration,
    /// Loki connection, `None` when no source is configured
    pub loki: Option<LokiConfig>,
}

/// Loki query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LokiConfig {
    /// Base URL, e.g. `http://loki:3100`
    pub server: String,
    /// LogQL stream selector
    pub selector: String,
    /// Maximum entries per query
    pub limit: usize,
    /// Timeout of one HTTP request
    pub timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("db.json"),
            ignored_stream_keys: DEFAULT_IGNORED_STREAM_KEYS
                .iter()
                .map(|k| (*k).to_owned())
                .collect(),
            retry_cooldown: Duration::from_secs(5),
            loki: None,
        }
    }
}

impl EngineConfig {
    /// Builds engine settings from the loaded top-level configuration.
    pub fn from_core(core: &LogTriageConfig) -> Self {
        let loki = core.source.is_configured().then(|| LokiConfig {
            server: core.source.loki_server.trim_end_matches('/').to_owned(),
            selector: core.source.loki_selector.clone(),
            limit: core.source.query_limit,
            timeout: Duration::from_secs(core.source.request_timeout_secs),
        });

        Self {
            database_path: PathBuf::from(&core.database.path),
            ignored_stream_keys: core.database.ignored_stream_keys.clone(),
            retry_cooldown: Duration::from_secs(core.source.retry_cooldown_secs),
            loki,
        }
    }
}
