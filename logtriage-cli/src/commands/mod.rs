//! Command handlers -- one module per subcommand

pub mod classify;
pub mod config;
pub mod logs;
pub mod rules;

use std::path::Path;

use logtriage_core::config::LogTriageConfig;
use logtriage_core::error::{ConfigError, LogTriageError};
use logtriage_engine::{Database, EngineConfig, LokiSource};

use crate::error::CliError;

/// Loads the configuration, falling back to defaults (plus environment
/// overrides) when the file does not exist.
pub async fn load_config(path: &Path) -> Result<LogTriageConfig, LogTriageError> {
    match LogTriageConfig::load(path).await {
        Err(LogTriageError::Config(ConfigError::FileNotFound { .. })) => {
            let mut config = LogTriageConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        other => other,
    }
}

/// Opens the rule store with the Loki source when one is configured.
pub async fn open_database(config: &LogTriageConfig) -> Result<Database<LokiSource>, CliError> {
    let engine_config = EngineConfig::from_core(config);
    let source = engine_config
        .loki
        .as_ref()
        .map(LokiSource::new)
        .transpose()?;
    Ok(Database::open(&engine_config, source).await?)
}
