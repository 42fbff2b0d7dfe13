//! Error types shared across the workspace

/// Top-level logtriage error.
#[derive(Debug, thiserror::Error)]
pub enum LogTriageError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Rule engine or rule store error
    #[error("engine error: {0}")]
    Engine(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config file is not valid TOML or does not fit the schema
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A field holds an unacceptable value
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}
