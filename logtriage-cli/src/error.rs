//! CLI-specific error types and exit code mapping

use logtriage_core::error::LogTriageError;
use logtriage_engine::EngineError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The requested rule or log does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The log source could not be reached or is not configured.
    #[error("log source error: {0}")]
    Source(String),

    /// Rule store error other than the above.
    #[error("rule store error: {0}")]
    Engine(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped error from logtriage-core.
    #[error("{0}")]
    Core(#[from] LogTriageError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                      |
    /// |------|------------------------------|
    /// | 0    | Success                      |
    /// | 1    | General / command error      |
    /// | 2    | Configuration error          |
    /// | 3    | Rule or log not found        |
    /// | 4    | Log source unavailable       |
    /// | 10   | IO error                     |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(LogTriageError::Config(_)) => 2,
            Self::NotFound(_) => 3,
            Self::Source(_) => 4,
            Self::Io(_) | Self::Core(LogTriageError::Io(_)) => 10,
            Self::Command(_) | Self::Engine(_) | Self::JsonSerialize(_) | Self::Core(_) => 1,
        }
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        if e.is_not_found() {
            Self::NotFound(e.to_string())
        } else if e.is_source_error() {
            Self::Source(e.to_string())
        } else {
            Self::Engine(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logtriage_core::error::ConfigError;

    #[test]
    fn test_exit_code_config_error() {
        assert_eq!(CliError::Config("bad".to_owned()).exit_code(), 2);
        let core: CliError = LogTriageError::Config(ConfigError::FileNotFound {
            path: "logtriage.toml".to_owned(),
        })
        .into();
        assert_eq!(core.exit_code(), 2, "core config error should return exit code 2");
    }

    #[test]
    fn test_exit_code_not_found() {
        let err: CliError = EngineError::RuleNotFound { id: 3 }.into();
        assert!(matches!(err, CliError::NotFound(_)));
        assert_eq!(err.exit_code(), 3);

        let err: CliError = EngineError::HashNotFound { hash: 9 }.into();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_exit_code_source_error() {
        let err: CliError = EngineError::SourceMissing.into();
        assert_eq!(err.exit_code(), 4, "missing source should return exit code 4");

        let err: CliError = EngineError::SourceUnavailable {
            source_type: "loki".to_owned(),
            reason: "connection refused".to_owned(),
        }
        .into();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_exit_code_persistence_error() {
        let err: CliError = EngineError::Persistence {
            path: "db.json".to_owned(),
            reason: "read-only file system".to_owned(),
        }
        .into();
        assert!(matches!(err, CliError::Engine(_)));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_code_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "stdout closed");
        assert_eq!(CliError::Io(io_err).exit_code(), 10);
    }

    #[test]
    fn test_error_display_command() {
        let err = CliError::Command("unknown section: x".to_owned());
        assert_eq!(err.to_string(), "unknown section: x");
    }
}
