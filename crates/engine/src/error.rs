//! Engine error types
//!
//! [`EngineError`] covers every failure the rule store, the ingestion buffer
//! and the log sources can report. `From<EngineError> for LogTriageError`
//! lets outer layers propagate it with `?`.

use logtriage_core::error::LogTriageError;

/// Rule engine domain error
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No rule with this ID exists in the current ruleset
    #[error("rule not found: {id}")]
    RuleNotFound {
        /// Requested rule ID
        id: u64,
    },

    /// No buffered log record has this content hash
    #[error("log not found: hash {hash}")]
    HashNotFound {
        /// Requested content hash
        hash: u64,
    },

    /// Log source fetch failed (I/O, bad status, malformed envelope)
    #[error("log source unavailable: {source_type}: {reason}")]
    SourceUnavailable {
        /// Source kind (loki, array)
        source_type: String,
        /// Failure reason
        reason: String,
    },

    /// A poll was refused because the previous one failed too recently
    #[error("log source in retry cooldown: {remaining_ms}ms remaining")]
    RetryCooldown {
        /// Time left before the source may be contacted again
        remaining_ms: u64,
    },

    /// No log source is configured
    #[error("no log source configured")]
    SourceMissing,

    /// Ruleset could not be read from or written to disk
    #[error("persistence error: {path}: {reason}")]
    Persistence {
        /// Database file path
        path: String,
        /// Failure reason
        reason: String,
    },
}

impl EngineError {
    /// True for the expected, user-facing "no such thing" errors.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RuleNotFound { .. } | Self::HashNotFound { .. }
        )
    }

    /// True when the log source could not deliver new records.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            Self::SourceUnavailable { .. } | Self::RetryCooldown { .. } | Self::SourceMissing
        )
    }

    pub(crate) fn persistence(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        Self::Persistence {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<EngineError> for LogTriageError {
    fn from(err: EngineError) -> Self {
        LogTriageError::Engine(err.to_string())
    }
}
