#![doc = include_str!("../README.md")]
//!
//! # Modules
//!
//! - [`record`]: log records, payload parsing, content hash, field resolution
//! - [`rule`]: rules, matchers and the bulk split-field matcher
//! - [`verdict`]: first-match evaluation and the ham/spam verdict
//! - [`ruleset`]: immutable versioned ruleset snapshots
//! - [`store`]: the lock-protected, file-backed rule store
//! - [`buffer`]: newest-first ingestion buffer with watermark and retry cooldown
//! - [`source`]: log source trait with Loki and in-memory adapters
//! - [`summary`]: per-source rule statistics
//! - [`filter`]: substring filtering for listings
//! - [`config`]: engine settings derived from the core config
//! - [`error`]: domain error type

pub mod buffer;
pub mod config;
pub mod error;
pub mod filter;
pub mod record;
pub mod rule;
pub mod ruleset;
pub mod source;
pub mod store;
pub mod summary;
pub mod verdict;

// --- re-exports ---

pub use config::{EngineConfig, LokiConfig};
pub use error::EngineError;
pub use filter::{FilterText, filter_text};
pub use record::LogRecord;
pub use rule::{BulkRuleMatcher, LogFieldMatcher, LogRule, MatchOp};
pub use ruleset::LogRules;
pub use source::{ArraySource, LogSource, LokiSource};
pub use store::{Database, RuleChange};
pub use summary::{SourceSummary, rule_source_summary};
pub use verdict::{Verdict, match_rule, split_spam};
