//! Classification rules
//!
//! - [`types`]: [`LogRule`] and [`LogFieldMatcher`], in the on-disk JSON shape
//! - [`matcher`]: lazily compiled matcher predicates
//! - [`bulk`]: [`BulkRuleMatcher`], the split-field bucketed evaluator

pub mod bulk;
pub mod matcher;
pub mod types;

pub use bulk::BulkRuleMatcher;
pub use matcher::CompiledMatch;
pub use types::{LogFieldMatcher, LogRule, MatchOp};
