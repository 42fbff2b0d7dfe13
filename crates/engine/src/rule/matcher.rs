//! Compiled matcher predicates
//!
//! A [`LogFieldMatcher`](super::LogFieldMatcher) resolves its operator and
//! operand into a [`CompiledMatch`] on first use and keeps it. Compilation
//! never fails: an unsupported operator or a malformed pattern compiles to
//! [`CompiledMatch::Never`].

use regex::Regex;

use super::types::MatchOp;

#[derive(Debug, Clone)]
pub enum CompiledMatch {
    /// Equal to the matcher's value
    Exact,
    /// Full match of an anchored pattern
    Regex(Regex),
    /// Matches nothing
    Never,
}

impl CompiledMatch {
    pub fn compile(op: MatchOp, value: &str) -> Self {
        match op {
            MatchOp::Equal => Self::Exact,
            // Anchor the whole alternation, not just its first and last branch.
            MatchOp::Regex => match Regex::new(&format!("^(?:{value})$")) {
                Ok(regex) => Self::Regex(regex),
                Err(e) => {
                    tracing::debug!(pattern = value, error = %e, "invalid matcher regex, never matches");
                    Self::Never
                }
            },
            MatchOp::Unsupported => Self::Never,
        }
    }

    /// `value` is the matcher's operand, `candidate` the resolved log field.
    pub fn matches(&self, value: &str, candidate: &str) -> bool {
        match self {
            Self::Exact => candidate == value,
            Self::Regex(regex) => regex.is_match(candidate),
            Self::Never => false,
        }
    }
}
