//! Rule data types
//!
//! Serialized with the field naming of existing database files:
//!
//! ```json
//! {
//!  "ID": 3,
//!  "Disabled": false,
//!  "Ham": false,
//!  "Matchers": [
//!   { "Field": "source", "Op": "=", "Value": "cron" },
//!   { "Field": "message", "Op": "=~", "Value": "job .* finished" }
//!  ],
//!  "Comment": "cron chatter",
//!  "Version": 2
//! }
//! ```

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::rule::matcher::CompiledMatch;

/// Matcher operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOp {
    /// Exact string equality
    #[default]
    #[serde(rename = "=")]
    Equal,
    /// Regex full match
    #[serde(rename = "=~")]
    Regex,
    /// Anything else read from disk; never matches
    #[serde(other)]
    Unsupported,
}

impl MatchOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Regex => "=~",
            Self::Unsupported => "?",
        }
    }
}

/// One field condition of a rule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LogFieldMatcher {
    pub field: String,
    pub op: MatchOp,
    pub value: String,
    #[serde(skip)]
    compiled: OnceLock<CompiledMatch>,
}

impl LogFieldMatcher {
    pub fn new(field: impl Into<String>, op: MatchOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
            compiled: OnceLock::new(),
        }
    }

    /// `field = value`
    pub fn equal(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, MatchOp::Equal, value)
    }

    /// `field =~ pattern`
    pub fn regex(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, MatchOp::Regex, pattern)
    }

    /// Empty field and empty value: an always-true placeholder left by the editor.
    pub fn is_placeholder(&self) -> bool {
        self.field.is_empty() && self.value.is_empty()
    }

    /// Tests an already resolved field value.
    pub fn matches_value(&self, candidate: &str) -> bool {
        self.compiled
            .get_or_init(|| CompiledMatch::compile(self.op, &self.value))
            .matches(&self.value, candidate)
    }

    pub fn matches_filter_text(&self, needle: &str) -> bool {
        self.value.contains(needle)
    }
}

impl PartialEq for LogFieldMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field && self.op == other.op && self.value == other.value
    }
}

impl Eq for LogFieldMatcher {}

/// A classification rule.
///
/// Matches a log when every matcher matches. `id == 0` means not yet stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LogRule {
    #[serde(rename = "ID")]
    pub id: u64,
    pub disabled: bool,
    /// Matching logs are interesting (ham) rather than noise (spam)
    pub ham: bool,
    pub matchers: Vec<LogFieldMatcher>,
    pub comment: String,
    /// Bumped on every committed update; checked by `add_or_update`
    pub version: u64,
}

impl LogRule {
    pub fn new(ham: bool, matchers: Vec<LogFieldMatcher>) -> Self {
        Self {
            ham,
            matchers,
            ..Self::default()
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Case-sensitive substring search over the comment and matcher values.
    pub fn matches_filter_text(&self, needle: &str) -> bool {
        self.comment.contains(needle) || self.matchers.iter().any(|m| m.matches_filter_text(needle))
    }

    /// Operator and value of the first matcher on `source`, e.g. `=cron`.
    ///
    /// Empty when the rule does not constrain the source.
    pub fn source_string(&self) -> String {
        self.matchers
            .iter()
            .find(|m| m.field == "source")
            .map(|m| format!("{}{}", m.op.as_str(), m.value))
            .unwrap_or_default()
    }
}
