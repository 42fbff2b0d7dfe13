//! Verdict evaluation
//!
//! [`match_rule`] is the reference first-match scan: rules are checked in
//! priority (insertion) order and the first enabled rule whose matchers all
//! match wins. [`BulkRuleMatcher`](crate::rule::BulkRuleMatcher) must agree
//! with it for every log.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::record::LogRecord;
use crate::rule::{LogFieldMatcher, LogRule};
use crate::ruleset::LogRules;

/// Classification outcome of one log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Verdict {
    /// No rule matched
    Unknown,
    /// Interesting
    Ham,
    /// Noise
    Spam,
}

impl Verdict {
    pub fn of(rule: Option<&LogRule>) -> Self {
        match rule {
            None => Self::Unknown,
            Some(rule) if rule.ham => Self::Ham,
            Some(_) => Self::Spam,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "Unknown"),
            Self::Ham => write!(f, "Ham"),
            Self::Spam => write!(f, "Spam"),
        }
    }
}

/// Evaluates one matcher; placeholders always pass.
pub fn matcher_matches(matcher: &LogFieldMatcher, log: &LogRecord) -> bool {
    if matcher.is_placeholder() {
        return true;
    }
    log.resolve_field(&matcher.field)
        .is_some_and(|value| matcher.matches_value(value))
}

/// True when `rule` is enabled and all of its matchers match.
pub fn rule_matches(rule: &LogRule, log: &LogRecord) -> bool {
    !rule.disabled && rule.matchers.iter().all(|m| matcher_matches(m, log))
}

/// Linear first-match scan in list order.
pub fn match_rule<'a>(log: &LogRecord, rules: &'a [Arc<LogRule>]) -> Option<&'a Arc<LogRule>> {
    rules.iter().find(|rule| rule_matches(rule, log))
}

/// Partitions logs into (not spam, spam), keeping order within each half.
pub fn split_spam(
    logs: &[Arc<LogRecord>],
    rules: &LogRules,
) -> (Vec<Arc<LogRecord>>, Vec<Arc<LogRecord>>) {
    logs.iter()
        .cloned()
        .partition(|log| rules.verdict(log) != Verdict::Spam)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn log(stream: &[(&str, &str)], raw: &str) -> LogRecord {
        let stream: HashMap<String, String> = stream
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        LogRecord::new(0, stream, raw)
    }

    fn rule(id: u64, ham: bool, matchers: Vec<LogFieldMatcher>) -> Arc<LogRule> {
        let mut rule = LogRule::new(ham, matchers);
        rule.id = id;
        Arc::new(rule)
    }

    #[test]
    fn first_matching_rule_wins() {
        let entry = log(&[("source", "cron")], "job done");
        let a = rule(1, true, vec![LogFieldMatcher::equal("source", "cron")]);
        let b = rule(2, false, vec![LogFieldMatcher::equal("message", "job done")]);

        let ab = [a.clone(), b.clone()];
        let ba = [b, a];
        assert_eq!(match_rule(&entry, &ab).map(|r| r.id), Some(1));
        assert_eq!(match_rule(&entry, &ba).map(|r| r.id), Some(2));
    }

    #[test]
    fn all_matchers_must_match() {
        let entry = log(&[("source", "cron"), ("host", "a")], "x");
        let r = rule(
            1,
            false,
            vec![
                LogFieldMatcher::equal("source", "cron"),
                LogFieldMatcher::equal("host", "b"),
            ],
        );
        assert!(!rule_matches(&r, &entry));
    }

    #[test]
    fn disabled_rule_is_skipped() {
        let entry = log(&[("source", "cron")], "x");
        let mut disabled = LogRule::new(true, vec![LogFieldMatcher::equal("source", "cron")]);
        disabled.id = 1;
        disabled.disabled = true;
        let fallback = rule(2, false, vec![LogFieldMatcher::regex("source", "c.*")]);

        let rules = [Arc::new(disabled), fallback];
        assert_eq!(match_rule(&entry, &rules).map(|r| r.id), Some(2));
        assert_eq!(match_rule(&entry, &rules[..1]), None);
    }

    #[test]
    fn placeholder_matcher_always_passes() {
        let entry = log(&[], "anything");
        let placeholder = LogFieldMatcher::default();
        assert!(matcher_matches(&placeholder, &entry));
        assert!(rule_matches(&rule(1, true, vec![placeholder]), &entry));
    }

    #[test]
    fn rule_without_matchers_matches_everything() {
        assert!(rule_matches(&rule(1, true, vec![]), &log(&[], "x")));
    }

    #[test]
    fn unresolvable_field_fails() {
        let entry = log(&[], "x");
        assert!(!matcher_matches(&LogFieldMatcher::equal("host", ""), &entry));
        // empty field with a value is not a placeholder
        assert!(!matcher_matches(&LogFieldMatcher::equal("", "x"), &entry));
    }

    #[test]
    fn message_field_uses_extracted_message() {
        let entry = log(&[], r#"{"message":"started","pid":"42"}"#);
        assert!(matcher_matches(&LogFieldMatcher::equal("message", "started"), &entry));
        assert!(matcher_matches(&LogFieldMatcher::equal("pid", "42"), &entry));
    }

    #[test]
    fn regex_matcher_is_anchored() {
        let entry = log(&[("k", "WHEE")], "x");
        assert!(!matcher_matches(&LogFieldMatcher::regex("k", "H"), &entry));
        assert!(matcher_matches(&LogFieldMatcher::regex("k", ".*H.*"), &entry));
    }

    #[test]
    fn verdict_of_rule() {
        assert_eq!(Verdict::of(None), Verdict::Unknown);
        assert_eq!(Verdict::of(Some(&LogRule::new(true, vec![]))), Verdict::Ham);
        assert_eq!(Verdict::of(Some(&LogRule::new(false, vec![]))), Verdict::Spam);
        assert_eq!(Verdict::Spam.to_string(), "Spam");
    }

    #[test]
    fn split_spam_keeps_order() {
        let logs: Vec<Arc<LogRecord>> = ["a", "noise", "b", "noise"]
            .iter()
            .map(|m| Arc::new(log(&[], m)))
            .collect();
        let rules = LogRules::new(
            vec![LogRule::new(false, vec![LogFieldMatcher::equal("message", "noise")])],
            1,
        );
        let (ham, spam) = split_spam(&logs, &rules);
        assert_eq!(
            ham.iter().map(|l| l.message()).collect::<Vec<_>>(),
            ["a", "b"]
        );
        assert_eq!(spam.len(), 2);
    }
}
