//! Split-field bulk matcher
//!
//! Rules that gate on the same exact-match field (usually `source` or a
//! service label) are bucketed by that field's value, so a log is checked
//! only against rules that can possibly match it.
//!
//! # Construction
//! 1. Tally exact-match (`=`) matchers per field name over all enabled rules.
//! 2. The most frequent field is the split field; ties go to the smallest name.
//! 3. Walk rules in order. A rule with `split_field = value` joins the current
//!    bucket under `value`; any other rule closes the bucket and becomes a
//!    single-rule unit. Priority order is therefore preserved exactly.
//!
//! Evaluating a log walks the units in order and returns the first match, the
//! same rule [`match_rule`](crate::verdict::match_rule) would return.

use std::collections::HashMap;
use std::mem;
use std::sync::Arc;

use super::types::{LogRule, MatchOp};
use crate::record::LogRecord;
use crate::verdict::rule_matches;

enum MatchUnit {
    /// Rules keyed by their split-field value, in priority order per key
    Bucket(HashMap<String, Vec<Arc<LogRule>>>),
    Single(Arc<LogRule>),
}

/// Ordered sequence of bucket and single-rule units built from one ruleset.
pub struct BulkRuleMatcher {
    split_field: Option<String>,
    units: Vec<MatchUnit>,
    fast_rules: usize,
    slow_rules: usize,
}

impl BulkRuleMatcher {
    /// Builds the matcher. Never fails; without any exact matcher every rule
    /// becomes a single-rule unit.
    pub fn new(rules: &[Arc<LogRule>]) -> Self {
        let split_field = choose_split_field(rules);

        let mut units = Vec::new();
        let mut bucket: HashMap<String, Vec<Arc<LogRule>>> = HashMap::new();
        let mut fast_rules = 0;
        let mut slow_rules = 0;

        for rule in rules.iter().filter(|r| !r.disabled) {
            let key = split_field
                .as_deref()
                .and_then(|field| split_value(rule, field));
            match key {
                Some(value) => {
                    bucket
                        .entry(value.to_owned())
                        .or_default()
                        .push(Arc::clone(rule));
                    fast_rules += 1;
                }
                None => {
                    if !bucket.is_empty() {
                        units.push(MatchUnit::Bucket(mem::take(&mut bucket)));
                    }
                    units.push(MatchUnit::Single(Arc::clone(rule)));
                    slow_rules += 1;
                }
            }
        }
        if !bucket.is_empty() {
            units.push(MatchUnit::Bucket(bucket));
        }

        tracing::debug!(
            split_field = split_field.as_deref().unwrap_or(""),
            units = units.len(),
            fast_rules,
            slow_rules,
            "bulk rule matcher built"
        );

        Self {
            split_field,
            units,
            fast_rules,
            slow_rules,
        }
    }

    /// First matching rule in priority order.
    pub fn match_log(&self, log: &LogRecord) -> Option<&Arc<LogRule>> {
        let split_value = self
            .split_field
            .as_deref()
            .and_then(|field| log.resolve_field(field));

        for unit in &self.units {
            let found = match unit {
                MatchUnit::Bucket(bucket) => split_value
                    .and_then(|value| bucket.get(value))
                    .and_then(|candidates| candidates.iter().find(|r| rule_matches(r, log))),
                MatchUnit::Single(rule) => rule_matches(rule, log).then_some(rule),
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    pub fn split_field(&self) -> Option<&str> {
        self.split_field.as_deref()
    }

    /// Rules reachable through a bucket lookup.
    pub fn fast_rules(&self) -> usize {
        self.fast_rules
    }

    /// Rules evaluated individually.
    pub fn slow_rules(&self) -> usize {
        self.slow_rules
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}

fn choose_split_field(rules: &[Arc<LogRule>]) -> Option<String> {
    let mut tally: HashMap<&str, usize> = HashMap::new();
    for rule in rules.iter().filter(|r| !r.disabled) {
        for matcher in &rule.matchers {
            if matcher.op == MatchOp::Equal && !matcher.is_placeholder() {
                *tally.entry(matcher.field.as_str()).or_default() += 1;
            }
        }
    }
    tally
        .into_iter()
        .max_by(|(a_field, a_count), (b_field, b_count)| {
            a_count.cmp(b_count).then_with(|| b_field.cmp(a_field))
        })
        .map(|(field, _)| field.to_owned())
}

/// Operand of the rule's first exact matcher on `field`.
fn split_value<'a>(rule: &'a LogRule, field: &str) -> Option<&'a str> {
    rule.matchers
        .iter()
        .find(|m| m.op == MatchOp::Equal && m.field == field && !m.is_placeholder())
        .map(|m| m.value.as_str())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::rule::LogFieldMatcher;
    use crate::verdict::match_rule;

    fn rules(specs: Vec<Vec<LogFieldMatcher>>) -> Vec<Arc<LogRule>> {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, matchers)| {
                let mut rule = LogRule::new(false, matchers);
                rule.id = i as u64 + 1;
                Arc::new(rule)
            })
            .collect()
    }

    fn log(stream: &[(&str, &str)], raw: &str) -> LogRecord {
        let stream: HashMap<String, String> = stream
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        LogRecord::new(0, stream, raw)
    }

    #[test]
    fn empty_ruleset() {
        let matcher = BulkRuleMatcher::new(&[]);
        assert_eq!(matcher.split_field(), None);
        assert_eq!(matcher.unit_count(), 0);
        assert!(matcher.match_log(&log(&[], "x")).is_none());
    }

    #[test]
    fn picks_most_frequent_exact_field() {
        let rs = rules(vec![
            vec![LogFieldMatcher::equal("source", "a")],
            vec![LogFieldMatcher::equal("source", "b")],
            vec![LogFieldMatcher::equal("host", "h")],
            vec![LogFieldMatcher::regex("host", ".*")],
            vec![LogFieldMatcher::regex("host", ".*")],
        ]);
        let matcher = BulkRuleMatcher::new(&rs);
        assert_eq!(matcher.split_field(), Some("source"));
        assert_eq!(matcher.fast_rules(), 2);
        assert_eq!(matcher.slow_rules(), 3);
    }

    #[test]
    fn ties_break_on_smallest_field_name() {
        let rs = rules(vec![
            vec![LogFieldMatcher::equal("zeta", "1")],
            vec![LogFieldMatcher::equal("alpha", "1")],
        ]);
        assert_eq!(BulkRuleMatcher::new(&rs).split_field(), Some("alpha"));
    }

    #[test]
    fn no_exact_matchers_means_all_slow() {
        let rs = rules(vec![
            vec![LogFieldMatcher::regex("source", "a.*")],
            vec![LogFieldMatcher::default()],
        ]);
        let matcher = BulkRuleMatcher::new(&rs);
        assert_eq!(matcher.split_field(), None);
        assert_eq!(matcher.slow_rules(), 2);
        assert_eq!(matcher.unit_count(), 2);
    }

    #[test]
    fn slow_rule_splits_buckets_and_keeps_priority() {
        let rs = rules(vec![
            vec![LogFieldMatcher::equal("source", "cron"), LogFieldMatcher::equal("message", "x")],
            vec![LogFieldMatcher::regex("message", "y")],
            vec![LogFieldMatcher::equal("source", "cron")],
        ]);
        let matcher = BulkRuleMatcher::new(&rs);
        assert_eq!(matcher.unit_count(), 3);

        let entry = log(&[("source", "cron")], "y");
        assert_eq!(matcher.match_log(&entry).map(|r| r.id), Some(2));
        assert_eq!(match_rule(&entry, &rs).map(|r| r.id), Some(2));
    }

    #[test]
    fn bucket_preserves_order_within_key() {
        let rs = rules(vec![
            vec![LogFieldMatcher::equal("source", "cron"), LogFieldMatcher::equal("host", "a")],
            vec![LogFieldMatcher::equal("source", "cron")],
            vec![LogFieldMatcher::equal("source", "web")],
        ]);
        let matcher = BulkRuleMatcher::new(&rs);
        assert_eq!(matcher.unit_count(), 1);
        assert_eq!(
            matcher.match_log(&log(&[("source", "cron"), ("host", "a")], "x")).map(|r| r.id),
            Some(1)
        );
        assert_eq!(
            matcher.match_log(&log(&[("source", "cron"), ("host", "b")], "x")).map(|r| r.id),
            Some(2)
        );
        assert!(matcher.match_log(&log(&[("source", "db")], "x")).is_none());
    }

    #[test]
    fn split_on_message_uses_message_fallback() {
        let rs = rules(vec![
            vec![LogFieldMatcher::equal("message", "boot")],
            vec![LogFieldMatcher::equal("message", "halt")],
        ]);
        let matcher = BulkRuleMatcher::new(&rs);
        assert_eq!(matcher.split_field(), Some("message"));
        let entry = log(&[], r#"{"message":"halt"}"#);
        assert_eq!(matcher.match_log(&entry).map(|r| r.id), Some(2));
    }

    #[test]
    fn disabled_rules_are_left_out() {
        let mut rs = rules(vec![
            vec![LogFieldMatcher::equal("source", "cron")],
            vec![LogFieldMatcher::equal("source", "cron")],
        ]);
        Arc::make_mut(&mut rs[0]).disabled = true;
        let matcher = BulkRuleMatcher::new(&rs);
        assert_eq!(matcher.fast_rules(), 1);
        assert_eq!(
            matcher.match_log(&log(&[("source", "cron")], "x")).map(|r| r.id),
            Some(2)
        );
    }
}
