//! Immutable ruleset snapshot
//!
//! [`LogRules`] is never modified after construction. The rule store swaps in
//! a new snapshot on every mutation and bumps `version`. Caches (record
//! memos, hit counts) are keyed by the snapshot's generation rather than its
//! version, since two snapshots loaded from different files may share one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::record::LogRecord;
use crate::rule::{BulkRuleMatcher, LogRule};
use crate::verdict::Verdict;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

pub struct LogRules {
    /// Priority order; the first match wins
    rules: Vec<Arc<LogRule>>,
    /// Most recent first, for display only
    reversed: Vec<Arc<LogRule>>,
    version: u64,
    /// Unique per snapshot within the process
    generation: u64,
    matcher: BulkRuleMatcher,
}

impl LogRules {
    pub fn new(rules: Vec<LogRule>, version: u64) -> Self {
        Self::from_shared(rules.into_iter().map(Arc::new).collect(), version)
    }

    /// Builds a snapshot around rules shared with a previous one.
    pub fn from_shared(rules: Vec<Arc<LogRule>>, version: u64) -> Self {
        let reversed = rules.iter().rev().cloned().collect();
        let matcher = BulkRuleMatcher::new(&rules);
        Self {
            rules,
            reversed,
            version,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            matcher,
        }
    }

    pub fn empty() -> Self {
        Self::from_shared(Vec::new(), 0)
    }

    /// Rules in priority order.
    pub fn rules(&self) -> &[Arc<LogRule>] {
        &self.rules
    }

    /// Rules most recent first. Never evaluate in this order.
    pub fn reversed(&self) -> &[Arc<LogRule>] {
        &self.reversed
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub fn matcher(&self) -> &BulkRuleMatcher {
        &self.matcher
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&Arc<LogRule>> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub(crate) fn position(&self, id: u64) -> Option<usize> {
        self.rules.iter().position(|r| r.id == id)
    }

    pub(crate) fn max_id(&self) -> u64 {
        self.rules.iter().map(|r| r.id).max().unwrap_or(0)
    }

    /// Rule deciding this log's verdict, memoized on the record per snapshot.
    pub fn match_log(&self, log: &LogRecord) -> Option<Arc<LogRule>> {
        log.memoized_rule(self.generation, || self.matcher.match_log(log).cloned())
    }

    pub fn verdict(&self, log: &LogRecord) -> Verdict {
        Verdict::of(self.match_log(log).as_deref())
    }
}

impl Default for LogRules {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Debug for LogRules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogRules")
            .field("version", &self.version)
            .field("rules", &self.rules.len())
            .field("split_field", &self.matcher.split_field())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::rule::LogFieldMatcher;

    fn rule(id: u64, ham: bool, source: &str) -> LogRule {
        let mut rule = LogRule::new(ham, vec![LogFieldMatcher::equal("source", source)]);
        rule.id = id;
        rule
    }

    fn log(source: &str) -> LogRecord {
        let stream = HashMap::from([("source".to_owned(), source.to_owned())]);
        LogRecord::new(0, stream, "x")
    }

    #[test]
    fn reversed_is_display_order() {
        let rules = LogRules::new(vec![rule(1, true, "a"), rule(2, true, "b")], 3);
        let ids: Vec<u64> = rules.reversed().iter().map(|r| r.id).collect();
        assert_eq!(ids, [2, 1]);
        assert_eq!(rules.version(), 3);
        assert_eq!(rules.max_id(), 2);
        assert_eq!(rules.position(2), Some(1));
        assert!(rules.get(9).is_none());
    }

    #[test]
    fn match_log_is_memoized_per_version() {
        let entry = log("a");
        let old = LogRules::new(vec![rule(1, true, "a")], 1);
        assert_eq!(old.verdict(&entry), Verdict::Ham);

        let new = LogRules::new(vec![rule(2, false, "a")], 2);
        assert_eq!(new.verdict(&entry), Verdict::Spam);
        assert_eq!(new.match_log(&entry).map(|r| r.id), Some(2));
    }

    #[test]
    fn memo_does_not_leak_between_snapshots_with_equal_versions() {
        let entry = log("a");
        let spam = LogRules::new(vec![rule(1, false, "a")], 1);
        let ham = LogRules::new(vec![rule(1, true, "a")], 1);
        assert_ne!(spam.generation(), ham.generation());

        assert_eq!(spam.verdict(&entry), Verdict::Spam);
        assert_eq!(ham.verdict(&entry), Verdict::Ham);
        assert_eq!(spam.verdict(&entry), Verdict::Spam);
    }

    #[test]
    fn empty_ruleset_is_unknown() {
        let rules = LogRules::empty();
        assert!(rules.is_empty());
        assert_eq!(rules.verdict(&log("a")), Verdict::Unknown);
    }
}
