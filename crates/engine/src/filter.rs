//! Text filtering for rule and log listings
//!
//! Orthogonal to classification: a plain case-sensitive substring search.

use std::sync::Arc;

use crate::record::LogRecord;
use crate::rule::LogRule;

/// Something a listing can be filtered on.
pub trait FilterText {
    fn matches_filter_text(&self, needle: &str) -> bool;
}

impl FilterText for LogRule {
    fn matches_filter_text(&self, needle: &str) -> bool {
        LogRule::matches_filter_text(self, needle)
    }
}

impl FilterText for LogRecord {
    fn matches_filter_text(&self, needle: &str) -> bool {
        LogRecord::matches_filter_text(self, needle)
    }
}

impl<T: FilterText + ?Sized> FilterText for Arc<T> {
    fn matches_filter_text(&self, needle: &str) -> bool {
        (**self).matches_filter_text(needle)
    }
}

/// Items containing `needle`, at most `limit` of them.
///
/// An empty needle filters nothing; `limit` still applies.
pub fn filter_text<T: FilterText + Clone>(items: &[T], needle: &str, limit: usize) -> Vec<T> {
    items
        .iter()
        .filter(|item| needle.is_empty() || item.matches_filter_text(needle))
        .take(limit)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::rule::LogFieldMatcher;

    fn logs(lines: &[&str]) -> Vec<Arc<LogRecord>> {
        lines
            .iter()
            .map(|l| Arc::new(LogRecord::new(0, HashMap::new(), *l)))
            .collect()
    }

    #[test]
    fn filters_logs_with_limit() {
        let items = logs(&["disk full", "disk ok", "net down", "disk gone"]);
        let hits = filter_text(&items, "disk", 2);
        assert_eq!(
            hits.iter().map(|l| l.raw()).collect::<Vec<_>>(),
            ["disk full", "disk ok"]
        );
    }

    #[test]
    fn empty_needle_keeps_everything() {
        let items = logs(&["a", "b"]);
        assert_eq!(filter_text(&items, "", usize::MAX).len(), 2);
    }

    #[test]
    fn filters_rules() {
        let rules = vec![
            Arc::new(LogRule::new(false, vec![LogFieldMatcher::equal("source", "cron")])),
            Arc::new(LogRule::new(true, vec![]).with_comment("keep cron failures")),
            Arc::new(LogRule::new(true, vec![LogFieldMatcher::equal("source", "web")])),
        ];
        assert_eq!(filter_text(&rules, "cron", 10).len(), 2);
        assert!(filter_text(&rules, "CRON", 10).is_empty());
    }
}
