//! Per-source rule statistics
//!
//! Groups rules by [`LogRule::source_string`] so operators can see which
//! sources carry the most rules and the most matched traffic.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::rule::LogRule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSummary {
    /// Operator and value of the source matcher, empty for source-agnostic rules
    pub source: String,
    pub rule_count: usize,
    /// Buffered logs matched by these rules
    pub hits: usize,
}

/// Summarizes `rules` by source, most rules first, then most hits, then by
/// source name; at most `top_k` entries.
pub fn rule_source_summary(
    rules: &[Arc<LogRule>],
    hit_counts: &HashMap<u64, usize>,
    top_k: usize,
) -> Vec<SourceSummary> {
    let mut by_source: HashMap<String, SourceSummary> = HashMap::new();
    for rule in rules {
        let source = rule.source_string();
        let entry = by_source
            .entry(source.clone())
            .or_insert_with(|| SourceSummary {
                source,
                rule_count: 0,
                hits: 0,
            });
        entry.rule_count += 1;
        entry.hits += hit_counts.get(&rule.id).copied().unwrap_or(0);
    }

    let mut summary: Vec<SourceSummary> = by_source.into_values().collect();
    summary.sort_by(|a, b| {
        b.rule_count
            .cmp(&a.rule_count)
            .then_with(|| b.hits.cmp(&a.hits))
            .then_with(|| a.source.cmp(&b.source))
    });
    summary.truncate(top_k);
    summary
}
