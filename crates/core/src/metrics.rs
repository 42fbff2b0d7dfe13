//! Metric names and descriptions
//!
//! Every metric the engine records is named here. Call sites use the
//! constants with `metrics::counter!()` / `metrics::gauge!()`.
//!
//! # Naming
//!
//! - prefix: `logtriage_`
//! - suffix: `_total` for counters, none for gauges
//!
//! ```ignore
//! metrics::counter!(logtriage_core::metrics::LOGS_INGESTED_TOTAL).increment(3);
//! ```

// ─── label keys ────────────────────────────────────────────────────

/// Rule mutation kind (add, update, delete, classify)
pub const LABEL_ACTION: &str = "action";

/// Log source type (loki, array)
pub const LABEL_SOURCE: &str = "source";

// ─── ingestion ─────────────────────────────────────────────────────

/// Records accepted into the log buffer (counter)
pub const LOGS_INGESTED_TOTAL: &str = "logtriage_logs_ingested_total";

/// Failed log source polls (counter, label: source)
pub const SOURCE_ERRORS_TOTAL: &str = "logtriage_source_errors_total";

/// Records currently held in the log buffer (gauge)
pub const BUFFER_SIZE: &str = "logtriage_buffer_size";

// ─── rule store ────────────────────────────────────────────────────

/// Successful ruleset mutations (counter, label: action)
pub const RULE_MUTATIONS_TOTAL: &str = "logtriage_rule_mutations_total";

/// Ruleset writes that failed and were rolled back (counter)
pub const PERSIST_FAILURES_TOTAL: &str = "logtriage_persist_failures_total";

/// Rules in the current snapshot (gauge)
pub const RULES_LOADED: &str = "logtriage_rules_loaded";

/// Current ruleset version (gauge)
pub const RULESET_VERSION: &str = "logtriage_ruleset_version";

/// Registers descriptions for every metric.
///
/// Safe to call without a recorder installed; it is then a no-op.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        LOGS_INGESTED_TOTAL,
        "Total number of log records accepted into the buffer"
    );
    describe_counter!(
        SOURCE_ERRORS_TOTAL,
        "Total number of failed log source polls"
    );
    describe_gauge!(BUFFER_SIZE, "Number of log records held in the buffer");
    describe_counter!(
        RULE_MUTATIONS_TOTAL,
        "Total number of committed ruleset mutations"
    );
    describe_counter!(
        PERSIST_FAILURES_TOTAL,
        "Total number of ruleset writes that failed"
    );
    describe_gauge!(RULES_LOADED, "Number of rules in the current ruleset");
    describe_gauge!(RULESET_VERSION, "Version counter of the current ruleset");
}
