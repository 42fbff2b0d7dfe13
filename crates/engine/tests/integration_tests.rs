//! Integration tests: rule store, ingestion and classification end to end,
//! plus bulk-matcher equivalence with the linear scan.

use std::collections::HashMap;
use std::sync::Arc;

use proptest::prelude::*;

use logtriage_engine::{
    ArraySource, BulkRuleMatcher, Database, EngineConfig, LogFieldMatcher, LogRecord, LogRule,
    MatchOp, RuleChange, Verdict, match_rule, split_spam,
};

fn record(ts: i64, stream: &[(&str, &str)], raw: &str) -> LogRecord {
    let stream: HashMap<String, String> = stream
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    LogRecord::new(ts, stream, raw)
}

fn config(dir: &tempfile::TempDir) -> EngineConfig {
    EngineConfig {
        database_path: dir.path().join("db.json"),
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn classify_then_split_spam() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = ArraySource::new(
        vec![
            record(1, &[("source", "cron"), ("host", "a")], r#"{"message":"job ok","pid":1}"#),
            record(2, &[("source", "sshd"), ("host", "a")], "Accepted publickey"),
            record(3, &[("source", "cron"), ("host", "b")], r#"{"message":"job ok","pid":2}"#),
        ],
        10,
    );
    let db = Database::open(&config(&dir), Some(source)).await.expect("open");

    let logs = db.logs().await.expect("logs");
    assert_eq!(logs.len(), 3);
    let cron = logs
        .iter()
        .find(|l| l.timestamp() == 1)
        .expect("cron log")
        .hash();
    db.classify_by_hash(cron, false).await.expect("classify");

    let rules = db.rules().await;
    let (ham, spam) = split_spam(&logs, &rules);
    assert_eq!(ham.len(), 1);
    assert_eq!(ham[0].message(), "Accepted publickey");
    // the host label is ignored, so both cron lines are spam
    assert_eq!(spam.len(), 2);
    assert_eq!(rules.verdict(&ham[0]), Verdict::Unknown);
}

#[tokio::test]
async fn edits_survive_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let db: Database<ArraySource> = Database::open(&config(&dir), None).await.expect("open");
        let id = db
            .add(LogRule::new(false, vec![LogFieldMatcher::equal("source", "cron")]))
            .await
            .expect("add");
        let mut rule = db.rules().await.get(id).expect("rule").as_ref().clone();
        rule.disabled = true;
        assert_eq!(
            db.add_or_update(rule).await.expect("update"),
            RuleChange::Updated { id, version: 1 }
        );
    }

    let db: Database<ArraySource> = Database::open(&config(&dir), None).await.expect("reopen");
    let rules = db.rules().await;
    assert_eq!(rules.version(), 2);
    assert!(rules.get(1).expect("rule").disabled);
    assert_eq!(
        rules.verdict(&record(0, &[("source", "cron")], "x")),
        Verdict::Unknown
    );
}

#[test]
fn first_match_priority_depends_on_order() {
    let log = record(0, &[("source", "cron")], "job done");
    let a = Arc::new(LogRule::new(true, vec![LogFieldMatcher::equal("source", "cron")]));
    let b = Arc::new(LogRule::new(false, vec![LogFieldMatcher::regex("message", "job .*")]));

    let ab = vec![Arc::clone(&a), Arc::clone(&b)];
    let ba = vec![b, a];
    assert_eq!(
        Verdict::of(match_rule(&log, &ab).map(|r| r.as_ref())),
        Verdict::Ham
    );
    assert_eq!(
        Verdict::of(match_rule(&log, &ba).map(|r| r.as_ref())),
        Verdict::Spam
    );
    assert_eq!(
        Verdict::of(BulkRuleMatcher::new(&ba).match_log(&log).map(|r| r.as_ref())),
        Verdict::Spam
    );
}

// --- bulk matcher equivalence ---

const FIELDS: &[&str] = &["source", "host", "service", "message", ""];
const VALUES: &[&str] = &["a", "b", "c", ""];

fn matcher_strategy() -> impl Strategy<Value = LogFieldMatcher> {
    (
        prop::sample::select(FIELDS),
        prop_oneof![
            4 => Just(MatchOp::Equal),
            2 => Just(MatchOp::Regex),
            1 => Just(MatchOp::Unsupported),
        ],
        prop::sample::select(VALUES),
    )
        .prop_map(|(field, op, value)| {
            let value = if op == MatchOp::Regex && !value.is_empty() {
                format!("{value}.*")
            } else {
                value.to_owned()
            };
            LogFieldMatcher::new(field, op, value)
        })
}

fn rules_strategy() -> impl Strategy<Value = Vec<Arc<LogRule>>> {
    prop::collection::vec(
        (
            prop::collection::vec(matcher_strategy(), 0..4),
            any::<bool>(),
            prop::bool::weighted(0.1),
        ),
        0..24,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (matchers, ham, disabled))| {
                let mut rule = LogRule::new(ham, matchers);
                rule.id = i as u64 + 1;
                rule.disabled = disabled;
                Arc::new(rule)
            })
            .collect()
    })
}

fn log_strategy() -> impl Strategy<Value = LogRecord> {
    (
        prop::collection::hash_map(
            prop::sample::select(&["source", "host", "service"][..]),
            prop::sample::select(VALUES),
            0..3,
        ),
        prop::sample::select(VALUES),
        any::<bool>(),
        prop::option::of(prop::sample::select(VALUES)),
    )
        .prop_map(|(stream, message, as_json, service)| {
            let stream: HashMap<String, String> = stream
                .into_iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            let raw = if as_json {
                let mut object = serde_json::Map::new();
                object.insert("message".to_owned(), message.into());
                if let Some(service) = service {
                    object.insert("service".to_owned(), service.into());
                }
                serde_json::Value::Object(object).to_string()
            } else {
                message.to_owned()
            };
            LogRecord::new(0, stream, raw)
        })
}

proptest! {
    #[test]
    fn bulk_matcher_agrees_with_linear_scan(
        rules in rules_strategy(),
        logs in prop::collection::vec(log_strategy(), 1..8),
    ) {
        let bulk = BulkRuleMatcher::new(&rules);
        for log in &logs {
            let linear = match_rule(log, &rules).map(|r| r.id);
            let fast = bulk.match_log(log).map(|r| r.id);
            prop_assert_eq!(linear, fast);
        }
    }

    #[test]
    fn bulk_matcher_counts_every_enabled_rule(rules in rules_strategy()) {
        let bulk = BulkRuleMatcher::new(&rules);
        let enabled = rules.iter().filter(|r| !r.disabled).count();
        prop_assert_eq!(bulk.fast_rules() + bulk.slow_rules(), enabled);
    }
}
