//! Rule store
//!
//! [`Database`] owns the ruleset snapshot, the ingestion buffer, the per-rule
//! hit counts and the rule ID counter. Every public operation holds one
//! `tokio::sync::Mutex` for its whole duration, including the source fetch.
//!
//! # Durability
//! A mutation builds the next snapshot, writes it to `<path>.tmp`, fsyncs
//! and renames it over `<path>`. Only then is the snapshot installed in
//! memory; a failed write leaves memory and disk at the previous version.
//!
//! # Hit counts
//! Counts are cached per ruleset version. New records from a refresh are
//! added to a cache of the current version; any other cache is dropped and
//! rebuilt from the whole buffer on the next read.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use logtriage_core::metrics as m;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::buffer::LogBuffer;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::record::{LogRecord, MESSAGE_FIELD};
use crate::rule::{LogFieldMatcher, LogRule};
use crate::ruleset::LogRules;
use crate::source::LogSource;
use crate::summary::{SourceSummary, rule_source_summary};

/// Outcome of [`Database::add_or_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleChange {
    /// No rule had this ID; stored as a new rule
    Added { id: u64 },
    /// Replaced in place
    Updated { id: u64, version: u64 },
    /// The caller's version was out of date; nothing changed
    Stale { id: u64, current_version: u64 },
}

// On-disk shape: {"LogRules": {"Rules": [...], "Version": n}}

#[derive(Serialize)]
struct DatabaseFileRef<'a> {
    #[serde(rename = "LogRules")]
    log_rules: RulesFileRef<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RulesFileRef<'a> {
    rules: Vec<&'a LogRule>,
    version: u64,
}

#[derive(Default, Deserialize)]
struct DatabaseFile {
    #[serde(rename = "LogRules", default)]
    log_rules: RulesFile,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RulesFile {
    rules: Vec<LogRule>,
    version: u64,
}

struct HitCounts {
    /// Generation of the snapshot the counts were taken against
    generation: u64,
    counts: HashMap<u64, usize>,
}

struct State<S> {
    rules: Arc<LogRules>,
    /// Lazily seeded from the loaded rules, then only moves forward
    next_id: Option<u64>,
    buffer: LogBuffer,
    source: Option<S>,
    hit_counts: Option<HitCounts>,
}

/// Durable, lock-protected rule store.
pub struct Database<S> {
    path: PathBuf,
    ignored_stream_keys: HashSet<String>,
    state: Mutex<State<S>>,
}

impl<S: LogSource> Database<S> {
    /// Creates an empty store; nothing is read from disk.
    pub fn new(config: &EngineConfig, source: Option<S>) -> Self {
        Self {
            path: config.database_path.clone(),
            ignored_stream_keys: config.ignored_stream_keys.iter().cloned().collect(),
            state: Mutex::new(State {
                rules: Arc::new(LogRules::empty()),
                next_id: None,
                buffer: LogBuffer::new(config.retry_cooldown),
                source,
                hit_counts: None,
            }),
        }
    }

    /// Creates a store and loads its file; a missing file means an empty ruleset.
    pub async fn open(config: &EngineConfig, source: Option<S>) -> Result<Self, EngineError> {
        let db = Self::new(config, source);
        match tokio::fs::try_exists(&db.path).await {
            Ok(true) => db.load().await?,
            Ok(false) => {
                tracing::info!(path = %db.path.display(), "no database file yet, starting empty");
            }
            Err(e) => return Err(EngineError::persistence(&db.path, e)),
        }
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the in-memory ruleset with the file's contents.
    pub async fn load(&self) -> Result<(), EngineError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| EngineError::persistence(&self.path, e))?;
        let file: DatabaseFile = serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::persistence(&self.path, e))?;

        let rules = LogRules::new(file.log_rules.rules, file.log_rules.version);
        tracing::info!(
            path = %self.path.display(),
            rules = rules.len(),
            version = rules.version(),
            "database loaded"
        );
        record_ruleset_gauges(&rules);

        let mut state = self.state.lock().await;
        state.rules = Arc::new(rules);
        state.next_id = None;
        state.hit_counts = None;
        Ok(())
    }

    /// Writes the current ruleset to disk as is.
    pub async fn save(&self) -> Result<(), EngineError> {
        let state = self.state.lock().await;
        self.persist(&state.rules).await
    }

    /// Current ruleset snapshot.
    pub async fn rules(&self) -> Arc<LogRules> {
        Arc::clone(&self.state.lock().await.rules)
    }

    /// Stores `rule` under the next free ID and returns that ID.
    pub async fn add(&self, rule: LogRule) -> Result<u64, EngineError> {
        let mut state = self.state.lock().await;
        self.add_locked(&mut state, rule, "add").await
    }

    /// Replaces the rule with the same ID when `rule.version` is current.
    ///
    /// An unknown ID is added as a new rule. A stale version changes nothing
    /// and reports [`RuleChange::Stale`].
    pub async fn add_or_update(&self, rule: LogRule) -> Result<RuleChange, EngineError> {
        let mut state = self.state.lock().await;

        let Some(index) = state.rules.position(rule.id) else {
            let id = self.add_locked(&mut state, rule, "add").await?;
            return Ok(RuleChange::Added { id });
        };

        let current_version = state.rules.rules()[index].version;
        if current_version != rule.version {
            tracing::warn!(
                rule_id = rule.id,
                current_version,
                given_version = rule.version,
                "stale rule update ignored"
            );
            return Ok(RuleChange::Stale {
                id: rule.id,
                current_version,
            });
        }

        let id = rule.id;
        let version = rule.version.saturating_add(1);
        let mut rules = state.rules.rules().to_vec();
        rules[index] = Arc::new(LogRule { version, ..rule });
        self.commit(&mut state, rules, None, "update").await?;
        tracing::info!(rule_id = id, version, "rule updated");
        Ok(RuleChange::Updated { id, version })
    }

    pub async fn delete(&self, id: u64) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        let index = state
            .rules
            .position(id)
            .ok_or(EngineError::RuleNotFound { id })?;

        let mut rules = state.rules.rules().to_vec();
        rules.remove(index);
        self.commit(&mut state, rules, None, "delete").await?;
        tracing::info!(rule_id = id, "rule deleted");
        Ok(())
    }

    /// Turns a buffered log into a rule matching its message and its
    /// non-ignored stream labels, and stores it.
    pub async fn classify_by_hash(&self, hash: u64, ham: bool) -> Result<u64, EngineError> {
        let mut state = self.state.lock().await;
        let log = state
            .buffer
            .find_by_hash(hash)
            .cloned()
            .ok_or(EngineError::HashNotFound { hash })?;

        let rule = self.rule_for(&log, ham);
        let id = self.add_locked(&mut state, rule, "classify").await?;
        tracing::info!(rule_id = id, hash, ham, "log classified");
        Ok(id)
    }

    /// Refreshes from the source and returns the whole buffer, newest first.
    ///
    /// On a refresh failure the buffer is unchanged; [`buffered_logs`](Self::buffered_logs)
    /// still returns it.
    pub async fn logs(&self) -> Result<Vec<Arc<LogRecord>>, EngineError> {
        let mut state = self.state.lock().await;
        state.refresh().await?;
        Ok(state.buffer.snapshot())
    }

    /// Buffered records without contacting the source.
    pub async fn buffered_logs(&self) -> Vec<Arc<LogRecord>> {
        self.state.lock().await.buffer.snapshot()
    }

    /// Buffer length without contacting the source; `None` until a poll has
    /// succeeded.
    pub async fn buffered_log_count(&self) -> Option<usize> {
        let state = self.state.lock().await;
        state.buffer.has_polled().then(|| state.buffer.len())
    }

    /// Buffer length after a refresh, `-1` when the refresh failed.
    pub async fn log_count(&self) -> i64 {
        let mut state = self.state.lock().await;
        match state.refresh().await {
            Ok(()) => i64::try_from(state.buffer.len()).unwrap_or(i64::MAX),
            Err(_) => -1,
        }
    }

    /// Buffered records matched by rule `id`.
    ///
    /// Polls the source only if it has never been polled; `-1` when that
    /// poll fails.
    pub async fn rule_hit_count(&self, id: u64) -> i64 {
        let mut state = self.state.lock().await;
        if !state.buffer.has_polled() && state.refresh().await.is_err() {
            return -1;
        }
        let count = state.hit_counts().get(&id).copied().unwrap_or(0);
        i64::try_from(count).unwrap_or(i64::MAX)
    }

    /// Rule counts and hits grouped by source matcher.
    pub async fn source_summary(&self, top_k: usize) -> Vec<SourceSummary> {
        let mut state = self.state.lock().await;
        if !state.buffer.has_polled() {
            if let Err(e) = state.refresh().await {
                tracing::debug!(error = %e, "summary computed without fresh logs");
            }
        }
        let rules = Arc::clone(&state.rules);
        rule_source_summary(rules.rules(), state.hit_counts(), top_k)
    }

    fn rule_for(&self, log: &LogRecord, ham: bool) -> LogRule {
        // A `message` stream label shadows the message text during matching.
        let message = log.resolve_field(MESSAGE_FIELD).unwrap_or(log.message());
        let mut matchers = vec![LogFieldMatcher::equal(MESSAGE_FIELD, message)];
        matchers.extend(
            log.stream_labels()
                .filter(|(key, _)| *key != MESSAGE_FIELD && !self.ignored_stream_keys.contains(*key))
                .map(|(key, value)| LogFieldMatcher::equal(key, value)),
        );
        LogRule::new(ham, matchers)
    }

    async fn add_locked(
        &self,
        state: &mut State<S>,
        mut rule: LogRule,
        action: &'static str,
    ) -> Result<u64, EngineError> {
        let id = state
            .next_id
            .unwrap_or_else(|| state.rules.max_id().saturating_add(1));
        rule.id = id;

        let mut rules = state.rules.rules().to_vec();
        rules.push(Arc::new(rule));
        self.commit(state, rules, Some(id.saturating_add(1)), action).await?;
        tracing::info!(rule_id = id, action, "rule added");
        Ok(id)
    }

    /// Persists the next snapshot, then installs it.
    async fn commit(
        &self,
        state: &mut State<S>,
        rules: Vec<Arc<LogRule>>,
        next_id: Option<u64>,
        action: &'static str,
    ) -> Result<(), EngineError> {
        let next = LogRules::from_shared(rules, state.rules.version().saturating_add(1));
        if let Err(e) = self.persist(&next).await {
            metrics::counter!(m::PERSIST_FAILURES_TOTAL).increment(1);
            tracing::warn!(
                path = %self.path.display(),
                action,
                error = %e,
                "ruleset write failed, keeping previous version"
            );
            return Err(e);
        }

        record_ruleset_gauges(&next);
        metrics::counter!(m::RULE_MUTATIONS_TOTAL, m::LABEL_ACTION => action).increment(1);
        state.rules = Arc::new(next);
        state.hit_counts = None;
        if next_id.is_some() {
            state.next_id = next_id;
        }
        Ok(())
    }

    async fn persist(&self, rules: &LogRules) -> Result<(), EngineError> {
        let file = DatabaseFileRef {
            log_rules: RulesFileRef {
                rules: rules.rules().iter().map(|r| r.as_ref()).collect(),
                version: rules.version(),
            },
        };
        let mut json = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut json, formatter);
        file.serialize(&mut serializer)
            .map_err(|e| EngineError::persistence(&self.path, e))?;

        let temp = temp_path(&self.path);
        let written = match write_synced(&temp, &json).await {
            Ok(()) => tokio::fs::rename(&temp, &self.path)
                .await
                .map_err(|e| EngineError::persistence(&self.path, e)),
            Err(e) => Err(EngineError::persistence(&temp, e)),
        };
        if let Err(e) = written {
            remove_temp(&temp).await;
            return Err(e);
        }

        tracing::info!(
            path = %self.path.display(),
            rules = rules.len(),
            version = rules.version(),
            "database saved"
        );
        Ok(())
    }
}

impl<S: LogSource> State<S> {
    /// Polls the source and counts the new records.
    async fn refresh(&mut self) -> Result<(), EngineError> {
        let source = self.source.as_mut().ok_or(EngineError::SourceMissing)?;
        let fresh = self.buffer.poll(source).await?;

        let generation = self.rules.generation();
        if self
            .hit_counts
            .as_ref()
            .is_some_and(|cache| cache.generation != generation)
        {
            self.hit_counts = None;
        }
        if let Some(cache) = self.hit_counts.as_mut() {
            count_into(&mut cache.counts, &self.rules, &fresh);
        }
        Ok(())
    }

    /// Hit counts for the current ruleset, rebuilt when missing or outdated.
    fn hit_counts(&mut self) -> &HashMap<u64, usize> {
        let generation = self.rules.generation();
        if self
            .hit_counts
            .as_ref()
            .is_some_and(|cache| cache.generation != generation)
        {
            self.hit_counts = None;
        }

        let rules = &self.rules;
        let buffer = &self.buffer;
        let cache = self.hit_counts.get_or_insert_with(|| {
            let mut counts: HashMap<u64, usize> = rules.rules().iter().map(|r| (r.id, 0)).collect();
            let logs = buffer.snapshot();
            count_into(&mut counts, rules, &logs);
            HitCounts {
                generation,
                counts,
            }
        });
        &cache.counts
    }
}

fn count_into(counts: &mut HashMap<u64, usize>, rules: &LogRules, logs: &[Arc<LogRecord>]) {
    for log in logs {
        if let Some(rule) = rules.match_log(log) {
            *counts.entry(rule.id).or_default() += 1;
        }
    }
}

fn record_ruleset_gauges(rules: &LogRules) {
    metrics::gauge!(m::RULES_LOADED).set(rules.len() as f64);
    metrics::gauge!(m::RULESET_VERSION).set(rules.version() as f64);
}

fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    PathBuf::from(temp)
}

/// Best-effort cleanup after a failed write.
async fn remove_temp(temp: &Path) {
    match tokio::fs::remove_file(temp).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %temp.display(), error = %e, "failed to remove temp file");
        }
    }
}

async fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(contents).await?;
    file.sync_all().await
}
