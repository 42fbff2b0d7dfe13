//! Log record model
//!
//! A [`LogRecord`] is one log line as delivered by a [`LogSource`](crate::source::LogSource):
//! a microsecond timestamp, stream labels and the raw payload. When the
//! payload is a JSON object carrying a string `message`, that message becomes
//! the display text and the remaining keys become structured fields.
//!
//! Records are immutable after construction and shared as `Arc<LogRecord>`.
//! The content hash and the matched-rule memo are filled in lazily.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::rule::LogRule;

/// Field name that falls back to the record's message text.
pub const MESSAGE_FIELD: &str = "message";

/// One ingested log line.
pub struct LogRecord {
    /// Emission time, microseconds since the Unix epoch
    timestamp: i64,
    stream: HashMap<String, String>,
    /// Keys of `stream`, sorted once at construction
    stream_keys: Vec<String>,
    /// Extra JSON keys, minus `message` and any stream label
    fields: Map<String, Value>,
    message: String,
    raw: String,
    hash: OnceLock<u64>,
    verdict_memo: Mutex<Option<VerdictMemo>>,
}

/// Matched rule cached against one ruleset snapshot.
struct VerdictMemo {
    generation: u64,
    rule: Option<Arc<LogRule>>,
}

impl LogRecord {
    /// Builds a record, extracting `message` and structured fields from a
    /// JSON object payload.
    ///
    /// Anything else (invalid JSON, a non-object, a missing or non-string
    /// `message`) keeps the raw payload as the message and no fields.
    pub fn new(timestamp: i64, stream: HashMap<String, String>, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mut stream_keys: Vec<String> = stream.keys().cloned().collect();
        stream_keys.sort_unstable();

        let (message, fields) = match serde_json::from_str::<Map<String, Value>>(&raw) {
            Ok(mut object) => match object.remove(MESSAGE_FIELD) {
                Some(Value::String(message)) => {
                    object.retain(|key, _| !stream.contains_key(key));
                    (message, object)
                }
                _ => (raw.clone(), Map::new()),
            },
            Err(_) => (raw.clone(), Map::new()),
        };

        Self {
            timestamp,
            stream,
            stream_keys,
            fields,
            message,
            raw,
            hash: OnceLock::new(),
            verdict_memo: Mutex::new(None),
        }
    }

    /// Emission time in microseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Emission time, `None` when out of chrono's range.
    pub fn time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.timestamp)
    }

    pub fn stream(&self) -> &HashMap<String, String> {
        &self.stream
    }

    /// Stream label keys in lexicographic order.
    pub fn stream_keys(&self) -> &[String] {
        &self.stream_keys
    }

    /// Stream labels in key order.
    pub fn stream_labels(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.stream_keys.iter().filter_map(|key| {
            self.stream
                .get(key)
                .map(|value| (key.as_str(), value.as_str()))
        })
    }

    /// Structured fields extracted from a JSON payload.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// xxh64 of the raw payload; computed on first use.
    pub fn hash(&self) -> u64 {
        *self
            .hash
            .get_or_init(|| xxhash_rust::xxh64::xxh64(self.raw.as_bytes(), 0))
    }

    /// Stable external identifier, `log-<hash>`.
    pub fn id_string(&self) -> String {
        format!("log-{}", self.hash())
    }

    /// `key=value` pairs in key order, comma separated.
    pub fn stream_string(&self) -> String {
        self.stream_labels()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Resolves a matcher field against this record.
    ///
    /// Order: stream label, string-typed structured field, then the message
    /// text when `field` is `message`.
    pub fn resolve_field(&self, field: &str) -> Option<&str> {
        if let Some(value) = self.stream.get(field) {
            return Some(value.as_str());
        }
        if let Some(Value::String(value)) = self.fields.get(field) {
            return Some(value.as_str());
        }
        (field == MESSAGE_FIELD).then_some(self.message.as_str())
    }

    /// Case-sensitive substring search over the raw payload.
    pub fn matches_filter_text(&self, needle: &str) -> bool {
        self.raw.contains(needle)
    }

    /// Returns the rule memoized for the snapshot `generation`, computing and
    /// storing it with `compute` on a miss.
    pub(crate) fn memoized_rule(
        &self,
        generation: u64,
        compute: impl FnOnce() -> Option<Arc<LogRule>>,
    ) -> Option<Arc<LogRule>> {
        let mut memo = self
            .verdict_memo
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = memo.as_ref() {
            if cached.generation == generation {
                return cached.rule.clone();
            }
        }
        let rule = compute();
        *memo = Some(VerdictMemo {
            generation,
            rule: rule.clone(),
        });
        rule
    }
}

impl fmt::Debug for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogRecord")
            .field("timestamp", &self.timestamp)
            .field("stream", &self.stream_string())
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}
