//! Ingestion buffer
//!
//! [`LogBuffer`] keeps every ingested record, newest first, and tracks the
//! timestamp watermark of the newest one. Each [`poll`](LogBuffer::poll)
//! asks the source for records after the watermark, drops anything at or
//! before it, and prepends the rest.
//!
//! # Failure policy
//! A failed poll leaves the buffer untouched and starts a cooldown; polls
//! inside the cooldown fail with [`EngineError::RetryCooldown`] without
//! contacting the source.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use logtriage_core::metrics as m;
use tokio::time::Instant;

use crate::error::EngineError;
use crate::record::LogRecord;
use crate::source::LogSource;

pub struct LogBuffer {
    /// Newest first
    records: VecDeque<Arc<LogRecord>>,
    /// Timestamp of the newest record seen
    watermark: Option<i64>,
    retry_cooldown: Duration,
    last_failure: Option<Instant>,
    polled: bool,
    total_received: u64,
}

impl LogBuffer {
    pub fn new(retry_cooldown: Duration) -> Self {
        Self {
            records: VecDeque::new(),
            watermark: None,
            retry_cooldown,
            last_failure: None,
            polled: false,
            total_received: 0,
        }
    }

    /// Fetches new records from `source` and prepends them.
    ///
    /// Returns only the newly added records, newest first.
    pub async fn poll<S: LogSource>(
        &mut self,
        source: &mut S,
    ) -> Result<Vec<Arc<LogRecord>>, EngineError> {
        if let Some(failed_at) = self.last_failure {
            let elapsed = failed_at.elapsed();
            if elapsed < self.retry_cooldown {
                let remaining = self.retry_cooldown - elapsed;
                return Err(EngineError::RetryCooldown {
                    remaining_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }

        let mut fresh = match source.fetch(self.watermark).await {
            Ok(fresh) => fresh,
            Err(e) => {
                self.last_failure = Some(Instant::now());
                metrics::counter!(m::SOURCE_ERRORS_TOTAL, m::LABEL_SOURCE => source.source_type())
                    .increment(1);
                tracing::warn!(
                    source = source.source_type(),
                    error = %e,
                    cooldown_ms = u64::try_from(self.retry_cooldown.as_millis()).unwrap_or(u64::MAX),
                    "log source poll failed"
                );
                return Err(e);
            }
        };
        self.last_failure = None;
        self.polled = true;

        if let Some(watermark) = self.watermark {
            if let Some(cut) = fresh.iter().position(|r| r.timestamp() <= watermark) {
                fresh.truncate(cut);
            }
        }
        if let Some(newest) = fresh.first() {
            self.watermark = Some(newest.timestamp());
        }

        for record in fresh.iter().rev() {
            self.records.push_front(Arc::clone(record));
        }
        self.total_received += fresh.len() as u64;

        metrics::counter!(m::LOGS_INGESTED_TOTAL).increment(fresh.len() as u64);
        metrics::gauge!(m::BUFFER_SIZE).set(self.records.len() as f64);
        if !fresh.is_empty() {
            tracing::debug!(
                count = fresh.len(),
                watermark = self.watermark,
                buffered = self.records.len(),
                "ingested logs"
            );
        }
        Ok(fresh)
    }

    /// All buffered records, newest first.
    pub fn snapshot(&self) -> Vec<Arc<LogRecord>> {
        self.records.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<LogRecord>> + '_ {
        self.records.iter()
    }

    pub fn find_by_hash(&self, hash: u64) -> Option<&Arc<LogRecord>> {
        self.records.iter().find(|r| r.hash() == hash)
    }

    pub fn watermark(&self) -> Option<i64> {
        self.watermark
    }

    /// Whether at least one poll has succeeded.
    pub fn has_polled(&self) -> bool {
        self.polled
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn total_received(&self) -> u64 {
        self.total_received
    }
}
