//! In-memory replay source
//!
//! Holds records in chronological order and hands them out `chunk` at a
//! time, each batch newest first. Once exhausted every fetch returns an empty
//! batch.

use std::sync::Arc;

use super::LogSource;
use crate::error::EngineError;
use crate::record::LogRecord;

pub struct ArraySource {
    records: Vec<Arc<LogRecord>>,
    chunk: usize,
    offset: usize,
}

impl ArraySource {
    /// `records` oldest first; a `chunk` of 0 is treated as 1.
    pub fn new(records: Vec<LogRecord>, chunk: usize) -> Self {
        Self {
            records: records.into_iter().map(Arc::new).collect(),
            chunk: chunk.max(1),
            offset: 0,
        }
    }

    /// Records not handed out yet.
    pub fn remaining(&self) -> usize {
        self.records.len() - self.offset
    }
}

impl LogSource for ArraySource {
    fn source_type(&self) -> &'static str {
        "array"
    }

    async fn fetch(&mut self, _after: Option<i64>) -> Result<Vec<Arc<LogRecord>>, EngineError> {
        let end = (self.offset + self.chunk).min(self.records.len());
        let mut batch = self.records[self.offset..end].to_vec();
        batch.reverse();
        self.offset = end;
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn records(n: i64) -> Vec<LogRecord> {
        (1..=n)
            .map(|ts| LogRecord::new(ts, HashMap::new(), format!("line {ts}")))
            .collect()
    }

    #[tokio::test]
    async fn replays_in_chunks_newest_first() {
        let mut source = ArraySource::new(records(5), 2);

        let batch = source.fetch(None).await.expect("fetch");
        assert_eq!(batch.iter().map(|r| r.timestamp()).collect::<Vec<_>>(), [2, 1]);
        let batch = source.fetch(Some(2)).await.expect("fetch");
        assert_eq!(batch.iter().map(|r| r.timestamp()).collect::<Vec<_>>(), [4, 3]);
        let batch = source.fetch(Some(4)).await.expect("fetch");
        assert_eq!(batch.iter().map(|r| r.timestamp()).collect::<Vec<_>>(), [5]);
        assert_eq!(source.remaining(), 0);
    }

    #[tokio::test]
    async fn exhausted_source_returns_empty_batches() {
        let mut source = ArraySource::new(records(1), 4);
        assert_eq!(source.fetch(None).await.expect("fetch").len(), 1);
        assert!(source.fetch(Some(1)).await.expect("fetch").is_empty());
        assert!(source.fetch(Some(1)).await.expect("fetch").is_empty());
    }

    #[tokio::test]
    async fn zero_chunk_is_one() {
        let mut source = ArraySource::new(records(2), 0);
        assert_eq!(source.fetch(None).await.expect("fetch").len(), 1);
    }
}
