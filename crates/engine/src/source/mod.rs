//! Log sources
//!
//! A [`LogSource`] delivers batches of new log records, newest first. The
//! ingestion buffer owns the watermark and passes it in; a source may still
//! return records at or before it, and the buffer trims those.
//!
//! - [`loki::LokiSource`]: Loki `query_range` over HTTP
//! - [`array::ArraySource`]: fixed in-memory records replayed in chunks

pub mod array;
pub mod loki;

use std::future::Future;
use std::sync::Arc;

use crate::error::EngineError;
use crate::record::LogRecord;

pub use array::ArraySource;
pub use loki::LokiSource;

/// Pull-based supplier of log records.
///
/// # Errors
///
/// Fetch failures are reported as [`EngineError::SourceUnavailable`].
pub trait LogSource: Send + 'static {
    /// Short kind name used in logs and metric labels.
    fn source_type(&self) -> &'static str;

    /// Fetches records newer than `after` (microseconds), newest first.
    fn fetch(
        &mut self,
        after: Option<i64>,
    ) -> impl Future<Output = Result<Vec<Arc<LogRecord>>, EngineError>> + Send;
}
