//! Loki `query_range` source
//!
//! ```text
//! GET {server}/loki/api/v1/query_range?query={selector}&limit={limit}[&start={ns}]
//! ```
//!
//! Only `status == "success"` with `resultType == "streams"` is accepted.
//! Loki timestamps are nanosecond strings; records carry microseconds.

use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::LogSource;
use crate::config::LokiConfig;
use crate::error::EngineError;
use crate::record::LogRecord;

const SOURCE_TYPE: &str = "loki";
const QUERY_RANGE_PATH: &str = "/loki/api/v1/query_range";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    status: String,
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(rename = "resultType")]
    result_type: String,
    #[serde(default)]
    result: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
struct StreamResult {
    #[serde(default)]
    stream: HashMap<String, String>,
    /// `[timestamp_ns, line, ...]`
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// HTTP client for one Loki server and selector.
pub struct LokiSource {
    client: Client,
    url: String,
    selector: String,
    limit: usize,
}

impl LokiSource {
    pub fn new(config: &LokiConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(unavailable)?;
        Ok(Self {
            client,
            url: format!("{}{QUERY_RANGE_PATH}", config.server.trim_end_matches('/')),
            selector: config.selector.clone(),
            limit: config.limit,
        })
    }

    fn query_params(&self, after: Option<i64>) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query", self.selector.clone()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(watermark) = after {
            let start_ns = watermark.saturating_add(1).saturating_mul(1000);
            params.push(("start", start_ns.to_string()));
        }
        params
    }
}

impl LogSource for LokiSource {
    fn source_type(&self) -> &'static str {
        SOURCE_TYPE
    }

    async fn fetch(&mut self, after: Option<i64>) -> Result<Vec<Arc<LogRecord>>, EngineError> {
        let response = self
            .client
            .get(&self.url)
            .query(&self.query_params(after))
            .send()
            .await
            .map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP status {status}")));
        }

        let body = response.bytes().await.map_err(unavailable)?;
        let records = parse_query_response(&body)?;
        tracing::debug!(count = records.len(), after, "fetched logs from loki");
        Ok(records)
    }
}

/// Decodes a `query_range` response body into records, newest first.
pub fn parse_query_response(body: &[u8]) -> Result<Vec<Arc<LogRecord>>, EngineError> {
    let response: QueryResponse = serde_json::from_slice(body)
        .map_err(|e| unavailable(format!("malformed response: {e}")))?;

    if response.status != "success" {
        return Err(unavailable(format!("query status {}", response.status)));
    }
    let data = response
        .data
        .ok_or_else(|| unavailable("response without data"))?;
    if data.result_type != "streams" {
        return Err(unavailable(format!("result type {}", data.result_type)));
    }

    let mut records = Vec::new();
    for stream in data.result {
        for value in &stream.values {
            let (Some(Value::String(ts)), Some(Value::String(line))) = (value.first(), value.get(1))
            else {
                return Err(unavailable("malformed stream value"));
            };
            let ts_ns: i64 = ts
                .parse()
                .map_err(|e| unavailable(format!("invalid timestamp {ts:?}: {e}")))?;
            records.push(Arc::new(LogRecord::new(
                ts_ns / 1000,
                stream.stream.clone(),
                line.as_str(),
            )));
        }
    }

    // Loki groups by stream first; callers want one newest-first list.
    records.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
    Ok(records)
}

fn unavailable(reason: impl ToString) -> EngineError {
    EngineError::SourceUnavailable {
        source_type: SOURCE_TYPE.to_owned(),
        reason: reason.to_string(),
    }
}
