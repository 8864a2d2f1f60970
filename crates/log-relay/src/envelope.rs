//! Invocation envelope decoding.
//!
//! The invoking platform delivers log events as base64-encoded, gzip
//! compressed JSON, either bare or wrapped as `{"awslogs": {"data": "..."}}`.
//! Each event's `message` is itself a JSON log record.

use std::io::Read;

use base64::{engine::general_purpose, Engine as _};
use flate2::read::GzDecoder;
use serde::Deserialize;
use stacktrace::LogRecord;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("invocation is not valid JSON: {0}")]
    Invocation(#[source] serde_json::Error),

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload could not be decompressed: {0}")]
    Gzip(#[from] std::io::Error),

    #[error("decompressed payload is not a log batch: {0}")]
    Batch(#[source] serde_json::Error),

    #[error("log event {id} is not a valid record: {source}")]
    Record {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct Invocation {
    awslogs: CompressedData,
}

#[derive(Debug, Deserialize)]
struct CompressedData {
    data: String,
}

/// Decompressed batch of log events.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogBatch {
    #[serde(default)]
    pub log_group: Option<String>,
    #[serde(default)]
    pub log_stream: Option<String>,
    pub log_events: Vec<LogEvent>,
}

/// One wrapped event; `message` holds the record JSON.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEvent {
    pub id: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub message: String,
}

/// Decode an invocation payload into a batch.
pub fn decode(input: &str) -> Result<LogBatch, EnvelopeError> {
    let input = input.trim();

    let data = if input.starts_with('{') {
        let invocation: Invocation =
            serde_json::from_str(input).map_err(EnvelopeError::Invocation)?;
        invocation.awslogs.data
    } else {
        input.to_string()
    };

    let compressed = general_purpose::STANDARD.decode(data.trim())?;

    let mut json = String::new();
    GzDecoder::new(compressed.as_slice()).read_to_string(&mut json)?;

    let batch: LogBatch = serde_json::from_str(&json).map_err(EnvelopeError::Batch)?;

    debug!(
        log_group = batch.log_group.as_deref().unwrap_or_default(),
        log_stream = batch.log_stream.as_deref().unwrap_or_default(),
        events = batch.log_events.len(),
        "Decoded log batch"
    );

    Ok(batch)
}

/// Parse every event of a batch; one malformed record fails the whole batch.
pub fn parse_records(batch: &LogBatch) -> Result<Vec<LogRecord>, EnvelopeError> {
    batch
        .log_events
        .iter()
        .map(|event| {
            let mut record: LogRecord =
                serde_json::from_str(&event.message).map_err(|source| EnvelopeError::Record {
                    id: event.id.clone(),
                    source,
                })?;
            record.record_id.clone_from(&event.id);
            Ok(record)
        })
        .collect()
}

/// Encode a batch the way the invoking platform does.
pub fn encode(batch_json: &str) -> Result<String, std::io::Error> {
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(batch_json.as_bytes())?;
    Ok(general_purpose::STANDARD.encode(encoder.finish()?))
}
