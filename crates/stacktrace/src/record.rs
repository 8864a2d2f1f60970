//! Structured log records as emitted by the monitored application.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Severity derived from the record's level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Warn,
    Error,
    Other,
}

impl Level {
    /// Parse a logback/log4j level name.
    pub fn parse(level: &str) -> Self {
        match level.trim().to_ascii_uppercase().as_str() {
            "WARN" | "WARNING" => Self::Warn,
            "ERROR" => Self::Error,
            _ => Self::Other,
        }
    }
}

/// One parsed log record.
///
/// Accepts both the camelCase field names and the names written by the
/// logstash/logback JSON encoder.
#[derive(Debug, Clone, Deserialize)]
pub struct LogRecord {
    #[serde(rename = "@timestamp", alias = "timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Missing levels fall back to the default (warning) presentation
    #[serde(alias = "severity", default)]
    pub level: Option<String>,

    #[serde(rename = "applicationName", alias = "app_name", default)]
    pub application_name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    /// Fully-qualified class name of the logger
    #[serde(
        rename = "service",
        alias = "serviceIdentifier",
        alias = "logger_name",
        default
    )]
    pub service: Option<String>,

    pub message: String,

    #[serde(rename = "stackTrace", alias = "stack_trace", default)]
    pub stack_trace: Option<String>,

    #[serde(
        rename = "internalStatusCode",
        alias = "internal_status_code",
        default
    )]
    pub internal_status_code: Option<i64>,

    /// Opaque id of the envelope wrapper, used for deep links
    #[serde(skip)]
    pub record_id: String,

    /// Keys not modelled above, kept for exclusion rules
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LogRecord {
    pub fn severity(&self) -> Level {
        self.level.as_deref().map_or(Level::Other, Level::parse)
    }

    /// Upper-cased level for titles, `LOG` when the record has none.
    pub fn level_label(&self) -> String {
        self.level.as_deref().unwrap_or("log").to_uppercase()
    }

    /// Look up a field by any name the record may carry it under.
    ///
    /// Modelled fields answer to every key they deserialize from; other keys
    /// are read from the unmodelled remainder of the record. Absent fields
    /// yield `None`.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "@timestamp" | "timestamp" => Some(Cow::Owned(self.timestamp.to_rfc3339())),
            "level" | "severity" => self.level.as_deref().map(Cow::Borrowed),
            "applicationName" | "app_name" => self.application_name.as_deref().map(Cow::Borrowed),
            "version" => self.version.as_deref().map(Cow::Borrowed),
            "service" | "serviceIdentifier" | "logger_name" => {
                self.service.as_deref().map(Cow::Borrowed)
            }
            "message" => Some(Cow::Borrowed(&self.message)),
            "stackTrace" | "stack_trace" => self.stack_trace.as_deref().map(Cow::Borrowed),
            "recordId" => Some(Cow::Borrowed(&self.record_id)),
            "internalStatusCode" | "internal_status_code" => {
                self.internal_status_code.map(|c| Cow::Owned(c.to_string()))
            }
            other => match self.extra.get(other)? {
                Value::Null => None,
                Value::String(text) => Some(Cow::Borrowed(text)),
                value => Some(Cow::Owned(value.to_string())),
            },
        }
    }
}
