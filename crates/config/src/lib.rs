//! Configuration for the log relay.
//!
//! All settings are read from the environment exactly once at process start
//! and collected into an immutable [`Settings`] value that is passed by
//! reference into the rest of the pipeline.
//!
//! # Environment
//!
//! Required:
//!
//! - `SLACK_CHANNEL`: destination channel identifier
//! - `SLACK_WEBHOOK_PATH`: incoming webhook path, e.g. `/services/T000/B000/XXXX`
//! - `APPLICATION_NAME`: display name used in notification titles
//! - `SOURCE_SEARCH_URL`: source-search URL prefix, used when a frame cannot be resolved
//! - `SOURCE_FILE_URL`: source-file URL prefix (`<prefix>/<revision>/<module>/src/main/java/...`)
//! - `SOURCE_TREE_URL`: source-tree URL prefix (`<prefix>/<revision-or-branch>`)
//! - `APPLICATION_PACKAGES`: JSON array of package regexes identifying our code
//! - `EXCEPTION_PACKAGES`: JSON array of package regexes stripped from exception names
//! - `MODULE_MAPPING`: JSON object of package regex to module path template
//!
//! Optional:
//!
//! - `LOG_SEARCH_CONTEXT_URL`: log-search context view; takes precedence over the base URL
//! - `LOG_SEARCH_BASE_URL`: log-search base URL
//! - `EXCLUSION_FILTERS`: JSON array of `{ field: regex }` objects (default `[]`)

#![warn(clippy::pedantic)]

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

pub const ENV_SLACK_CHANNEL: &str = "SLACK_CHANNEL";
pub const ENV_SLACK_WEBHOOK_PATH: &str = "SLACK_WEBHOOK_PATH";
pub const ENV_APPLICATION_NAME: &str = "APPLICATION_NAME";
pub const ENV_SOURCE_SEARCH_URL: &str = "SOURCE_SEARCH_URL";
pub const ENV_SOURCE_FILE_URL: &str = "SOURCE_FILE_URL";
pub const ENV_SOURCE_TREE_URL: &str = "SOURCE_TREE_URL";
pub const ENV_APPLICATION_PACKAGES: &str = "APPLICATION_PACKAGES";
pub const ENV_EXCEPTION_PACKAGES: &str = "EXCEPTION_PACKAGES";
pub const ENV_MODULE_MAPPING: &str = "MODULE_MAPPING";
pub const ENV_LOG_SEARCH_CONTEXT_URL: &str = "LOG_SEARCH_CONTEXT_URL";
pub const ENV_LOG_SEARCH_BASE_URL: &str = "LOG_SEARCH_BASE_URL";
pub const ENV_EXCLUSION_FILTERS: &str = "EXCLUSION_FILTERS";

/// Errors raised while reading the configuration surface.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set (or is empty)
    #[error("{var} environment variable not set")]
    Missing { var: &'static str },

    /// A JSON-encoded variable could not be parsed
    #[error("{var} is not valid JSON: {source}")]
    InvalidJson {
        var: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON-encoded variable parsed but has the wrong shape
    #[error("{var} has an invalid shape: {reason}")]
    InvalidShape { var: &'static str, reason: String },
}

/// Where "open in log search" deep links point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogSearch {
    /// Context view of a single record: `<url>/<record id>`
    Context(String),
    /// Search UI queried by record id: `<url>?recordId=<record id>`
    Base(String),
}

/// One exclusion rule: every field pattern must match for a record to be dropped.
///
/// Fields are kept in declaration order.
pub type ExclusionRule = Vec<(String, String)>;

/// Immutable process-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub channel: String,
    pub webhook_path: String,
    pub application_name: String,
    pub search_url: String,
    pub file_url: String,
    pub tree_url: String,
    pub application_packages: Vec<String>,
    pub exception_packages: Vec<String>,
    /// Package pattern to module path template, in declaration order.
    pub module_mapping: Vec<(String, String)>,
    pub log_search: Option<LogSearch>,
    pub exclusion_filters: Vec<ExclusionRule>,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary lookup function.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |var: &'static str| lookup(var).filter(|v| !v.trim().is_empty());
        let required = |var: &'static str| optional(var).ok_or(ConfigError::Missing { var });

        let module_mapping = parse_module_mapping(&required(ENV_MODULE_MAPPING)?)?;

        let log_search = optional(ENV_LOG_SEARCH_CONTEXT_URL)
            .map(LogSearch::Context)
            .or_else(|| optional(ENV_LOG_SEARCH_BASE_URL).map(LogSearch::Base));

        let exclusion_filters = match optional(ENV_EXCLUSION_FILTERS) {
            Some(raw) => parse_exclusion_filters(&raw)?,
            None => Vec::new(),
        };

        let settings = Self {
            channel: required(ENV_SLACK_CHANNEL)?,
            webhook_path: required(ENV_SLACK_WEBHOOK_PATH)?,
            application_name: required(ENV_APPLICATION_NAME)?,
            search_url: required(ENV_SOURCE_SEARCH_URL)?,
            file_url: required(ENV_SOURCE_FILE_URL)?,
            tree_url: required(ENV_SOURCE_TREE_URL)?,
            application_packages: parse_json(
                ENV_APPLICATION_PACKAGES,
                &required(ENV_APPLICATION_PACKAGES)?,
            )?,
            exception_packages: parse_json(
                ENV_EXCEPTION_PACKAGES,
                &required(ENV_EXCEPTION_PACKAGES)?,
            )?,
            module_mapping,
            log_search,
            exclusion_filters,
        };

        debug!(
            application_packages = settings.application_packages.len(),
            exception_packages = settings.exception_packages.len(),
            module_rules = settings.module_mapping.len(),
            exclusion_rules = settings.exclusion_filters.len(),
            log_search = settings.log_search.is_some(),
            "Loaded settings"
        );

        Ok(settings)
    }
}

fn parse_json<T: DeserializeOwned>(var: &'static str, raw: &str) -> Result<T, ConfigError> {
    serde_json::from_str(raw).map_err(|source| ConfigError::InvalidJson { var, source })
}

/// Parse the mapping object keeping key order, which decides rule precedence.
fn parse_module_mapping(raw: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let var = ENV_MODULE_MAPPING;
    let object: serde_json::Map<String, serde_json::Value> = parse_json(var, raw)?;

    object
        .into_iter()
        .map(|(pattern, template)| match template {
            serde_json::Value::String(template) => Ok((pattern, template)),
            other => Err(ConfigError::InvalidShape {
                var,
                reason: format!("template for `{pattern}` must be a string, got {other}"),
            }),
        })
        .collect()
}

fn parse_exclusion_filters(raw: &str) -> Result<Vec<ExclusionRule>, ConfigError> {
    let var = ENV_EXCLUSION_FILTERS;
    let rules: Vec<serde_json::Map<String, serde_json::Value>> = parse_json(var, raw)?;

    rules
        .into_iter()
        .map(|rule| {
            rule.into_iter()
                .map(|(field, pattern)| match pattern {
                    serde_json::Value::String(pattern) => Ok((field, pattern)),
                    other => Err(ConfigError::InvalidShape {
                        var,
                        reason: format!("pattern for field `{field}` must be a string, got {other}"),
                    }),
                })
                .collect()
        })
        .collect()
}

/// Build a lookup from a fixed set of pairs; handy for tests in dependent crates.
#[must_use]
pub fn lookup_from<'a, I>(pairs: I) -> impl Fn(&str) -> Option<String>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let vars: BTreeMap<String, String> = pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}
