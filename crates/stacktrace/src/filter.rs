//! Exclusion filtering.
//!
//! A record is dropped when every field pattern of at least one rule matches.
//! Patterns are unanchored regexes: a match anywhere in the field counts.

use tracing::debug;

use crate::record::LogRecord;
use crate::rules::{ExclusionRule, Rules};

/// Whether a record should produce a notification.
pub fn is_included(record: &LogRecord, rules: &Rules) -> bool {
    match rules.exclusions().iter().position(|rule| matches(record, rule)) {
        Some(index) => {
            debug!(record_id = %record.record_id, rule = index, "Record excluded");
            false
        }
        None => true,
    }
}

fn matches(record: &LogRecord, rule: &ExclusionRule) -> bool {
    !rule.fields.is_empty()
        && rule.fields.iter().all(|(field, pattern)| {
            record
                .field(field)
                .is_some_and(|value| pattern.is_match(&value))
        })
}
