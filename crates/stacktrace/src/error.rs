//! Error types for rule compilation.

use thiserror::Error;

/// Errors raised while compiling configured patterns.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A configured pattern is not a valid regular expression
    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
