//! Java stack-trace normalization and source-location resolution.
//!
//! This crate turns the raw parts of a structured log record into
//! chat-ready text:
//!
//! - [`Rules`] compiles the configured package patterns once at startup
//! - [`locator::resolve`] maps a class or frame reference to a source URL
//! - [`normalize::normalize`] splits a trace into one formatted block per causal exception
//! - [`version::format_version`] renders a release tag or snapshot build as links
//! - [`filter::is_included`] applies the configured exclusion rules
//!
//! All functions are pure and take the compiled [`Rules`] by reference, so a
//! single `Rules` value can be shared by every record of an invocation.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod filter;
pub mod locator;
pub mod normalize;
pub mod record;
pub mod rules;
pub mod version;

pub use error::RuleError;
pub use filter::is_included;
pub use locator::{resolve, Reference, ResolvedLocation};
pub use normalize::normalize;
pub use record::{Level, LogRecord};
pub use rules::{Rules, SourceUrls};
pub use version::format_version;
