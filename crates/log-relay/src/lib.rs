//! Log relay: turns batches of application log records into Slack
//! notifications.
//!
//! One invocation decodes an envelope, drops excluded records, orders the
//! rest by timestamp, renders one notification per record and delivers them
//! all concurrently.

#![warn(clippy::pedantic)]

pub mod envelope;
pub mod pipeline;

pub use envelope::{decode, parse_records, EnvelopeError, LogBatch, LogEvent};
pub use pipeline::{build_messages, run, RelayError, Summary};
