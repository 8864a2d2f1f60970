//! One invocation, end to end.

use config::Settings;
use notify::assemble::build_message;
use notify::{ChannelError, NotificationMessage, Notifier};
use stacktrace::{is_included, LogRecord, Rules};
use thiserror::Error;
use tracing::info;

use crate::envelope::{self, EnvelopeError};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    #[error("notification delivery failed: {0}")]
    Dispatch(#[from] ChannelError),
}

/// Counts reported for a finished invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub received: usize,
    pub dispatched: usize,
}

/// Filter, order and render records.
///
/// Messages come out in ascending timestamp order of their records; records
/// with equal timestamps keep their batch order.
pub fn build_messages(
    records: Vec<LogRecord>,
    settings: &Settings,
    rules: &Rules,
) -> Vec<NotificationMessage> {
    let mut records: Vec<LogRecord> = records
        .into_iter()
        .filter(|record| is_included(record, rules))
        .collect();

    records.sort_by_key(|record| record.timestamp);

    records
        .iter()
        .map(|record| build_message(record, settings, rules))
        .collect()
}

/// Run one invocation: decode, render and dispatch.
///
/// Every message is attempted; the first delivery error is returned once all
/// deliveries have settled.
pub async fn run(
    input: &str,
    settings: &Settings,
    rules: &Rules,
    notifier: &Notifier,
) -> Result<Summary, RelayError> {
    let batch = envelope::decode(input)?;
    let records = envelope::parse_records(&batch)?;
    let received = records.len();

    let messages = build_messages(records, settings, rules);

    info!(
        received,
        excluded = received - messages.len(),
        "Dispatching notifications"
    );

    notifier.dispatch_all(&messages).await?;

    Ok(Summary {
        received,
        dispatched: messages.len(),
    })
}
