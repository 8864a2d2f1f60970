//! Slack notifications for application log records.
//!
//! This crate turns normalized log records into Slack Block Kit payloads and
//! delivers them.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{assemble, Notifier};
//! # async fn run(records: Vec<stacktrace::LogRecord>) -> Result<(), Box<dyn std::error::Error>> {
//! let settings = config::Settings::from_env()?;
//! let rules = stacktrace::Rules::from_settings(&settings)?;
//!
//! let messages: Vec<_> = records
//!     .iter()
//!     .map(|record| assemble::build_message(record, &settings, &rules))
//!     .collect();
//!
//! Notifier::from_settings(&settings).dispatch_all(&messages).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`assemble`] lays out the blocks of one [`NotificationMessage`]
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`SlackChannel`] implements Slack incoming webhooks
//! - [`ConsoleChannel`] prints payloads instead of sending them
//! - [`Notifier`] delivers a batch of messages to all channels concurrently

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod assemble;
pub mod channels;
pub mod error;
pub mod message;

pub use channels::console::ConsoleChannel;
pub use channels::slack::SlackChannel;
pub use channels::NotifyChannel;
pub use error::ChannelError;
pub use message::{Attachment, Block, NotificationMessage};

use std::sync::Arc;

use config::Settings;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

/// Notification dispatcher.
///
/// Each message is sent to every channel. Sends start in message order and
/// run concurrently; a failed send never cancels its siblings.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
}

impl Notifier {
    /// Create a notifier posting to the configured Slack webhook.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        info!(channel = %settings.channel, "Slack notifications enabled");
        let slack: Arc<dyn NotifyChannel> = Arc::new(SlackChannel::new(&settings.webhook_path));
        Self::with_channels(vec![slack])
    }

    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        if channels.is_empty() {
            warn!("No notification channels configured");
        }
        Self { channels }
    }

    /// Get the number of channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Send every message and wait until all sends have settled.
    ///
    /// Returns the first error in message order, after logging every failure.
    pub async fn dispatch_all(&self, messages: &[NotificationMessage]) -> Result<(), ChannelError> {
        if messages.is_empty() {
            debug!("Nothing to dispatch");
            return Ok(());
        }

        let sends = messages.iter().enumerate().flat_map(|(index, message)| {
            self.channels.iter().map(move |channel| async move {
                let result = channel.send(message).await;
                match &result {
                    Ok(()) => debug!(channel = channel.name(), index, "Notification sent"),
                    Err(e) => error!(
                        channel = channel.name(),
                        index,
                        error = %e,
                        "Failed to send notification"
                    ),
                }
                result
            })
        });

        let results = join_all(sends).await;
        let failed = results.iter().filter(|r| r.is_err()).count();

        info!(
            messages = messages.len(),
            sends = results.len(),
            failed,
            "Dispatch finished"
        );

        results.into_iter().collect::<Result<Vec<()>, _>>().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records the order sends start in, then settles after a per-title delay.
    #[derive(Default)]
    struct RecordingChannel {
        started: Mutex<Vec<String>>,
        finished: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[async_trait]
    impl NotifyChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn send(&self, message: &NotificationMessage) -> Result<(), ChannelError> {
            self.started.lock().unwrap().push(message.text.clone());

            // later messages finish first
            let delay = 40 - 10 * message.text.len().min(4) as u64;
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.finished.lock().unwrap().push(message.text.clone());
            if self.fail_on == Some(message.text.as_str()) {
                return Err(ChannelError::Rejected {
                    channel: "recording",
                    status: 500,
                    body: message.text.clone(),
                });
            }
            Ok(())
        }
    }

    fn message(text: &str) -> NotificationMessage {
        NotificationMessage {
            channel: "#alerts".to_string(),
            text: text.to_string(),
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn test_sends_start_in_message_order() {
        let channel = Arc::new(RecordingChannel::default());
        let notifier = Notifier::with_channels(vec![channel.clone() as Arc<dyn NotifyChannel>]);

        notifier
            .dispatch_all(&[message("a"), message("bb"), message("ccc")])
            .await
            .unwrap();

        assert_eq!(*channel.started.lock().unwrap(), vec!["a", "bb", "ccc"]);
        assert_eq!(*channel.finished.lock().unwrap(), vec!["ccc", "bb", "a"]);
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_siblings() {
        let channel = Arc::new(RecordingChannel {
            fail_on: Some("bb"),
            ..Default::default()
        });
        let notifier = Notifier::with_channels(vec![channel.clone() as Arc<dyn NotifyChannel>]);

        let err = notifier
            .dispatch_all(&[message("a"), message("bb"), message("ccc")])
            .await
            .unwrap_err();

        assert!(matches!(err, ChannelError::Rejected { ref body, .. } if body == "bb"));
        assert_eq!(channel.finished.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let notifier = Notifier::with_channels(vec![]);
        assert_eq!(notifier.channel_count(), 0);
        notifier.dispatch_all(&[]).await.unwrap();
    }
}
