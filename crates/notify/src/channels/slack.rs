//! Slack incoming-webhook channel.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::message::NotificationMessage;
use crate::NotifyChannel;

/// Host serving Slack incoming webhooks.
pub const SLACK_HOST: &str = "https://hooks.slack.com";

/// Slack webhook notification channel.
pub struct SlackChannel {
    url: String,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Create a channel posting to `https://hooks.slack.com<webhook_path>`.
    #[must_use]
    pub fn new(webhook_path: &str) -> Self {
        Self::with_host(SLACK_HOST, webhook_path)
    }

    /// Create a channel posting to a webhook path on another host.
    #[must_use]
    pub fn with_host(host: &str, webhook_path: &str) -> Self {
        Self {
            url: format!(
                "{}/{}",
                host.trim_end_matches('/'),
                webhook_path.trim_start_matches('/')
            ),
            client: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), ChannelError> {
        debug!(channel = "slack", title = %message.text, "Sending notification");

        let response = self.client.post(&self.url).json(message).send().await?;

        if response.status().is_success() {
            debug!(channel = "slack", "Notification sent successfully");
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            warn!(
                channel = "slack",
                status = %status,
                body = %body,
                "Slack webhook request failed"
            );

            Err(ChannelError::Rejected {
                channel: "slack",
                status: status.as_u16(),
                body,
            })
        }
    }
}
