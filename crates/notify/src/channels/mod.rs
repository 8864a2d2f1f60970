//! Notification channel implementations.

pub mod console;
pub mod slack;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::NotificationMessage;

/// Trait for notification channels (Slack webhook, console, etc.).
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Deliver one message to this channel.
    async fn send(&self, message: &NotificationMessage) -> Result<(), ChannelError>;
}
