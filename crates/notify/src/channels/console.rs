//! Console channel for dry runs: writes each payload as one JSON line.

use std::io::Write;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::message::NotificationMessage;
use crate::NotifyChannel;

/// Writes payloads to any writer, stdout by default.
pub struct ConsoleChannel {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleChannel {
    #[must_use]
    pub fn stdout() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    #[must_use]
    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

#[async_trait]
impl NotifyChannel for ConsoleChannel {
    fn name(&self) -> &'static str {
        "console"
    }

    async fn send(&self, message: &NotificationMessage) -> Result<(), ChannelError> {
        let line = serde_json::to_string(message)?;
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        writeln!(out, "{line}")?;
        Ok(())
    }
}
