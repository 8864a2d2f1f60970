//! Notification assembly.
//!
//! Combines a record with its resolved class link, version label and
//! normalized trace into a [`NotificationMessage`], keeping every block
//! within Slack's per-block character limit.

use config::{LogSearch, Settings};
use stacktrace::{
    format_version, normalize, resolve, Level, LogRecord, Reference, ResolvedLocation, Rules,
};

use crate::message::{Attachment, Block, NotificationMessage};

/// Slack's maximum text length for a section block.
pub const BLOCK_LIMIT: usize = 3000;

const OPEN_IN_LOG_SEARCH: &str = "Open in log search";

/// Token in a message that escalates it regardless of level.
const CRITICAL_MARKER: &str = "CRITICAL";

/// Attachment color by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Critical,
    Error,
    Warning,
}

impl Color {
    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::Critical => "#000000", // Black
            Self::Error => "#d40e0d",    // Red
            Self::Warning => "#f2c744",  // Amber
        }
    }
}

/// `CRITICAL` in the message text wins over the level.
pub fn severity_color(record: &LogRecord) -> Color {
    if record.message.contains(CRITICAL_MARKER) {
        Color::Critical
    } else if record.severity() == Level::Error {
        Color::Error
    } else {
        Color::Warning
    }
}

/// Deep link into the log search UI for a record.
pub fn deep_link(search: Option<&LogSearch>, record_id: &str) -> Option<String> {
    if record_id.is_empty() {
        return None;
    }
    let id = urlencoding::encode(record_id);

    search.map(|search| match search {
        LogSearch::Context(url) => format!("{}/{id}", url.trim_end_matches('/')),
        LogSearch::Base(url) => format!("{url}?recordId={id}"),
    })
}

/// Logger class shortened for display, with its source link if resolved.
#[derive(Debug, Clone)]
pub struct ClassLabel {
    pub short_name: String,
    pub location: Option<ResolvedLocation>,
}

impl ClassLabel {
    fn render(&self) -> String {
        match &self.location {
            Some(location) => format!("*Class:* <{}|{}>", location.url, self.short_name),
            None => format!("*Class:* {}", self.short_name),
        }
    }
}

/// Everything the assembler needs besides the record itself.
#[derive(Debug, Clone)]
pub struct MessageParts<'a> {
    pub channel: &'a str,
    pub application_name: &'a str,
    pub class: ClassLabel,
    pub segments: Vec<String>,
    pub version_label: String,
    pub color: Color,
    pub deep_link: Option<String>,
}

/// Build the notification for one record.
pub fn build_message(record: &LogRecord, settings: &Settings, rules: &Rules) -> NotificationMessage {
    let version = record.version.as_deref();

    let class = match record.service.as_deref() {
        Some(service) => ClassLabel {
            short_name: rules.strip_application_package(service).to_string(),
            location: resolve(rules, service, Reference::Class, version),
        },
        None => ClassLabel {
            short_name: "unknown".to_string(),
            location: None,
        },
    };

    assemble(
        record,
        MessageParts {
            channel: &settings.channel,
            application_name: &settings.application_name,
            class,
            segments: normalize(rules, record.stack_trace.as_deref(), version),
            version_label: format_version(&rules.urls, version),
            color: severity_color(record),
            deep_link: deep_link(settings.log_search.as_ref(), &record.record_id),
        },
    )
}

/// Lay out the blocks of a notification.
///
/// Order: class, internal status code (if any), version (with the log
/// search button), message, divider, then one block per causal exception.
pub fn assemble(record: &LogRecord, parts: MessageParts<'_>) -> NotificationMessage {
    let mut blocks = vec![Block::section(clip(&parts.class.render()))];

    if let Some(code) = record.internal_status_code {
        blocks.push(Block::section(format!("*Internal status code:* {code}")));
    }

    let version = Block::section(clip(&format!("*Version:* {}", parts.version_label)));
    blocks.push(match &parts.deep_link {
        Some(url) => version.with_link_button(OPEN_IN_LOG_SEARCH, url.as_str()),
        None => version,
    });

    blocks.push(Block::section(clip(&format!("*Message:* {}", record.message))));
    blocks.push(Block::Divider);

    blocks.extend(
        parts
            .segments
            .iter()
            .map(String::as_str)
            .map(truncate_segment)
            .filter(|text| !text.is_empty())
            .map(Block::section),
    );

    let title = match record.application_name.as_deref() {
        Some(app) => format!(
            "{} in {} ({app})",
            record.level_label(),
            parts.application_name
        ),
        None => format!("{} in {}", record.level_label(), parts.application_name),
    };

    NotificationMessage {
        channel: parts.channel.to_string(),
        text: title,
        attachments: vec![Attachment {
            color: parts.color.hex().to_string(),
            blocks,
        }],
    }
}

/// Fit one trace segment into a block.
///
/// Lines are kept until the next one would push the text over the limit; a
/// trailing `...` line is dropped and the result hard-clipped.
pub fn truncate_segment(segment: &str) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut length = 0;

    for line in segment.lines() {
        let added = line.chars().count() + usize::from(!kept.is_empty());
        if length + added > BLOCK_LIMIT {
            // an oversized header still gets a clipped block of its own
            if kept.is_empty() {
                kept.push(line);
            }
            break;
        }
        length += added;
        kept.push(line);
    }

    if kept.last().is_some_and(|line| line.trim() == "...") {
        kept.pop();
    }

    clip(kept.join("\n").trim())
}

fn clip(text: &str) -> String {
    text.chars().take(BLOCK_LIMIT).collect()
}
