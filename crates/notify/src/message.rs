//! Notification payload (Slack Block Kit).

use serde::Serialize;

/// A complete notification, serialized as the webhook request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationMessage {
    pub channel: String,
    /// Title line, also the fallback text of push notifications
    pub text: String,
    pub attachments: Vec<Attachment>,
}

/// Colored attachment holding the content blocks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub color: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        text: Text,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessory: Option<Accessory>,
    },
    Divider,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    Mrkdwn { text: String },
    PlainText { text: String, emoji: bool },
}

/// Interactive element attached to a section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Accessory {
    Button { text: Text, url: String },
}

impl Block {
    pub fn section(text: impl Into<String>) -> Self {
        Self::Section {
            text: Text::Mrkdwn { text: text.into() },
            accessory: None,
        }
    }

    pub fn with_link_button(self, label: &str, url: impl Into<String>) -> Self {
        match self {
            Self::Section { text, .. } => Self::Section {
                text,
                accessory: Some(Accessory::Button {
                    text: Text::PlainText {
                        text: label.to_string(),
                        emoji: true,
                    },
                    url: url.into(),
                }),
            },
            Self::Divider => Self::Divider,
        }
    }

    /// Markdown text of a section block.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Section {
                text: Text::Mrkdwn { text } | Text::PlainText { text, .. },
                ..
            } => Some(text),
            Self::Divider => None,
        }
    }

    pub fn link_url(&self) -> Option<&str> {
        match self {
            Self::Section {
                accessory: Some(Accessory::Button { url, .. }),
                ..
            } => Some(url),
            _ => None,
        }
    }
}

impl NotificationMessage {
    pub fn color(&self) -> Option<&str> {
        self.attachments.first().map(|a| a.color.as_str())
    }

    /// All content blocks in order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.attachments.iter().flat_map(|a| a.blocks.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_as_block_kit() {
        let message = NotificationMessage {
            channel: "#alerts".to_string(),
            text: "ERROR in Awesome".to_string(),
            attachments: vec![Attachment {
                color: "#d40e0d".to_string(),
                blocks: vec![
                    Block::section("*Version:* 1.0").with_link_button("Open", "https://logs/1"),
                    Block::Divider,
                ],
            }],
        };

        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({
                "channel": "#alerts",
                "text": "ERROR in Awesome",
                "attachments": [{
                    "color": "#d40e0d",
                    "blocks": [
                        {
                            "type": "section",
                            "text": {"type": "mrkdwn", "text": "*Version:* 1.0"},
                            "accessory": {
                                "type": "button",
                                "text": {"type": "plain_text", "text": "Open", "emoji": true},
                                "url": "https://logs/1"
                            }
                        },
                        {"type": "divider"}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_section_without_accessory_omits_field() {
        let value = serde_json::to_value(Block::section("hi")).unwrap();
        assert!(value.get("accessory").is_none());
    }
}
