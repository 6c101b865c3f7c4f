//! Inbound message events and media references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatId, MessageId, UserId};

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Group,
    Channel,
}

/// Identity of a message author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    pub id: UserId,
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

impl Sender {
    pub fn new(id: UserId, first_name: impl Into<String>) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: None,
            username: None,
            is_bot: false,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// First and last name joined.
    pub fn display_name(&self) -> String {
        match &self.last_name {
            Some(last) => format!("{} {}", self.first_name, last),
            None => self.first_name.clone(),
        }
    }
}

/// Message entities relevant to addressing an assistant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntityKind {
    /// `@username` mention; holds the username without `@`.
    Mention { username: String },
    /// Mention of a user without a username, by id.
    TextMention { user_id: UserId },
}

/// Attached media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaKind {
    Photo { file_id: String },
    Document { file_id: String, file_name: Option<String> },
    Audio { file_id: String },
    Video { file_id: String },
    Voice { file_id: String },
    Sticker { emoji: Option<String> },
}

impl MediaKind {
    /// Placeholder used when rendering the message as text.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Photo { .. } => "[photo]",
            Self::Document { .. } => "[document]",
            Self::Audio { .. } => "[audio]",
            Self::Video { .. } => "[video]",
            Self::Voice { .. } => "[voice]",
            Self::Sticker { .. } => "[sticker]",
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Photo { .. })
    }
}

/// Where a piece of outbound media comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MediaSource {
    Url { url: String },
    Bytes { file_name: String, data: Vec<u8> },
}

impl MediaSource {
    pub fn url(url: impl Into<String>) -> Self {
        Self::Url { url: url.into() }
    }

    pub fn bytes(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Bytes {
            file_name: file_name.into(),
            data,
        }
    }
}

/// A message received by an assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    #[serde(default)]
    pub chat_title: Option<String>,
    pub sender: Sender,
    pub text: String,
    pub date: DateTime<Utc>,
    /// Author of the message this one replies to.
    #[serde(default)]
    pub reply_to_sender: Option<Sender>,
    #[serde(default)]
    pub reply_to_message: Option<MessageId>,
    /// Text (or media placeholder) of the replied-to message.
    #[serde(default)]
    pub reply_excerpt: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityKind>,
    #[serde(default)]
    pub media: Option<MediaKind>,
}

impl InboundMessage {
    /// A text message with no reply linkage, entities or media.
    pub fn text(
        id: MessageId,
        chat_id: ChatId,
        chat_kind: ChatKind,
        sender: Sender,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id,
            chat_id,
            chat_kind,
            chat_title: None,
            sender,
            text: text.into(),
            date: Utc::now(),
            reply_to_sender: None,
            reply_to_message: None,
            reply_excerpt: None,
            entities: Vec::new(),
            media: None,
        }
    }

    pub fn is_private(&self) -> bool {
        self.chat_kind == ChatKind::Private
    }

    /// Text, or the media placeholder when the message has no text.
    pub fn body(&self) -> String {
        match (&self.media, self.text.is_empty()) {
            (Some(media), true) => media.placeholder().to_string(),
            (Some(media), false) => format!("{} {}", media.placeholder(), self.text),
            (None, _) => self.text.clone(),
        }
    }
}

/// A message from the recent chat window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub sender_name: String,
    pub date: DateTime<Utc>,
    /// Text, or a media placeholder.
    pub text: String,
    #[serde(default)]
    pub reply_to: Option<MessageId>,
}

impl From<&InboundMessage> for HistoryMessage {
    fn from(msg: &InboundMessage) -> Self {
        Self {
            id: msg.id,
            sender_id: msg.sender.id,
            sender_name: msg.sender.display_name(),
            date: msg.date,
            text: msg.body(),
            reply_to: msg.reply_to_message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> InboundMessage {
        InboundMessage::text(
            MessageId(10),
            ChatId(-100),
            ChatKind::Group,
            Sender::new(UserId(7), "Rina"),
            "halo",
        )
    }

    #[test]
    fn test_body_with_media() {
        let mut msg = sample();
        msg.text.clear();
        msg.media = Some(MediaKind::Photo {
            file_id: "abc".into(),
        });
        assert_eq!(msg.body(), "[photo]");

        msg.text = "lihat ini".into();
        assert_eq!(msg.body(), "[photo] lihat ini");
    }

    #[test]
    fn test_history_from_inbound() {
        let msg = sample();
        let h = HistoryMessage::from(&msg);
        assert_eq!(h.id, MessageId(10));
        assert_eq!(h.sender_name, "Rina");
        assert_eq!(h.text, "halo");
    }

    #[test]
    fn test_display_name() {
        let mut s = Sender::new(UserId(1), "Rina");
        assert_eq!(s.display_name(), "Rina");
        s.last_name = Some("Putri".into());
        assert_eq!(s.display_name(), "Rina Putri");
    }
}
