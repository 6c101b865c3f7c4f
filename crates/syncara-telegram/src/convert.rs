//! Conversion from Bot API updates into the assistant's message model.

use syncara_models::{
    ChatId, ChatKind, EntityKind, InboundMessage, MediaKind, MessageId, Sender, UserId,
};
use teloxide::types::{Chat, Message, MessageEntityKind, User};

/// Builds an [`InboundMessage`] from a Bot API message.
///
/// Returns `None` for service messages that carry neither text nor media
/// (joins, pins, title changes).
pub fn inbound_from(msg: &Message) -> Option<InboundMessage> {
    let text = msg.text().or_else(|| msg.caption()).unwrap_or_default();
    let media = media_of(msg);
    if text.is_empty() && media.is_none() {
        return None;
    }

    let sender = match msg.from.as_ref() {
        Some(user) => sender_from(user),
        // Channel posts and anonymous admins have no user.
        None => Sender::new(
            UserId(msg.chat.id.0),
            msg.chat.title().unwrap_or("channel").to_string(),
        ),
    };

    let reply = msg.reply_to_message();

    Some(InboundMessage {
        id: MessageId(msg.id.0),
        chat_id: ChatId(msg.chat.id.0),
        chat_kind: chat_kind(&msg.chat),
        chat_title: msg.chat.title().map(str::to_string),
        sender,
        text: text.to_string(),
        date: msg.date,
        reply_to_sender: reply.and_then(|r| r.from.as_ref()).map(sender_from),
        reply_to_message: reply.map(|r| MessageId(r.id.0)),
        reply_excerpt: reply.and_then(excerpt),
        entities: entities_of(msg),
        media,
    })
}

pub fn chat_kind(chat: &Chat) -> ChatKind {
    if chat.is_private() {
        ChatKind::Private
    } else if chat.is_channel() {
        ChatKind::Channel
    } else {
        ChatKind::Group
    }
}

pub fn sender_from(user: &User) -> Sender {
    Sender {
        id: UserId(user.id.0 as i64),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        username: user.username.clone(),
        is_bot: user.is_bot,
    }
}

fn excerpt(msg: &Message) -> Option<String> {
    match (msg.text().or_else(|| msg.caption()), media_of(msg)) {
        (Some(text), _) => Some(text.to_string()),
        (None, Some(media)) => Some(media.placeholder().to_string()),
        (None, None) => None,
    }
}

fn entities_of(msg: &Message) -> Vec<EntityKind> {
    let parsed = msg
        .parse_entities()
        .or_else(|| msg.parse_caption_entities())
        .unwrap_or_default();

    parsed
        .iter()
        .filter_map(|entity| match entity.kind() {
            MessageEntityKind::Mention => Some(EntityKind::Mention {
                username: entity.text().trim_start_matches('@').to_string(),
            }),
            MessageEntityKind::TextMention { user } => Some(EntityKind::TextMention {
                user_id: UserId(user.id.0 as i64),
            }),
            _ => None,
        })
        .collect()
}

fn media_of(msg: &Message) -> Option<MediaKind> {
    if let Some(sizes) = msg.photo() {
        // Sizes are ordered smallest first.
        return sizes.last().map(|p| MediaKind::Photo {
            file_id: p.file.id.to_string(),
        });
    }
    if let Some(doc) = msg.document() {
        return Some(MediaKind::Document {
            file_id: doc.file.id.to_string(),
            file_name: doc.file_name.clone(),
        });
    }
    if let Some(audio) = msg.audio() {
        return Some(MediaKind::Audio {
            file_id: audio.file.id.to_string(),
        });
    }
    if let Some(video) = msg.video() {
        return Some(MediaKind::Video {
            file_id: video.file.id.to_string(),
        });
    }
    if let Some(voice) = msg.voice() {
        return Some(MediaKind::Voice {
            file_id: voice.file.id.to_string(),
        });
    }
    msg.sticker().map(|s| MediaKind::Sticker {
        emoji: s.emoji.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_group_text_with_mention() {
        let msg = message(json!({
            "message_id": 5,
            "date": 1_760_763_600,
            "chat": {"id": -100, "type": "supergroup", "title": "Kopi Pagi"},
            "from": {"id": 7, "is_bot": false, "first_name": "Rina", "username": "rina"},
            "text": "hai @Aeris_sync",
            "entities": [{"type": "mention", "offset": 4, "length": 11}]
        }));

        let inbound = inbound_from(&msg).unwrap();
        assert_eq!(inbound.id, MessageId(5));
        assert_eq!(inbound.chat_id, ChatId(-100));
        assert_eq!(inbound.chat_kind, ChatKind::Group);
        assert_eq!(inbound.chat_title.as_deref(), Some("Kopi Pagi"));
        assert_eq!(inbound.sender.id, UserId(7));
        assert_eq!(inbound.sender.username.as_deref(), Some("rina"));
        assert_eq!(
            inbound.entities,
            vec![EntityKind::Mention {
                username: "Aeris_sync".into()
            }]
        );
        assert!(inbound.media.is_none());
    }

    #[test]
    fn test_private_reply_linkage() {
        let msg = message(json!({
            "message_id": 9,
            "date": 1_760_763_600,
            "chat": {"id": 7, "type": "private", "first_name": "Rina"},
            "from": {"id": 7, "is_bot": false, "first_name": "Rina"},
            "text": "yang ini",
            "reply_to_message": {
                "message_id": 8,
                "date": 1_760_763_500,
                "chat": {"id": 7, "type": "private", "first_name": "Rina"},
                "from": {"id": 900, "is_bot": true, "first_name": "Aeris", "username": "Aeris_sync"},
                "text": "mau dibuatin gambar?"
            }
        }));

        let inbound = inbound_from(&msg).unwrap();
        assert!(inbound.is_private());
        assert_eq!(inbound.reply_to_message, Some(MessageId(8)));
        assert_eq!(inbound.reply_to_sender.map(|s| s.id), Some(UserId(900)));
        assert_eq!(inbound.reply_excerpt.as_deref(), Some("mau dibuatin gambar?"));
    }

    #[test]
    fn test_photo_uses_largest_size() {
        let msg = message(json!({
            "message_id": 3,
            "date": 1_760_763_600,
            "chat": {"id": 7, "type": "private", "first_name": "Rina"},
            "from": {"id": 7, "is_bot": false, "first_name": "Rina"},
            "caption": "lihat",
            "photo": [
                {"file_id": "small", "file_unique_id": "s", "width": 90, "height": 90, "file_size": 100},
                {"file_id": "large", "file_unique_id": "l", "width": 800, "height": 800, "file_size": 9000}
            ]
        }));

        let inbound = inbound_from(&msg).unwrap();
        assert_eq!(inbound.text, "lihat");
        assert_eq!(
            inbound.media,
            Some(MediaKind::Photo {
                file_id: "large".into()
            })
        );
    }
}
