//! Builders for inbound messages.

use syncara_models::{
    ChatId, ChatKind, EntityKind, InboundMessage, MessageId, Sender, UserId,
};

pub fn sender(id: i64, first_name: &str) -> Sender {
    Sender::new(UserId(id), first_name)
}

/// A private-chat text message from `from`.
pub fn private_message(id: i32, from: Sender, text: &str) -> InboundMessage {
    let chat = from.id.private_chat();
    InboundMessage::text(MessageId(id), chat, ChatKind::Private, from, text)
}

/// A group text message from `from` in `chat`.
pub fn group_message(id: i32, chat: i64, from: Sender, text: &str) -> InboundMessage {
    let mut msg = InboundMessage::text(MessageId(id), ChatId(chat), ChatKind::Group, from, text);
    msg.chat_title = Some("Test Group".to_string());
    msg
}

/// A group message that `@`-mentions `handle`; the entity is derived
/// from the text.
pub fn group_mention(id: i32, chat: i64, from: Sender, handle: &str, rest: &str) -> InboundMessage {
    let text = format!("@{} {}", handle, rest);
    let mut msg = group_message(id, chat, from, &text);
    msg.entities.push(EntityKind::Mention {
        username: handle.to_string(),
    });
    msg
}
