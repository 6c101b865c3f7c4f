//! Deciding whether an assistant is being spoken to.

use regex::Regex;
use syncara_core::ClientIdentity;
use syncara_models::{EntityKind, InboundMessage};

/// Why an assistant answers a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressed {
    Private,
    Reply,
    Mention,
    TextMention,
}

/// Returns how `message` addresses the account `me`, or `None` when it
/// does not.
pub fn addressed_to(me: &ClientIdentity, message: &InboundMessage) -> Option<Addressed> {
    if message.sender.id == me.user_id {
        return None;
    }
    if message.is_private() {
        return Some(Addressed::Private);
    }
    if message
        .reply_to_sender
        .as_ref()
        .is_some_and(|s| s.id == me.user_id)
    {
        return Some(Addressed::Reply);
    }
    for entity in &message.entities {
        match entity {
            EntityKind::Mention { username } => {
                if me
                    .username
                    .as_deref()
                    .is_some_and(|own| own.eq_ignore_ascii_case(username.trim_start_matches('@')))
                {
                    return Some(Addressed::Mention);
                }
            }
            EntityKind::TextMention { user_id } => {
                if *user_id == me.user_id {
                    return Some(Addressed::TextMention);
                }
            }
        }
    }
    None
}

/// Removes `@handle` (any case) from `text`.
pub fn strip_handle(text: &str, handle: &str) -> String {
    if handle.is_empty() {
        return text.trim().to_string();
    }
    let pattern = format!(r"(?i)[ \t]*@{}\b", regex::escape(handle));
    match Regex::new(&pattern) {
        Ok(re) => re.replace_all(text, "").trim().to_string(),
        Err(_) => text.trim().to_string(),
    }
}
