//! Shortcode token extraction.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use syncara_models::MessageId;

use crate::key::ShortcodeKey;

/// Placeholder inside params replaced with the triggering message id.
pub const CURRENT_MESSAGE_ID: &str = "current_message_id";

/// `[CATEGORY:ACTION]` or `[CATEGORY:ACTION:PARAMS]`; params stop at the
/// first `]`, so brackets do not nest.
static SHORTCODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([A-Z][A-Z0-9_]*):([A-Z][A-Z0-9_]*)(?::([^\]]*))?\]")
        .expect("Invalid shortcode regex")
});

/// One token found in a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedShortcode {
    pub key: ShortcodeKey,
    /// Params after placeholder substitution; empty for the no-params form.
    pub params: String,
    /// Byte range of the whole token in the source text.
    pub span: Range<usize>,
}

/// Finds every token in `text` in order of appearance.
pub fn parse(text: &str, current_message: MessageId) -> Vec<ParsedShortcode> {
    let message_id = current_message.to_string();
    SHORTCODE_REGEX
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = ShortcodeKey::new(&caps[1], &caps[2]).ok()?;
            let params = caps
                .get(3)
                .map(|m| m.as_str().replace(CURRENT_MESSAGE_ID, &message_id))
                .unwrap_or_default();
            Some(ParsedShortcode {
                key,
                params,
                span: whole.range(),
            })
        })
        .collect()
}
