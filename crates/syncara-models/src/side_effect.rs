//! Side effects that handlers defer until after the prose reply.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatId, MessageId};
use crate::message::MediaSource;

/// Default time-to-live for a pending side effect.
pub const DEFAULT_SIDE_EFFECT_TTL_SECS: i64 = 600;

/// Kind of a deferred delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideEffectKind {
    Photo,
    Document,
    Audio,
    TextResult,
}

impl fmt::Display for SideEffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Photo => "photo",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::TextResult => "text_result",
        };
        f.write_str(s)
    }
}

/// What to deliver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SideEffectPayload {
    Photo {
        source: MediaSource,
        caption: Option<String>,
    },
    Document {
        source: MediaSource,
        caption: Option<String>,
    },
    Audio {
        source: MediaSource,
        caption: Option<String>,
    },
    Text {
        text: String,
    },
}

impl SideEffectPayload {
    pub fn kind(&self) -> SideEffectKind {
        match self {
            Self::Photo { .. } => SideEffectKind::Photo,
            Self::Document { .. } => SideEffectKind::Document,
            Self::Audio { .. } => SideEffectKind::Audio,
            Self::Text { .. } => SideEffectKind::TextResult,
        }
    }
}

/// A queued delivery owned by the handler that created it until flushed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSideEffect {
    pub id: String,
    pub target_chat: ChatId,
    pub reply_to_message: Option<MessageId>,
    pub payload: SideEffectPayload,
    pub created_at: DateTime<Utc>,
    pub ttl_secs: i64,
    /// Lets the creating handler find its entry again, e.g. `canvas:<key>:<version>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl PendingSideEffect {
    /// Create a side effect with a fresh id and the default TTL.
    pub fn new(
        target_chat: ChatId,
        reply_to_message: Option<MessageId>,
        payload: SideEffectPayload,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            target_chat,
            reply_to_message,
            payload,
            created_at: Utc::now(),
            ttl_secs: DEFAULT_SIDE_EFFECT_TTL_SECS,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Override the TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.num_seconds();
        self
    }

    /// Override the creation time (used when replaying queued entries).
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    pub fn kind(&self) -> SideEffectKind {
        self.payload.kind()
    }

    /// Whether the entry has outlived its TTL at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.created_at).num_seconds() > self.ttl_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let effect = PendingSideEffect::new(
            ChatId(1),
            None,
            SideEffectPayload::Text { text: "hi".into() },
        )
        .created_at(now - Duration::minutes(11));
        assert!(effect.is_expired(now));

        let fresh = effect.clone().created_at(now - Duration::minutes(9));
        assert!(!fresh.is_expired(now));
    }

    #[test]
    fn test_kind_follows_payload() {
        let effect = PendingSideEffect::new(
            ChatId(1),
            None,
            SideEffectPayload::Photo {
                source: MediaSource::url("https://example.com/a.png"),
                caption: None,
            },
        );
        assert_eq!(effect.kind(), SideEffectKind::Photo);
        assert_eq!(effect.kind().to_string(), "photo");
    }

    #[test]
    fn test_ids_are_unique() {
        let payload = SideEffectPayload::Text { text: "x".into() };
        let a = PendingSideEffect::new(ChatId(1), None, payload.clone());
        let b = PendingSideEffect::new(ChatId(1), None, payload);
        assert_ne!(a.id, b.id);
    }
}
