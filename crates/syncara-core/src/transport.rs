//! The chat-platform interface the assistants drive.
//!
//! Everything that talks to Telegram goes through [`Transport`]. The
//! production adapter lives in `syncara-telegram`; tests use a recording
//! mock. Operations the platform session cannot perform (voice calls on a
//! bot account, history reads without a cache) return
//! [`TransportError::Unsupported`].

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use syncara_models::{
    Assistant, ChatId, ChatKind, HistoryMessage, MediaKind, MediaSource, MessageId, UserId,
};
use thiserror::Error;

/// Errors surfaced by a transport.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The peer cannot be messaged (never started a chat, blocked, deleted).
    #[error("invalid peer: {0}")]
    InvalidPeer(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("message too old to modify")]
    MessageTooOld,

    #[error("not found: {0}")]
    NotFound(String),

    /// The operation is not available on this session.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("api error: {0}")]
    Api(String),
}

impl TransportError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::RateLimited { .. })
    }

    /// Whether the failure means the target refused direct messages.
    pub fn is_invalid_peer(&self) -> bool {
        matches!(self, Self::InvalidPeer(_))
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// The account a transport is logged in as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub user_id: UserId,
    pub display_name: String,
    pub username: Option<String>,
}

/// Chat metadata returned by [`Transport::get_chat`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInfo {
    pub id: ChatId,
    pub kind: ChatKind,
    pub title: Option<String>,
    pub username: Option<String>,
    pub description: Option<String>,
    pub member_count: Option<u32>,
}

/// Member rights applied by restrict and set-permissions operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatRights {
    pub can_send_messages: bool,
    pub can_send_media: bool,
    pub can_send_other: bool,
    pub can_invite_users: bool,
}

impl ChatRights {
    /// Everything allowed.
    pub fn open() -> Self {
        Self {
            can_send_messages: true,
            can_send_media: true,
            can_send_other: true,
            can_invite_users: true,
        }
    }

    /// Nothing allowed (mute).
    pub fn muted() -> Self {
        Self {
            can_send_messages: false,
            can_send_media: false,
            can_send_other: false,
            can_invite_users: false,
        }
    }
}

/// A connected chat client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The account this transport acts as.
    fn identity(&self) -> ClientIdentity;

    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId>;

    async fn send_photo(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId>;

    async fn send_document(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId>;

    async fn send_audio(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId>;

    async fn send_video(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId>;

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> TransportResult<()>;

    async fn delete_message(&self, chat: ChatId, message: MessageId) -> TransportResult<()>;

    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message: MessageId,
    ) -> TransportResult<MessageId>;

    async fn copy_message(
        &self,
        to: ChatId,
        from: ChatId,
        message: MessageId,
    ) -> TransportResult<MessageId>;

    async fn pin_message(&self, chat: ChatId, message: MessageId) -> TransportResult<()>;

    async fn get_chat(&self, chat: ChatId) -> TransportResult<ChatInfo>;

    /// The most recent `limit` messages of a chat, oldest first.
    async fn chat_history(
        &self,
        _chat: ChatId,
        _limit: usize,
    ) -> TransportResult<Vec<HistoryMessage>> {
        Err(TransportError::Unsupported("chat_history"))
    }

    /// Downloads the bytes of an attached media item.
    async fn download_media(&self, media: &MediaKind) -> TransportResult<Vec<u8>>;

    async fn set_chat_permissions(&self, chat: ChatId, rights: ChatRights) -> TransportResult<()>;

    async fn set_chat_title(&self, chat: ChatId, title: &str) -> TransportResult<()>;

    async fn set_chat_description(&self, chat: ChatId, description: &str) -> TransportResult<()>;

    async fn ban_member(&self, chat: ChatId, user: UserId) -> TransportResult<()>;

    async fn unban_member(&self, chat: ChatId, user: UserId) -> TransportResult<()>;

    async fn restrict_member(
        &self,
        chat: ChatId,
        user: UserId,
        rights: ChatRights,
        until: Option<DateTime<Utc>>,
    ) -> TransportResult<()>;

    async fn promote_member(&self, chat: ChatId, user: UserId) -> TransportResult<()>;

    async fn leave_chat(&self, chat: ChatId) -> TransportResult<()>;

    /// Joins the chat's voice call and starts streaming `source`.
    async fn voice_join(&self, _chat: ChatId, _source: &str) -> TransportResult<()> {
        Err(TransportError::Unsupported("voice_join"))
    }

    async fn voice_leave(&self, _chat: ChatId) -> TransportResult<()> {
        Err(TransportError::Unsupported("voice_leave"))
    }

    async fn voice_pause(&self, _chat: ChatId) -> TransportResult<()> {
        Err(TransportError::Unsupported("voice_pause"))
    }

    async fn voice_resume(&self, _chat: ChatId) -> TransportResult<()> {
        Err(TransportError::Unsupported("voice_resume"))
    }
}

/// A running assistant and the transport it speaks through.
#[derive(Clone)]
pub struct ClientHandle {
    pub assistant: Assistant,
    pub transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("assistant", &self.assistant.id)
            .finish_non_exhaustive()
    }
}

/// Read access to the running assistant clients.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// All running clients, in start order.
    async fn clients(&self) -> Vec<ClientHandle>;

    /// The running client for `assistant_id`, if any.
    async fn client(&self, assistant_id: &str) -> Option<ClientHandle> {
        self.clients()
            .await
            .into_iter()
            .find(|c| c.assistant.id == assistant_id)
    }
}
