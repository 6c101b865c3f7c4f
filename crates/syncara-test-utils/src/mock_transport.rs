//! Recording transport for deterministic tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use syncara_core::{
    ChatInfo, ChatRights, ClientIdentity, Transport, TransportError, TransportResult,
};
use syncara_models::{
    ChatId, ChatKind, HistoryMessage, MediaKind, MediaSource, MessageId, UserId,
};
use tokio::sync::Mutex;

/// Kind of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentKind {
    Text,
    Photo,
    Document,
    Audio,
    Video,
}

/// One captured outbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub message_id: MessageId,
    pub chat: ChatId,
    pub kind: SentKind,
    /// Text body, or caption for media.
    pub text: Option<String>,
    pub source: Option<MediaSource>,
    pub reply_to: Option<MessageId>,
}

/// One captured non-send operation, e.g. `ban` or `voice_join`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub op: &'static str,
    pub chat: ChatId,
    pub detail: String,
}

/// A transport that records everything and never touches the network.
///
/// Sends to chats registered with [`refuse_chat`](Self::refuse_chat) fail
/// with `InvalidPeer`; any operation named in [`fail_op`](Self::fail_op)
/// fails with the given error. Voice operations are unsupported unless
/// [`with_voice`](Self::with_voice) is used.
pub struct MockTransport {
    identity: ClientIdentity,
    voice: bool,
    next_id: AtomicI32,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    refused: Mutex<HashSet<ChatId>>,
    failures: Mutex<HashMap<&'static str, TransportError>>,
    history: Mutex<HashMap<ChatId, Vec<HistoryMessage>>>,
    download: Mutex<Option<TransportResult<Vec<u8>>>>,
}

impl MockTransport {
    pub fn new(user_id: i64, display_name: &str, username: &str) -> Self {
        Self {
            identity: ClientIdentity {
                user_id: UserId(user_id),
                display_name: display_name.to_string(),
                username: Some(username.to_string()),
            },
            voice: false,
            next_id: AtomicI32::new(1000),
            sent: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            refused: Mutex::new(HashSet::new()),
            failures: Mutex::new(HashMap::new()),
            history: Mutex::new(HashMap::new()),
            download: Mutex::new(None),
        }
    }

    /// Enable voice-call operations.
    pub fn with_voice(mut self) -> Self {
        self.voice = true;
        self
    }

    /// Make every send to `chat` fail with `InvalidPeer`.
    pub async fn refuse_chat(&self, chat: ChatId) {
        self.refused.lock().await.insert(chat);
    }

    /// Make operation `op` (e.g. `"send_photo"`, `"ban_member"`) fail.
    pub async fn fail_op(&self, op: &'static str, error: TransportError) {
        self.failures.lock().await.insert(op, error);
    }

    pub async fn set_history(&self, chat: ChatId, messages: Vec<HistoryMessage>) {
        self.history.lock().await.insert(chat, messages);
    }

    /// Result returned by `download_media`.
    pub async fn set_download(&self, result: TransportResult<Vec<u8>>) {
        *self.download.lock().await = Some(result);
    }

    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_to(&self, chat: ChatId) -> Vec<SentMessage> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|m| m.chat == chat)
            .cloned()
            .collect()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    pub async fn clear_sent(&self) {
        self.sent.lock().await.clear();
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    async fn check(&self, op: &'static str, chat: ChatId) -> TransportResult<()> {
        if let Some(err) = self.failures.lock().await.get(op) {
            return Err(err.clone());
        }
        if op.starts_with("send_") && self.refused.lock().await.contains(&chat) {
            return Err(TransportError::InvalidPeer(format!("chat {} refused", chat)));
        }
        Ok(())
    }

    async fn record_send(
        &self,
        op: &'static str,
        chat: ChatId,
        kind: SentKind,
        text: Option<&str>,
        source: Option<MediaSource>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        self.check(op, chat).await?;
        let message_id = MessageId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().await.push(SentMessage {
            message_id,
            chat,
            kind,
            text: text.map(str::to_string),
            source,
            reply_to,
        });
        Ok(message_id)
    }

    async fn record_call(
        &self,
        op: &'static str,
        chat: ChatId,
        detail: impl Into<String>,
    ) -> TransportResult<()> {
        self.check(op, chat).await?;
        self.calls.lock().await.push(RecordedCall {
            op,
            chat,
            detail: detail.into(),
        });
        Ok(())
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn identity(&self) -> ClientIdentity {
        self.identity.clone()
    }

    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        self.record_send("send_text", chat, SentKind::Text, Some(text), None, reply_to)
            .await
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        self.record_send("send_photo", chat, SentKind::Photo, caption, Some(source), reply_to)
            .await
    }

    async fn send_document(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        self.record_send("send_document", chat, SentKind::Document, caption, Some(source), reply_to)
            .await
    }

    async fn send_audio(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        self.record_send("send_audio", chat, SentKind::Audio, caption, Some(source), reply_to)
            .await
    }

    async fn send_video(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        self.record_send("send_video", chat, SentKind::Video, caption, Some(source), reply_to)
            .await
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> TransportResult<()> {
        self.record_call("edit_text", chat, format!("{}:{}", message, text))
            .await
    }

    async fn delete_message(&self, chat: ChatId, message: MessageId) -> TransportResult<()> {
        self.record_call("delete_message", chat, message.to_string()).await
    }

    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message: MessageId,
    ) -> TransportResult<MessageId> {
        self.record_call("forward_message", to, format!("{}:{}", from, message))
            .await?;
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn copy_message(
        &self,
        to: ChatId,
        from: ChatId,
        message: MessageId,
    ) -> TransportResult<MessageId> {
        self.record_call("copy_message", to, format!("{}:{}", from, message))
            .await?;
        Ok(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn pin_message(&self, chat: ChatId, message: MessageId) -> TransportResult<()> {
        self.record_call("pin_message", chat, message.to_string()).await
    }

    async fn get_chat(&self, chat: ChatId) -> TransportResult<ChatInfo> {
        self.check("get_chat", chat).await?;
        let kind = if chat.0 > 0 {
            ChatKind::Private
        } else {
            ChatKind::Group
        };
        Ok(ChatInfo {
            id: chat,
            kind,
            title: (kind == ChatKind::Group).then(|| "Test Group".to_string()),
            username: None,
            description: None,
            member_count: Some(3),
        })
    }

    async fn chat_history(
        &self,
        chat: ChatId,
        limit: usize,
    ) -> TransportResult<Vec<HistoryMessage>> {
        self.check("chat_history", chat).await?;
        let history = self.history.lock().await;
        let messages = history.get(&chat).cloned().unwrap_or_default();
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    async fn download_media(&self, _media: &MediaKind) -> TransportResult<Vec<u8>> {
        match self.download.lock().await.clone() {
            Some(result) => result,
            None => Ok(vec![0xFF, 0xD8, 0xFF]),
        }
    }

    async fn set_chat_permissions(&self, chat: ChatId, rights: ChatRights) -> TransportResult<()> {
        self.record_call("set_chat_permissions", chat, format!("{:?}", rights))
            .await
    }

    async fn set_chat_title(&self, chat: ChatId, title: &str) -> TransportResult<()> {
        self.record_call("set_chat_title", chat, title).await
    }

    async fn set_chat_description(&self, chat: ChatId, description: &str) -> TransportResult<()> {
        self.record_call("set_chat_description", chat, description).await
    }

    async fn ban_member(&self, chat: ChatId, user: UserId) -> TransportResult<()> {
        self.record_call("ban_member", chat, user.to_string()).await
    }

    async fn unban_member(&self, chat: ChatId, user: UserId) -> TransportResult<()> {
        self.record_call("unban_member", chat, user.to_string()).await
    }

    async fn restrict_member(
        &self,
        chat: ChatId,
        user: UserId,
        rights: ChatRights,
        until: Option<DateTime<Utc>>,
    ) -> TransportResult<()> {
        let detail = format!(
            "{}:{}:{}",
            user,
            rights.can_send_messages,
            until.map(|u| u.to_rfc3339()).unwrap_or_default()
        );
        self.record_call("restrict_member", chat, detail).await
    }

    async fn promote_member(&self, chat: ChatId, user: UserId) -> TransportResult<()> {
        self.record_call("promote_member", chat, user.to_string()).await
    }

    async fn leave_chat(&self, chat: ChatId) -> TransportResult<()> {
        self.record_call("leave_chat", chat, "").await
    }

    async fn voice_join(&self, chat: ChatId, source: &str) -> TransportResult<()> {
        if !self.voice {
            return Err(TransportError::Unsupported("voice_join"));
        }
        self.record_call("voice_join", chat, source).await
    }

    async fn voice_leave(&self, chat: ChatId) -> TransportResult<()> {
        if !self.voice {
            return Err(TransportError::Unsupported("voice_leave"));
        }
        self.record_call("voice_leave", chat, "").await
    }

    async fn voice_pause(&self, chat: ChatId) -> TransportResult<()> {
        if !self.voice {
            return Err(TransportError::Unsupported("voice_pause"));
        }
        self.record_call("voice_pause", chat, "").await
    }

    async fn voice_resume(&self, chat: ChatId) -> TransportResult<()> {
        if !self.voice {
            return Err(TransportError::Unsupported("voice_resume"));
        }
        self.record_call("voice_resume", chat, "").await
    }
}
