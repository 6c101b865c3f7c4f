//! [`Transport`] over the Telegram Bot API.
//!
//! The Bot API has no history endpoint, so the transport keeps a bounded
//! per-chat cache of messages it has seen or sent and serves
//! [`Transport::chat_history`] from it.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use syncara_core::{ChatInfo, ChatRights, ClientIdentity, Transport, TransportError, TransportResult};
use syncara_models::{
    ChatId, HistoryMessage, InboundMessage, MediaKind, MediaSource, MessageId, UserId,
};
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{
    ChatPermissions, InputFile, Me, MessageId as TgMessageId, ReplyParameters,
    UserId as TgUserId,
};
use teloxide::{ApiError, RequestError};
use tracing::debug;

use crate::convert::chat_kind;

/// Messages kept per chat for history reads.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Bounded per-chat window of recent messages.
#[derive(Debug)]
pub struct HistoryCache {
    chats: Mutex<HashMap<ChatId, VecDeque<HistoryMessage>>>,
    limit: usize,
}

impl HistoryCache {
    pub fn new(limit: usize) -> Self {
        Self {
            chats: Mutex::new(HashMap::new()),
            limit: limit.max(1),
        }
    }

    pub fn push(&self, chat: ChatId, entry: HistoryMessage) {
        let Ok(mut chats) = self.chats.lock() else {
            return;
        };
        let window = chats.entry(chat).or_default();
        window.push_back(entry);
        while window.len() > self.limit {
            window.pop_front();
        }
    }

    pub fn forget(&self, chat: ChatId, message: MessageId) {
        if let Ok(mut chats) = self.chats.lock() {
            if let Some(window) = chats.get_mut(&chat) {
                window.retain(|m| m.id != message);
            }
        }
    }

    /// The last `limit` messages of `chat`, oldest first.
    pub fn recent(&self, chat: ChatId, limit: usize) -> Vec<HistoryMessage> {
        let Ok(chats) = self.chats.lock() else {
            return Vec::new();
        };
        chats
            .get(&chat)
            .map(|window| {
                let skip = window.len().saturating_sub(limit);
                window.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default()
    }
}

pub struct TeloxideTransport {
    bot: Bot,
    identity: ClientIdentity,
    history: HistoryCache,
}

impl TeloxideTransport {
    pub fn new(bot: Bot, me: &Me) -> Self {
        let identity = ClientIdentity {
            user_id: UserId(me.id.0 as i64),
            display_name: me.user.full_name(),
            username: me.user.username.clone(),
        };
        Self {
            bot,
            identity,
            history: HistoryCache::new(DEFAULT_HISTORY_LIMIT),
        }
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history = HistoryCache::new(limit);
        self
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Records an inbound message in the history cache.
    pub fn observe(&self, msg: &InboundMessage) {
        self.history.push(msg.chat_id, HistoryMessage::from(msg));
    }

    fn remember_outbound(&self, chat: ChatId, id: MessageId, text: &str, reply_to: Option<MessageId>) {
        self.history.push(
            chat,
            HistoryMessage {
                id,
                sender_id: self.identity.user_id,
                sender_name: self.identity.display_name.clone(),
                date: Utc::now(),
                text: text.to_string(),
                reply_to,
            },
        );
    }
}

fn tg_chat(chat: ChatId) -> teloxide::types::ChatId {
    teloxide::types::ChatId(chat.0)
}

fn tg_message(message: MessageId) -> TgMessageId {
    TgMessageId(message.0)
}

fn tg_user(user: UserId) -> TgUserId {
    TgUserId(user.0 as u64)
}

fn input_file(source: MediaSource) -> TransportResult<InputFile> {
    match source {
        MediaSource::Url { url } => url::Url::parse(&url)
            .map(InputFile::url)
            .map_err(|e| TransportError::Api(format!("invalid media url {}: {}", url, e))),
        MediaSource::Bytes { file_name, data } => Ok(InputFile::memory(data).file_name(file_name)),
    }
}

fn permissions(rights: ChatRights) -> ChatPermissions {
    let mut perms = ChatPermissions::empty();
    if rights.can_send_messages {
        perms |= ChatPermissions::SEND_MESSAGES;
    }
    if rights.can_send_media {
        perms |= ChatPermissions::SEND_AUDIOS
            | ChatPermissions::SEND_DOCUMENTS
            | ChatPermissions::SEND_PHOTOS
            | ChatPermissions::SEND_VIDEOS
            | ChatPermissions::SEND_VIDEO_NOTES
            | ChatPermissions::SEND_VOICE_NOTES;
    }
    if rights.can_send_other {
        perms |= ChatPermissions::SEND_POLLS
            | ChatPermissions::SEND_OTHER_MESSAGES
            | ChatPermissions::ADD_WEB_PAGE_PREVIEWS;
    }
    if rights.can_invite_users {
        perms |= ChatPermissions::INVITE_USERS;
    }
    perms
}

fn file_id(media: &MediaKind) -> TransportResult<&str> {
    match media {
        MediaKind::Photo { file_id }
        | MediaKind::Document { file_id, .. }
        | MediaKind::Audio { file_id }
        | MediaKind::Video { file_id }
        | MediaKind::Voice { file_id } => Ok(file_id),
        MediaKind::Sticker { .. } => Err(TransportError::Unsupported("sticker download")),
    }
}

/// Maps a Bot API failure onto the transport error taxonomy.
pub fn map_request_error(err: RequestError) -> TransportError {
    match err {
        RequestError::Api(api) => map_api_error(api),
        RequestError::RetryAfter(secs) => TransportError::RateLimited {
            retry_after_secs: u64::from(secs.seconds()),
        },
        RequestError::Network(e) => TransportError::Network(e.to_string()),
        RequestError::Io(e) => TransportError::Network(e.to_string()),
        other => TransportError::Api(other.to_string()),
    }
}

pub fn map_api_error(err: ApiError) -> TransportError {
    match err {
        ApiError::BotBlocked
        | ApiError::UserDeactivated
        | ApiError::CantInitiateConversation
        | ApiError::CantTalkWithBots
        | ApiError::ChatNotFound => TransportError::InvalidPeer(err.to_string()),
        ApiError::BotKicked | ApiError::BotKickedFromSupergroup => {
            TransportError::Forbidden(err.to_string())
        }
        ApiError::MessageCantBeEdited | ApiError::MessageCantBeDeleted => {
            TransportError::MessageTooOld
        }
        ApiError::MessageToEditNotFound
        | ApiError::MessageToDeleteNotFound
        | ApiError::MessageToForwardNotFound
        | ApiError::MessageIdInvalid
        | ApiError::UserNotFound => TransportError::NotFound(err.to_string()),
        other => TransportError::Api(other.to_string()),
    }
}

#[async_trait]
impl Transport for TeloxideTransport {
    fn identity(&self) -> ClientIdentity {
        self.identity.clone()
    }

    async fn send_text(
        &self,
        chat: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        let mut req = self.bot.send_message(tg_chat(chat), text);
        if let Some(id) = reply_to {
            req = req.reply_parameters(ReplyParameters::new(tg_message(id)));
        }
        let sent = req.await.map_err(map_request_error)?;
        let id = MessageId(sent.id.0);
        self.remember_outbound(chat, id, text, reply_to);
        Ok(id)
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        let mut req = self.bot.send_photo(tg_chat(chat), input_file(source)?);
        if let Some(caption) = caption {
            req = req.caption(caption);
        }
        if let Some(id) = reply_to {
            req = req.reply_parameters(ReplyParameters::new(tg_message(id)));
        }
        let sent = req.await.map_err(map_request_error)?;
        let id = MessageId(sent.id.0);
        let body = match caption {
            Some(c) => format!("[photo] {}", c),
            None => "[photo]".to_string(),
        };
        self.remember_outbound(chat, id, &body, reply_to);
        Ok(id)
    }

    async fn send_document(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        let mut req = self.bot.send_document(tg_chat(chat), input_file(source)?);
        if let Some(caption) = caption {
            req = req.caption(caption);
        }
        if let Some(id) = reply_to {
            req = req.reply_parameters(ReplyParameters::new(tg_message(id)));
        }
        let sent = req.await.map_err(map_request_error)?;
        Ok(MessageId(sent.id.0))
    }

    async fn send_audio(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        let mut req = self.bot.send_audio(tg_chat(chat), input_file(source)?);
        if let Some(caption) = caption {
            req = req.caption(caption);
        }
        if let Some(id) = reply_to {
            req = req.reply_parameters(ReplyParameters::new(tg_message(id)));
        }
        let sent = req.await.map_err(map_request_error)?;
        Ok(MessageId(sent.id.0))
    }

    async fn send_video(
        &self,
        chat: ChatId,
        source: MediaSource,
        caption: Option<&str>,
        reply_to: Option<MessageId>,
    ) -> TransportResult<MessageId> {
        let mut req = self.bot.send_video(tg_chat(chat), input_file(source)?);
        if let Some(caption) = caption {
            req = req.caption(caption);
        }
        if let Some(id) = reply_to {
            req = req.reply_parameters(ReplyParameters::new(tg_message(id)));
        }
        let sent = req.await.map_err(map_request_error)?;
        Ok(MessageId(sent.id.0))
    }

    async fn edit_text(&self, chat: ChatId, message: MessageId, text: &str) -> TransportResult<()> {
        self.bot
            .edit_message_text(tg_chat(chat), tg_message(message), text)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn delete_message(&self, chat: ChatId, message: MessageId) -> TransportResult<()> {
        self.bot
            .delete_message(tg_chat(chat), tg_message(message))
            .await
            .map_err(map_request_error)?;
        self.history.forget(chat, message);
        Ok(())
    }

    async fn forward_message(
        &self,
        to: ChatId,
        from: ChatId,
        message: MessageId,
    ) -> TransportResult<MessageId> {
        let sent = self
            .bot
            .forward_message(tg_chat(to), tg_chat(from), tg_message(message))
            .await
            .map_err(map_request_error)?;
        Ok(MessageId(sent.id.0))
    }

    async fn copy_message(
        &self,
        to: ChatId,
        from: ChatId,
        message: MessageId,
    ) -> TransportResult<MessageId> {
        let id = self
            .bot
            .copy_message(tg_chat(to), tg_chat(from), tg_message(message))
            .await
            .map_err(map_request_error)?;
        Ok(MessageId(id.0))
    }

    async fn pin_message(&self, chat: ChatId, message: MessageId) -> TransportResult<()> {
        self.bot
            .pin_chat_message(tg_chat(chat), tg_message(message))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn get_chat(&self, chat: ChatId) -> TransportResult<ChatInfo> {
        let info = self
            .bot
            .get_chat(tg_chat(chat))
            .await
            .map_err(map_request_error)?;
        // Private chats have no member count endpoint.
        let member_count = if info.is_private() {
            None
        } else {
            match self.bot.get_chat_member_count(tg_chat(chat)).await {
                Ok(count) => Some(count),
                Err(e) => {
                    debug!(chat = %chat, error = %e, "member count unavailable");
                    None
                }
            }
        };
        Ok(ChatInfo {
            id: chat,
            kind: chat_kind(&info),
            title: info.title().map(str::to_string),
            username: info.username().map(str::to_string),
            description: info.description().map(str::to_string),
            member_count,
        })
    }

    async fn chat_history(&self, chat: ChatId, limit: usize) -> TransportResult<Vec<HistoryMessage>> {
        Ok(self.history.recent(chat, limit))
    }

    async fn download_media(&self, media: &MediaKind) -> TransportResult<Vec<u8>> {
        let id = file_id(media)?;
        let file = self
            .bot
            .get_file(id.to_string())
            .await
            .map_err(map_request_error)?;
        let mut buf = Vec::new();
        self.bot
            .download_file(&file.path, &mut buf)
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(buf)
    }

    async fn set_chat_permissions(&self, chat: ChatId, rights: ChatRights) -> TransportResult<()> {
        self.bot
            .set_chat_permissions(tg_chat(chat), permissions(rights))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn set_chat_title(&self, chat: ChatId, title: &str) -> TransportResult<()> {
        self.bot
            .set_chat_title(tg_chat(chat), title)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn set_chat_description(&self, chat: ChatId, description: &str) -> TransportResult<()> {
        self.bot
            .set_chat_description(tg_chat(chat))
            .description(description)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn ban_member(&self, chat: ChatId, user: UserId) -> TransportResult<()> {
        self.bot
            .ban_chat_member(tg_chat(chat), tg_user(user))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn unban_member(&self, chat: ChatId, user: UserId) -> TransportResult<()> {
        self.bot
            .unban_chat_member(tg_chat(chat), tg_user(user))
            .only_if_banned(true)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn restrict_member(
        &self,
        chat: ChatId,
        user: UserId,
        rights: ChatRights,
        until: Option<DateTime<Utc>>,
    ) -> TransportResult<()> {
        let mut req = self
            .bot
            .restrict_chat_member(tg_chat(chat), tg_user(user), permissions(rights));
        if let Some(until) = until {
            req = req.until_date(until);
        }
        req.await.map_err(map_request_error)?;
        Ok(())
    }

    async fn promote_member(&self, chat: ChatId, user: UserId) -> TransportResult<()> {
        self.bot
            .promote_chat_member(tg_chat(chat), tg_user(user))
            .can_delete_messages(true)
            .can_restrict_members(true)
            .can_pin_messages(true)
            .can_invite_users(true)
            .await
            .map_err(map_request_error)?;
        Ok(())
    }

    async fn leave_chat(&self, chat: ChatId) -> TransportResult<()> {
        self.bot
            .leave_chat(tg_chat(chat))
            .await
            .map_err(map_request_error)?;
        Ok(())
    }
}
