//! Chat administration: `GROUP:*` and `USER:*`.
//!
//! Thin passes to the transport's admin operations on the triggering chat.
//! Anything that changes the chat or its members is owner-only;
//! `GROUP:INFO` and `USER:INFO` are open to everyone.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use syncara_core::ChatRights;
use syncara_memory::{LearningStore, UserContext};
use syncara_models::{MessageId, UserId};
use syncara_shortcode::{
    split_params, HandlerContext, HandlerOutcome, ShortcodeHandler, ShortcodeRegistry,
};
use tracing::info;

use crate::error::{HandlerError, Result};
use crate::settle;

/// Mute length when `USER:MUTE` gives no duration.
const DEFAULT_MUTE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupAction {
    Info,
    Title,
    Description,
    Pin,
    Delete,
    Lock,
    Unlock,
    Leave,
}

impl GroupAction {
    fn owner_only(self) -> bool {
        !matches!(self, Self::Info)
    }
}

pub struct GroupHandler {
    action: GroupAction,
}

impl GroupHandler {
    pub fn new(action: GroupAction) -> Self {
        Self { action }
    }

    async fn run(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        if self.action.owner_only() && !ctx.is_owner {
            return Err(HandlerError::NotOwner);
        }
        let chat = ctx.chat();
        let transport = &ctx.transport;
        match self.action {
            GroupAction::Info => {
                let info = transport.get_chat(chat).await?;
                let mut text = format!(
                    "ℹ️ {}\nID: {}\nJenis: {:?}",
                    info.title.as_deref().unwrap_or("(tanpa judul)"),
                    info.id,
                    info.kind
                );
                if let Some(username) = &info.username {
                    text.push_str(&format!("\nUsername: @{}", username));
                }
                if let Some(count) = info.member_count {
                    text.push_str(&format!("\nAnggota: {}", count));
                }
                if let Some(description) = info.description.as_deref().filter(|d| !d.is_empty()) {
                    text.push_str(&format!("\nDeskripsi: {}", description));
                }
                return Ok(ctx.defer_text(text).await);
            }
            GroupAction::Title => transport.set_chat_title(chat, required(params, "title")?).await?,
            GroupAction::Description => transport.set_chat_description(chat, params.trim()).await?,
            GroupAction::Pin => transport.pin_message(chat, message_id(params, ctx)?).await?,
            GroupAction::Delete => transport.delete_message(chat, message_id(params, ctx)?).await?,
            GroupAction::Lock => transport.set_chat_permissions(chat, ChatRights::muted()).await?,
            GroupAction::Unlock => transport.set_chat_permissions(chat, ChatRights::open()).await?,
            GroupAction::Leave => transport.leave_chat(chat).await?,
        }
        info!(chat_id = %chat, action = ?self.action, "Group admin action");
        Ok(HandlerOutcome::Handled)
    }
}

#[async_trait]
impl ShortcodeHandler for GroupHandler {
    async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome {
        settle("GROUP", self.run(ctx, params).await)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Info,
    Ban,
    Unban,
    Kick,
    Mute,
    Unmute,
    Promote,
}

pub struct UserHandler {
    learning: Arc<LearningStore>,
    action: UserAction,
}

impl UserHandler {
    pub fn new(learning: Arc<LearningStore>, action: UserAction) -> Self {
        Self { learning, action }
    }

    async fn run(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        let parts = split_params(params);
        let is_info = self.action == UserAction::Info;
        let user = target_user(parts.first().copied(), ctx, is_info)?;
        if !is_info && !ctx.is_owner {
            return Err(HandlerError::NotOwner);
        }

        let chat = ctx.chat();
        let transport = &ctx.transport;
        match self.action {
            UserAction::Info => return Ok(ctx.defer_text(self.describe(user).await).await),
            UserAction::Ban => transport.ban_member(chat, user).await?,
            UserAction::Unban => transport.unban_member(chat, user).await?,
            UserAction::Kick => {
                transport.ban_member(chat, user).await?;
                transport.unban_member(chat, user).await?;
            }
            UserAction::Mute => {
                let minutes = match parts.get(1) {
                    Some(m) => m
                        .parse::<i64>()
                        .ok()
                        .filter(|m| *m > 0)
                        .ok_or_else(|| HandlerError::invalid(format!("bad minutes '{}'", m)))?,
                    None => DEFAULT_MUTE_MINUTES,
                };
                let until = ctx.now + Duration::minutes(minutes);
                transport
                    .restrict_member(chat, user, ChatRights::muted(), Some(until))
                    .await?
            }
            UserAction::Unmute => {
                transport
                    .restrict_member(chat, user, ChatRights::open(), None)
                    .await?
            }
            UserAction::Promote => transport.promote_member(chat, user).await?,
        }
        info!(chat_id = %chat, user_id = %user, action = ?self.action, "User admin action");
        Ok(HandlerOutcome::Handled)
    }

    async fn describe(&self, user: UserId) -> String {
        let Some(profile) = self.learning.get_profile(user).await else {
            return format!("👤 Pengguna {} belum pernah berinteraksi.", user);
        };
        let context = UserContext::from_profile(&profile, 5);
        let mut text = format!(
            "👤 {} ({})\nInteraksi: {}\nTerakhir aktif: {}\nPreferensi: {}",
            profile.label(),
            profile.user_id,
            context.interaction_summary(),
            profile.last_interaction.format("%Y-%m-%d %H:%M UTC"),
            context.preference_summary()
        );
        if let Some(assistant) = profile.favorite_assistant() {
            text.push_str(&format!("\nAsisten favorit: {}", assistant));
        }
        if profile.unreachable {
            text.push_str("\nDM: tidak bisa dihubungi");
        }
        text
    }
}

#[async_trait]
impl ShortcodeHandler for UserHandler {
    async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome {
        settle("USER", self.run(ctx, params).await)
    }
}

fn required<'a>(params: &'a str, what: &str) -> Result<&'a str> {
    let value = params.trim();
    if value.is_empty() {
        return Err(HandlerError::invalid(format!("missing {}", what)));
    }
    Ok(value)
}

/// Explicit id, else the replied-to message.
fn message_id(params: &str, ctx: &HandlerContext) -> Result<MessageId> {
    match params.trim() {
        "" => ctx
            .message
            .reply_to_message
            .ok_or_else(|| HandlerError::invalid("missing message id")),
        id => id
            .parse()
            .map(MessageId)
            .map_err(|_| HandlerError::invalid(format!("bad message id '{}'", id))),
    }
}

/// Explicit id, else the author of the replied-to message, else (when
/// allowed) the sender.
fn target_user(param: Option<&str>, ctx: &HandlerContext, default_to_sender: bool) -> Result<UserId> {
    match param.map(|p| p.trim_start_matches('@')) {
        Some(id) => id
            .parse()
            .map(UserId)
            .map_err(|_| HandlerError::invalid(format!("bad user id '{}'", id))),
        None => match &ctx.message.reply_to_sender {
            Some(sender) => Ok(sender.id),
            None if default_to_sender => Ok(ctx.message.sender.id),
            None => Err(HandlerError::invalid("missing user id")),
        },
    }
}

pub fn register(
    registry: &mut ShortcodeRegistry,
    learning: &Arc<LearningStore>,
) -> syncara_shortcode::Result<()> {
    let groups = [
        ("GROUP:INFO", "GROUP:INFO", "Info chat ini", GroupAction::Info),
        ("GROUP:TITLE", "GROUP:TITLE:judul", "Ganti judul grup (owner)", GroupAction::Title),
        (
            "GROUP:DESCRIPTION",
            "GROUP:DESCRIPTION:teks",
            "Ganti deskripsi grup (owner)",
            GroupAction::Description,
        ),
        (
            "GROUP:PIN",
            "GROUP:PIN:message_id",
            "Pin pesan; tanpa id memakai pesan yang dibalas (owner)",
            GroupAction::Pin,
        ),
        (
            "GROUP:DELETE",
            "GROUP:DELETE:message_id",
            "Hapus pesan; tanpa id memakai pesan yang dibalas (owner)",
            GroupAction::Delete,
        ),
        ("GROUP:LOCK", "GROUP:LOCK", "Kunci grup, hanya admin bisa kirim (owner)", GroupAction::Lock),
        ("GROUP:UNLOCK", "GROUP:UNLOCK", "Buka kunci grup (owner)", GroupAction::Unlock),
        ("GROUP:LEAVE", "GROUP:LEAVE", "Keluar dari grup (owner)", GroupAction::Leave),
    ];
    for (key, usage, description, action) in groups {
        registry.register(key, usage, description, Arc::new(GroupHandler::new(action)))?;
    }

    let users = [
        (
            "USER:INFO",
            "USER:INFO:user_id",
            "Profil pengguna yang dipelajari; tanpa id memakai pengirim",
            UserAction::Info,
        ),
        ("USER:BAN", "USER:BAN:user_id", "Ban anggota (owner)", UserAction::Ban),
        ("USER:UNBAN", "USER:UNBAN:user_id", "Cabut ban (owner)", UserAction::Unban),
        ("USER:KICK", "USER:KICK:user_id", "Keluarkan anggota (owner)", UserAction::Kick),
        (
            "USER:MUTE",
            "USER:MUTE:user_id|menit",
            "Bisukan anggota, default 60 menit (owner)",
            UserAction::Mute,
        ),
        ("USER:UNMUTE", "USER:UNMUTE:user_id", "Cabut bisu (owner)", UserAction::Unmute),
        ("USER:PROMOTE", "USER:PROMOTE:user_id", "Jadikan admin (owner)", UserAction::Promote),
    ];
    for (key, usage, description, action) in users {
        registry.register(
            key,
            usage,
            description,
            Arc::new(UserHandler::new(learning.clone(), action)),
        )?;
    }
    Ok(())
}
