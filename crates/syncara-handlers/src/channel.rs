//! Channel auto-poster control: `CHANNEL:START|STOP|STATUS|SCHEDULE|POST|STATS`.
//!
//! Every action is owner-only.

use std::sync::Arc;

use async_trait::async_trait;
use syncara_autonomous::{ChannelPoster, PostOutcome};
use syncara_models::PostKind;
use syncara_shortcode::{HandlerContext, HandlerOutcome, ShortcodeHandler, ShortcodeRegistry};
use tracing::info;

use crate::error::{HandlerError, Result};
use crate::settle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelAction {
    Start,
    Stop,
    Status,
    Schedule,
    Post,
    Stats,
}

pub struct ChannelHandler {
    poster: Arc<ChannelPoster>,
    action: ChannelAction,
}

impl ChannelHandler {
    pub fn new(poster: Arc<ChannelPoster>, action: ChannelAction) -> Self {
        Self { poster, action }
    }

    async fn run(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        if !ctx.is_owner {
            return Err(HandlerError::NotOwner);
        }
        match self.action {
            ChannelAction::Start => {
                self.poster.start();
                Ok(HandlerOutcome::Handled)
            }
            ChannelAction::Stop => {
                self.poster.stop();
                Ok(HandlerOutcome::Handled)
            }
            ChannelAction::Status => {
                let status = self.poster.status(ctx.now).await;
                Ok(ctx.defer_text(format!("📢 {}", status.render())).await)
            }
            ChannelAction::Schedule => {
                let lines = self.poster.schedule_lines();
                Ok(ctx.defer_text(format!("🗓️ Jadwal posting:\n{}", lines.join("\n"))).await)
            }
            ChannelAction::Post => {
                let kind: PostKind = params.parse().map_err(HandlerError::InvalidParams)?;
                match self.poster.post_now(kind, ctx.now).await? {
                    PostOutcome::Posted(post) => {
                        info!(%kind, post_id = %post.post_id, "Manual channel post published");
                    }
                    PostOutcome::AlreadyPosted { bucket, .. } => {
                        info!(%kind, bucket = %bucket, "Manual channel post skipped, bucket already posted");
                    }
                }
                Ok(HandlerOutcome::Handled)
            }
            ChannelAction::Stats => {
                let stats = self.poster.stats().await;
                Ok(ctx.defer_text(format!("📊 Statistik channel\n{}", stats.render())).await)
            }
        }
    }
}

#[async_trait]
impl ShortcodeHandler for ChannelHandler {
    async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome {
        settle("CHANNEL", self.run(ctx, params).await)
    }
}

pub fn register(
    registry: &mut ShortcodeRegistry,
    poster: &Arc<ChannelPoster>,
) -> syncara_shortcode::Result<()> {
    let kinds = PostKind::ALL
        .iter()
        .map(|k| k.slug())
        .collect::<Vec<_>>()
        .join("/");
    let post_description = format!("Posting sekarang, jenis: {} (owner)", kinds);
    let entries = [
        ("CHANNEL:START", "CHANNEL:START", "Nyalakan auto-post channel (owner)".to_string(), ChannelAction::Start),
        ("CHANNEL:STOP", "CHANNEL:STOP", "Matikan auto-post channel (owner)".to_string(), ChannelAction::Stop),
        ("CHANNEL:STATUS", "CHANNEL:STATUS", "Status auto-post (owner)".to_string(), ChannelAction::Status),
        ("CHANNEL:SCHEDULE", "CHANNEL:SCHEDULE", "Jadwal posting (owner)".to_string(), ChannelAction::Schedule),
        ("CHANNEL:POST", "CHANNEL:POST:jenis", post_description, ChannelAction::Post),
        ("CHANNEL:STATS", "CHANNEL:STATS", "Statistik post channel (owner)".to_string(), ChannelAction::Stats),
    ];
    for (key, usage, description, action) in entries {
        registry.register(key, usage, description, Arc::new(ChannelHandler::new(poster.clone(), action)))?;
    }
    Ok(())
}
