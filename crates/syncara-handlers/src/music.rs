//! Voice-chat music: `MUSIC:PLAY|PAUSE|RESUME|STOP|NOW`.
//!
//! Playback goes through the transport's voice-call operations. When the
//! session cannot join voice calls and the track is a URL, the track is
//! sent as an audio file instead.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use syncara_core::TransportError;
use syncara_models::{ChatId, MediaSource, SideEffectPayload};
use syncara_shortcode::{HandlerContext, HandlerOutcome, ShortcodeHandler, ShortcodeRegistry};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{HandlerError, Result};
use crate::media::parse_http_url;
use crate::settle;

/// What is playing in a chat's voice call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NowPlaying {
    pub title: String,
    pub source: String,
    pub paused: bool,
    pub started_at: DateTime<Utc>,
    pub requested_by: String,
}

/// Per-chat playback state shared by the music handlers.
#[derive(Default)]
pub struct MusicPlayer {
    playing: Mutex<HashMap<ChatId, NowPlaying>>,
}

impl MusicPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn now_playing(&self, chat: ChatId) -> Option<NowPlaying> {
        self.playing.lock().await.get(&chat).cloned()
    }

    async fn set(&self, chat: ChatId, track: NowPlaying) {
        self.playing.lock().await.insert(chat, track);
    }

    async fn set_paused(&self, chat: ChatId, paused: bool) {
        if let Some(track) = self.playing.lock().await.get_mut(&chat) {
            track.paused = paused;
        }
    }

    async fn clear(&self, chat: ChatId) -> Option<NowPlaying> {
        self.playing.lock().await.remove(&chat)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicAction {
    Play,
    Pause,
    Resume,
    Stop,
    Now,
}

pub struct MusicHandler {
    player: Arc<MusicPlayer>,
    action: MusicAction,
}

impl MusicHandler {
    pub fn new(player: Arc<MusicPlayer>, action: MusicAction) -> Self {
        Self { player, action }
    }

    async fn run(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        let chat = ctx.chat();
        match self.action {
            MusicAction::Play => self.play(ctx, params.trim()).await,
            MusicAction::Pause => {
                self.require_playing(chat).await?;
                ctx.transport.voice_pause(chat).await?;
                self.player.set_paused(chat, true).await;
                Ok(HandlerOutcome::Handled)
            }
            MusicAction::Resume => {
                self.require_playing(chat).await?;
                ctx.transport.voice_resume(chat).await?;
                self.player.set_paused(chat, false).await;
                Ok(HandlerOutcome::Handled)
            }
            MusicAction::Stop => {
                self.require_playing(chat).await?;
                ctx.transport.voice_leave(chat).await?;
                self.player.clear(chat).await;
                Ok(HandlerOutcome::Handled)
            }
            MusicAction::Now => {
                let text = match self.player.now_playing(chat).await {
                    Some(track) => format!(
                        "🎵 {}: {}\nDiminta oleh {}",
                        if track.paused { "Dijeda" } else { "Sedang diputar" },
                        track.title,
                        track.requested_by
                    ),
                    None => "🎵 Tidak ada lagu yang sedang diputar.".to_string(),
                };
                Ok(ctx.defer_text(text).await)
            }
        }
    }

    async fn play(&self, ctx: &HandlerContext, query: &str) -> Result<HandlerOutcome> {
        if query.is_empty() {
            return Err(HandlerError::invalid("missing track"));
        }
        let chat = ctx.chat();
        let url = parse_http_url(query).ok();
        let title = url
            .as_ref()
            .and_then(|u| u.path_segments()?.next_back().map(str::to_string))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| query.to_string());

        match ctx.transport.voice_join(chat, query).await {
            Ok(()) => {
                self.player
                    .set(
                        chat,
                        NowPlaying {
                            title: title.clone(),
                            source: query.to_string(),
                            paused: false,
                            started_at: ctx.now,
                            requested_by: ctx.message.sender.display_name(),
                        },
                    )
                    .await;
                info!(chat_id = %chat, title = %title, "Voice playback started");
                Ok(HandlerOutcome::Handled)
            }
            Err(TransportError::Unsupported(_)) => match url {
                Some(url) => {
                    debug!(chat_id = %chat, "Voice calls unsupported, sending audio file");
                    let payload = SideEffectPayload::Audio {
                        source: MediaSource::url(url.as_str()),
                        caption: Some(format!("🎵 {}", title)),
                    };
                    Ok(ctx.defer(payload).await)
                }
                None => Err(HandlerError::invalid(
                    "voice calls unsupported and track is not a URL",
                )),
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn require_playing(&self, chat: ChatId) -> Result<NowPlaying> {
        self.player
            .now_playing(chat)
            .await
            .ok_or_else(|| HandlerError::NotFound("nothing playing".to_string()))
    }
}

#[async_trait]
impl ShortcodeHandler for MusicHandler {
    async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome {
        settle("MUSIC", self.run(ctx, params).await)
    }
}

pub fn register(
    registry: &mut ShortcodeRegistry,
    player: &Arc<MusicPlayer>,
) -> syncara_shortcode::Result<()> {
    let entries = [
        (
            "MUSIC:PLAY",
            "MUSIC:PLAY:judul atau url",
            "Putar lagu di voice chat (atau kirim file audio)",
            MusicAction::Play,
        ),
        ("MUSIC:PAUSE", "MUSIC:PAUSE", "Jeda lagu", MusicAction::Pause),
        ("MUSIC:RESUME", "MUSIC:RESUME", "Lanjutkan lagu", MusicAction::Resume),
        ("MUSIC:STOP", "MUSIC:STOP", "Hentikan lagu dan keluar dari voice chat", MusicAction::Stop),
        ("MUSIC:NOW", "MUSIC:NOW", "Lagu yang sedang diputar", MusicAction::Now),
    ];
    for (key, usage, description, action) in entries {
        registry.register(key, usage, description, Arc::new(MusicHandler::new(player.clone(), action)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context_with;
    use syncara_test_utils::MockTransport;

    #[tokio::test]
    async fn test_play_pause_stop_with_voice() {
        let transport = Arc::new(MockTransport::new(1, "Aeris", "Aeris_sync").with_voice());
        let ctx = context_with(transport.clone(), false);
        let player = Arc::new(MusicPlayer::new());
        let handler = |action| MusicHandler::new(player.clone(), action);

        assert_eq!(handler(MusicAction::Play).handle(&ctx, "lofi beats").await, HandlerOutcome::Handled);
        let track = player.now_playing(ctx.chat()).await.unwrap();
        assert_eq!(track.title, "lofi beats");

        assert_eq!(handler(MusicAction::Pause).handle(&ctx, "").await, HandlerOutcome::Handled);
        assert!(player.now_playing(ctx.chat()).await.unwrap().paused);

        assert_eq!(handler(MusicAction::Stop).handle(&ctx, "").await, HandlerOutcome::Handled);
        assert!(player.now_playing(ctx.chat()).await.is_none());

        let ops: Vec<_> = transport.calls().await.into_iter().map(|c| c.op).collect();
        assert_eq!(ops, vec!["voice_join", "voice_pause", "voice_leave"]);
    }

    #[tokio::test]
    async fn test_url_falls_back_to_audio_without_voice() {
        let transport = Arc::new(MockTransport::new(1, "Aeris", "Aeris_sync"));
        let ctx = context_with(transport, false);
        let player = Arc::new(MusicPlayer::new());
        let play = MusicHandler::new(player.clone(), MusicAction::Play);

        let outcome = play.handle(&ctx, "https://example.com/music/song.mp3").await;
        let effect = ctx.deferred.get(outcome.deferred_id().unwrap()).await.unwrap();
        assert!(matches!(
            effect.payload,
            SideEffectPayload::Audio { caption: Some(ref c), .. } if c == "🎵 song.mp3"
        ));
        assert!(player.now_playing(ctx.chat()).await.is_none());

        // a search query cannot fall back
        assert_eq!(play.handle(&ctx, "lofi beats").await, HandlerOutcome::Failed);
    }

    #[tokio::test]
    async fn test_pause_without_track_fails() {
        let transport = Arc::new(MockTransport::new(1, "Aeris", "Aeris_sync").with_voice());
        let ctx = context_with(transport, false);
        let pause = MusicHandler::new(Arc::new(MusicPlayer::new()), MusicAction::Pause);
        assert_eq!(pause.handle(&ctx, "").await, HandlerOutcome::Failed);
    }
}
