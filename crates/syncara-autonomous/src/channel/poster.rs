//! Channel auto-poster.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use syncara_agent::{GenerationRequest, LanguageModel};
use syncara_core::{ClientDirectory, ClientHandle};
use syncara_models::{
    ChannelAnalytics, ChannelPost, ChatId, PostKind, PostStatus, TaskKind, TaskStatus,
};
use syncara_persistence::DocumentStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::schedule::{bucket_key, BucketPeriod, ChannelSchedule};
use crate::audit::AuditLog;
use crate::error::{AutonomousError, Result};

const WRITER_PROMPT: &str = "Kamu adalah penulis konten untuk channel Telegram komunitas SyncaraBot. \
Tulis dalam Bahasa Indonesia yang santai dan hangat, maksimal 120 kata, tanpa judul dan tanpa hashtag. \
Jangan gunakan shortcode atau tanda kurung siku.";

/// Result of a posting attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PostOutcome {
    Posted(ChannelPost),
    /// A post of this kind already went out in this bucket.
    AlreadyPosted { kind: PostKind, bucket: String },
}

/// Snapshot for status queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelStatus {
    pub running: bool,
    pub channel_id: Option<ChatId>,
    pub posted_today: usize,
    pub last_post: Option<(PostKind, DateTime<Utc>)>,
}

impl ChannelStatus {
    pub fn render(&self) -> String {
        let state = if self.running { "🟢 aktif" } else { "🔴 berhenti" };
        let channel = self
            .channel_id
            .map(|c| c.to_string())
            .unwrap_or_else(|| "(belum diatur)".to_string());
        let last = match &self.last_post {
            Some((kind, at)) => format!("{} ({})", kind.label(), at.format("%Y-%m-%d %H:%M UTC")),
            None => "-".to_string(),
        };
        format!(
            "Auto-post: {}\nChannel: {}\nPost hari ini: {}\nPost terakhir: {}",
            state, channel, self.posted_today, last
        )
    }
}

/// Aggregates over the post history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelStats {
    pub total: usize,
    pub by_kind: BTreeMap<PostKind, usize>,
    pub posted: usize,
    pub failed: usize,
    pub views: u64,
}

impl ChannelStats {
    pub fn render(&self) -> String {
        let mut out = format!(
            "Total post: {} (terkirim {}, gagal {})\nViews: {}",
            self.total, self.posted, self.failed, self.views
        );
        for (kind, count) in &self.by_kind {
            out.push_str(&format!("\n- {}: {}", kind.label(), count));
        }
        out
    }
}

/// Generates and posts channel content on a calendar schedule.
///
/// Starts stopped. [`tick`](Self::tick) does nothing until
/// [`start`](Self::start) is called. Each kind posts at most once per
/// calendar bucket, and manual [`post_now`](Self::post_now) calls count
/// toward the same bucket.
pub struct ChannelPoster {
    channel_id: Option<ChatId>,
    running: AtomicBool,
    /// Held from the bucket check until the post is settled.
    posting: Mutex<()>,
    schedule: ChannelSchedule,
    model: Arc<dyn LanguageModel>,
    clients: Arc<dyn ClientDirectory>,
    store: Arc<DocumentStore>,
    audit: AuditLog,
    tz: FixedOffset,
    poster_assistant: Option<String>,
}

impl ChannelPoster {
    pub fn new(
        channel_id: Option<ChatId>,
        model: Arc<dyn LanguageModel>,
        clients: Arc<dyn ClientDirectory>,
        store: Arc<DocumentStore>,
        tz: FixedOffset,
    ) -> Self {
        Self {
            channel_id,
            running: AtomicBool::new(false),
            posting: Mutex::new(()),
            schedule: ChannelSchedule::standard(),
            model,
            clients,
            audit: AuditLog::new(store.clone()),
            store,
            tz,
            poster_assistant: None,
        }
    }

    /// Posts through this assistant instead of the first running one.
    pub fn with_poster_assistant(mut self, assistant_id: impl Into<String>) -> Self {
        self.poster_assistant = Some(assistant_id.into());
        self
    }

    pub fn with_schedule(mut self, schedule: ChannelSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Returns `false` if it was already running.
    pub fn start(&self) -> bool {
        let started = !self.running.swap(true, Ordering::SeqCst);
        if started {
            info!(channel_id = ?self.channel_id, "Channel auto-poster started");
        }
        started
    }

    /// Returns `false` if it was already stopped.
    pub fn stop(&self) -> bool {
        let stopped = self.running.swap(false, Ordering::SeqCst);
        if stopped {
            info!("Channel auto-poster stopped");
        }
        stopped
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn schedule(&self) -> &ChannelSchedule {
        &self.schedule
    }

    /// Human-readable schedule, one slot per line.
    pub fn schedule_lines(&self) -> Vec<String> {
        self.schedule.slots().iter().map(|s| s.describe()).collect()
    }

    pub async fn status(&self, now: DateTime<Utc>) -> ChannelStatus {
        let today = bucket_key(BucketPeriod::Day, &now.with_timezone(&self.tz));
        let tz = self.tz;
        let posted_today = self
            .store
            .channel_posts
            .count(|p| {
                p.status == PostStatus::Posted
                    && p.posted_at
                        .map(|at| bucket_key(BucketPeriod::Day, &at.with_timezone(&tz)) == today)
                        .unwrap_or(false)
            })
            .await;
        let last_post = self
            .store
            .channel_posts
            .find_sorted(
                |p| p.status == PostStatus::Posted,
                |a, b| b.posted_at.cmp(&a.posted_at),
                Some(1),
            )
            .await
            .into_iter()
            .next()
            .and_then(|p| p.posted_at.map(|at| (p.kind, at)));

        ChannelStatus {
            running: self.is_running(),
            channel_id: self.channel_id,
            posted_today,
            last_post,
        }
    }

    pub async fn stats(&self) -> ChannelStats {
        let posts = &self.store.channel_posts;
        ChannelStats {
            total: posts.count(|_| true).await,
            by_kind: posts.group_count(|p| p.kind).await,
            posted: posts.count(|p| p.status == PostStatus::Posted).await,
            failed: posts.count(|p| p.status == PostStatus::Failed).await,
            views: self
                .store
                .channel_analytics
                .all()
                .await
                .iter()
                .map(|a| a.engagement.views)
                .sum(),
        }
    }

    /// Posts every kind due at `now`. No-op while stopped.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<PostKind> {
        if !self.is_running() {
            return Vec::new();
        }
        let local = now.with_timezone(&self.tz);
        let mut posted = Vec::new();
        for kind in self.schedule.due(&local) {
            match self.post_now(kind, now).await {
                Ok(PostOutcome::Posted(_)) => posted.push(kind),
                Ok(PostOutcome::AlreadyPosted { .. }) => {}
                Err(e) => warn!(%kind, error = %e, "Scheduled channel post failed"),
            }
        }
        posted
    }

    /// Generates and posts `kind` unless it already posted in this bucket.
    pub async fn post_now(&self, kind: PostKind, now: DateTime<Utc>) -> Result<PostOutcome> {
        let channel = self.channel_id.ok_or(AutonomousError::NoChannel)?;
        let bucket = bucket_key(self.schedule.period(kind), &now.with_timezone(&self.tz));

        let _posting = self.posting.lock().await;
        let already = self
            .store
            .channel_posts
            .find_one(|p| p.kind == kind && p.bucket == bucket && p.status == PostStatus::Posted)
            .await;
        if already.is_some() {
            debug!(%kind, bucket = %bucket, "Already posted in bucket");
            return Ok(PostOutcome::AlreadyPosted { kind, bucket });
        }

        let client = self.client().await?;
        let content = match self.generate(kind).await {
            Ok(content) => content,
            Err(e) => {
                self.audit_post(kind, TaskStatus::Failed, Some(e.to_string()), now).await;
                return Err(e);
            }
        };

        let mut post = ChannelPost::generated(
            kind,
            title_for(kind),
            content,
            hashtags_for(kind),
            bucket,
            now,
        );
        self.store.channel_posts.insert_one(post.clone()).await?;

        match client.transport.send_text(channel, &post.render(), None).await {
            Ok(_) => {
                post.status = PostStatus::Posted;
                post.posted_at = Some(now);
                self.store
                    .channel_posts
                    .update_one(&post.post_id, |p| {
                        p.status = PostStatus::Posted;
                        p.posted_at = Some(now);
                    })
                    .await?;
                self.store
                    .channel_analytics
                    .upsert(ChannelAnalytics {
                        post_id: post.post_id.clone(),
                        kind,
                        posted_at: now,
                        engagement: Default::default(),
                    })
                    .await?;
                self.audit_post(kind, TaskStatus::Executed, None, now).await;
                info!(%kind, bucket = %post.bucket, "Channel post published");
                Ok(PostOutcome::Posted(post))
            }
            Err(e) => {
                let error = e.to_string();
                self.store
                    .channel_posts
                    .update_one(&post.post_id, |p| {
                        p.status = PostStatus::Failed;
                        p.error = Some(error.clone());
                    })
                    .await?;
                self.audit_post(kind, TaskStatus::Failed, Some(error), now).await;
                Err(e.into())
            }
        }
    }

    async fn client(&self) -> Result<ClientHandle> {
        if let Some(id) = &self.poster_assistant {
            if let Some(client) = self.clients.client(id).await {
                return Ok(client);
            }
        }
        self.clients
            .clients()
            .await
            .into_iter()
            .next()
            .ok_or(AutonomousError::NoClient)
    }

    async fn generate(&self, kind: PostKind) -> Result<String> {
        let request = GenerationRequest::new(WRITER_PROMPT, prompt_for(kind));
        let content = self.model.generate(request).await?;
        Ok(content.trim().to_string())
    }

    async fn audit_post(
        &self,
        kind: PostKind,
        status: TaskStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) {
        let reason = Some(match reason {
            Some(r) => format!("{}: {}", kind, r),
            None => kind.to_string(),
        });
        if let Err(e) = self.audit.record(TaskKind::ChannelPost, None, status, reason, now).await {
            warn!(error = %e, "Failed to write audit record");
        }
    }
}

fn title_for(kind: PostKind) -> &'static str {
    match kind {
        PostKind::DailyTip => "💡 Tips Harian",
        PostKind::FunFact => "🤓 Fun Fact",
        PostKind::QnA => "❓ Q&A Malam",
        PostKind::UserStory => "📖 Cerita Pengguna",
        PostKind::Poll => "📊 Polling",
        PostKind::WeeklyUpdate => "🗓️ Update Mingguan",
        PostKind::AiTrend => "🚀 Tren AI Bulan Ini",
    }
}

fn hashtags_for(kind: PostKind) -> Vec<String> {
    let tags: &[&str] = match kind {
        PostKind::DailyTip => &["tips", "produktif"],
        PostKind::FunFact => &["funfact", "tahukahkamu"],
        PostKind::QnA => &["tanyajawab"],
        PostKind::UserStory => &["cerita", "komunitas"],
        PostKind::Poll => &["polling"],
        PostKind::WeeklyUpdate => &["update", "mingguan"],
        PostKind::AiTrend => &["AI", "teknologi"],
    };
    tags.iter().map(|t| t.to_string()).collect()
}

fn prompt_for(kind: PostKind) -> &'static str {
    match kind {
        PostKind::DailyTip => "Tulis satu tips praktis untuk produktivitas atau kesehatan digital hari ini.",
        PostKind::FunFact => "Tulis satu fakta unik dan mengejutkan tentang sains atau teknologi.",
        PostKind::QnA => "Tulis satu pertanyaan yang sering ditanyakan tentang AI beserta jawabannya yang singkat.",
        PostKind::UserStory => "Tulis cerita pendek fiktif tentang pengguna yang terbantu oleh asisten AI.",
        PostKind::Poll => "Tulis satu pertanyaan polling dengan 4 pilihan jawaban bernomor untuk komunitas.",
        PostKind::WeeklyUpdate => "Tulis ringkasan mingguan yang menyemangati komunitas untuk minggu ini.",
        PostKind::AiTrend => "Tulis ulasan singkat tentang satu tren AI yang sedang ramai bulan ini.",
    }
}
