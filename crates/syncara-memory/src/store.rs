//! The learning store: per-user reads and bounded append writes.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use syncara_models::{
    ChatId, ChatKind, ConversationEntry, FeedbackEntry, GroupRecord, InteractionContext,
    InteractionType, LearningPatterns, Preferences, QualityEntry, ResponseLength, Sender,
    UserId, UserProfile,
};
use syncara_persistence::DocumentStore;
use tracing::{debug, info};

use crate::classify::{
    classify_interaction, contains_emoji, detect_mood, effectiveness, extract_topics,
    quality_score,
};
use crate::context::UserContext;
use crate::error::{MemoryError, Result};

/// Bounds and window sizes for the learning store.
#[derive(Debug, Clone)]
pub struct LearningConfig {
    /// Maximum conversation entries kept per user.
    pub conversation_limit: usize,
    /// Maximum quality entries kept per user.
    pub quality_limit: usize,
    /// Maximum feedback entries kept per user.
    pub feedback_limit: usize,
    /// Conversation entries included in a [`UserContext`].
    pub context_window: usize,
    /// Quality at or above which a reply informs preference inference.
    pub high_quality_threshold: f32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            conversation_limit: 50,
            quality_limit: 100,
            feedback_limit: 50,
            context_window: 5,
            high_quality_threshold: 0.7,
        }
    }
}

/// Result of [`LearningStore::upsert_user`].
#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub profile: UserProfile,
    pub is_new: bool,
    /// Greeting for a first-time user, only when the context asked for one.
    pub greeting: Option<String>,
}

/// Per-user memory backed by the `users` collection.
pub struct LearningStore {
    store: Arc<DocumentStore>,
    config: LearningConfig,
    tz: FixedOffset,
}

impl LearningStore {
    pub fn new(store: Arc<DocumentStore>, tz: FixedOffset) -> Self {
        Self {
            store,
            config: LearningConfig::default(),
            tz,
        }
    }

    pub fn with_config(mut self, config: LearningConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn documents(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    // ---- reads ----

    pub async fn get_profile(&self, user: UserId) -> Option<UserProfile> {
        self.store.users.get(&user.to_string()).await
    }

    /// The `n` most recent exchanges, oldest first.
    pub async fn recent_conversations(&self, user: UserId, n: usize) -> Vec<ConversationEntry> {
        match self.get_profile(user).await {
            Some(profile) => {
                let start = profile.conversations.len().saturating_sub(n);
                profile.conversations[start..].to_vec()
            }
            None => Vec::new(),
        }
    }

    pub async fn get_context(&self, user: UserId) -> Option<UserContext> {
        let profile = self.get_profile(user).await?;
        Some(UserContext::from_profile(&profile, self.config.context_window))
    }

    pub async fn all_profiles(&self) -> Vec<UserProfile> {
        self.store.users.all().await
    }

    /// Users active within `active_within` but idle for at least `idle_for`,
    /// with at least `min_interactions`.
    pub async fn active_users(
        &self,
        now: DateTime<Utc>,
        active_within: Duration,
        idle_for: Duration,
        min_interactions: u64,
    ) -> Vec<UserProfile> {
        self.store
            .users
            .find_sorted(
                |p| {
                    let idle = now - p.last_interaction;
                    idle <= active_within && idle >= idle_for && p.total_interactions >= min_interactions
                },
                |a, b| b.last_interaction.cmp(&a.last_interaction),
                None,
            )
            .await
    }

    /// Users whose last interaction is between `min_idle` and `max_idle` ago,
    /// with at least `min_interactions`.
    pub async fn inactive_users(
        &self,
        now: DateTime<Utc>,
        min_idle: Duration,
        max_idle: Duration,
        min_interactions: u64,
    ) -> Vec<UserProfile> {
        self.store
            .users
            .find_sorted(
                |p| {
                    let idle = now - p.last_interaction;
                    idle >= min_idle && idle <= max_idle && p.total_interactions >= min_interactions
                },
                |a, b| a.last_interaction.cmp(&b.last_interaction),
                None,
            )
            .await
    }

    // ---- writes ----

    /// Records that `sender` interacted in `ctx`, creating the profile on
    /// first contact.
    pub async fn upsert_user(
        &self,
        sender: &Sender,
        ctx: &InteractionContext,
        now: DateTime<Utc>,
    ) -> Result<UpsertOutcome> {
        let key = sender.id.to_string();
        let is_new = self.store.users.get(&key).await.is_none();

        let profile = self
            .store
            .users
            .upsert_with(
                &key,
                || UserProfile::new(sender.id, sender.first_name.clone(), now),
                |p| {
                    p.first_name = sender.first_name.clone();
                    if sender.username.is_some() {
                        p.username = sender.username.clone();
                    }
                    p.last_interaction = now;
                    p.total_interactions += 1;
                    p.context_counts.increment(ctx.chat_kind);
                    p.preferred_context = Some(preferred_context(p));
                    *p.assistant_affinity.entry(ctx.assistant_id.clone()).or_insert(0) += 1;
                },
            )
            .await?;

        if is_new {
            info!(user_id = %sender.id, name = %sender.first_name, "New user profile");
        }

        let greeting = (is_new && ctx.request_greeting).then(|| {
            format!(
                "Halo {}! Senang kenalan sama kamu 👋",
                sender.first_name
            )
        });

        Ok(UpsertOutcome {
            profile,
            is_new,
            greeting,
        })
    }

    /// Appends a conversation entry, trims to the bound and recomputes the
    /// learning patterns in one document update.
    pub async fn append_conversation(&self, user: UserId, entry: ConversationEntry) -> Result<()> {
        let limit = self.config.conversation_limit;
        let tz = self.tz;
        self.update(user, move |p| {
            p.conversations.push(entry);
            trim_front(&mut p.conversations, limit);
            p.patterns = compute_patterns(&p.conversations, tz);
        })
        .await
    }

    /// Classifies and scores one exchange, then appends both the
    /// conversation entry and its quality entry.
    pub async fn record_exchange(
        &self,
        user: UserId,
        message: &str,
        response: &str,
        context_flags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<ConversationEntry> {
        let entry = ConversationEntry {
            timestamp: now,
            message: message.to_string(),
            response: response.to_string(),
            classified_type: classify_interaction(message),
            mood: detect_mood(message),
            quality_score: quality_score(message, response),
            context_flags,
        };
        let quality = QualityEntry {
            timestamp: now,
            quality_score: entry.quality_score,
            response_length: response.chars().count(),
            interaction_type: entry.classified_type,
            used_emoji: contains_emoji(response),
        };

        let conversation_limit = self.config.conversation_limit;
        let quality_limit = self.config.quality_limit;
        let tz = self.tz;
        let stored = entry.clone();
        self.update(user, move |p| {
            p.conversations.push(stored);
            trim_front(&mut p.conversations, conversation_limit);
            p.quality_log.push(quality);
            trim_front(&mut p.quality_log, quality_limit);
            p.patterns = compute_patterns(&p.conversations, tz);
        })
        .await?;

        debug!(
            user_id = %user,
            kind = %entry.classified_type,
            mood = %entry.mood,
            quality = entry.quality_score,
            "Recorded exchange"
        );
        Ok(entry)
    }

    pub async fn record_feedback(&self, user: UserId, feedback: FeedbackEntry) -> Result<()> {
        let limit = self.config.feedback_limit;
        self.update(user, move |p| {
            p.feedback.push(feedback);
            trim_front(&mut p.feedback, limit);
        })
        .await
    }

    pub async fn record_quality(&self, user: UserId, entry: QualityEntry) -> Result<()> {
        let limit = self.config.quality_limit;
        self.update(user, move |p| {
            p.quality_log.push(entry);
            trim_front(&mut p.quality_log, limit);
        })
        .await
    }

    pub async fn update_preferences(&self, user: UserId, prefs: Preferences) -> Result<()> {
        self.update(user, move |p| p.preferences = prefs).await
    }

    pub async fn set_personality_notes(&self, user: UserId, notes: &str) -> Result<()> {
        let notes = notes.to_string();
        self.update(user, move |p| p.personality_notes = notes).await
    }

    /// Marks the user as refusing direct messages.
    ///
    /// Only the send path that observed the refusal should call this.
    pub async fn set_unreachable(&self, user: UserId) -> Result<()> {
        self.update(user, |p| p.unreachable = true).await?;
        info!(user_id = %user, "User marked unreachable");
        Ok(())
    }

    /// Clears the unreachable flag after a successful direct message.
    /// Unknown users are ignored.
    pub async fn mark_reachable(&self, user: UserId) -> Result<()> {
        let key = user.to_string();
        let was_unreachable = self
            .store
            .users
            .find_one(|p| p.user_id == user && p.unreachable)
            .await
            .is_some();
        if was_unreachable {
            self.store.users.update_one(&key, |p| p.unreachable = false).await?;
            info!(user_id = %user, "User reachable again");
        }
        Ok(())
    }

    pub async fn mark_proactive(&self, user: UserId, at: DateTime<Utc>) -> Result<()> {
        self.update(user, move |p| p.last_proactive_at = Some(at)).await
    }

    pub async fn mark_reengaged(&self, user: UserId, at: DateTime<Utc>) -> Result<()> {
        self.update(user, move |p| p.last_reengaged_at = Some(at)).await
    }

    /// Re-derives preferred length and emoji use from high-quality replies.
    ///
    /// Needs at least three high-quality entries; returns whether the
    /// preferences changed.
    pub async fn optimise_preferences(&self, user: UserId) -> Result<bool> {
        let Some(profile) = self.get_profile(user).await else {
            return Err(MemoryError::UnknownUser(user));
        };
        let Some((length, emoji)) =
            infer_preferences(&profile.quality_log, self.config.high_quality_threshold)
        else {
            return Ok(false);
        };
        if profile.preferences.length == length && profile.preferences.emoji == emoji {
            return Ok(false);
        }

        self.update(user, move |p| {
            p.preferences.length = length;
            p.preferences.emoji = emoji;
            p.patterns.effectiveness = effectiveness(&p.conversations);
        })
        .await?;
        debug!(user_id = %user, ?length, emoji, "Preferences updated from quality log");
        Ok(true)
    }

    /// Records activity in a group chat.
    pub async fn record_group_activity(
        &self,
        chat: ChatId,
        title: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.store
            .groups
            .upsert_with(
                &chat.to_string(),
                || GroupRecord::new(chat, title.clone(), now),
                |g| {
                    if title.is_some() {
                        g.title = title.clone();
                    }
                    g.last_activity = now;
                    g.message_count += 1;
                },
            )
            .await?;
        Ok(())
    }

    async fn update(&self, user: UserId, f: impl FnOnce(&mut UserProfile)) -> Result<()> {
        if self.store.users.update_one(&user.to_string(), f).await? {
            Ok(())
        } else {
            Err(MemoryError::UnknownUser(user))
        }
    }
}

fn trim_front<T>(log: &mut Vec<T>, limit: usize) {
    if log.len() > limit {
        let excess = log.len() - limit;
        log.drain(..excess);
    }
}

/// The chat kind with the most interactions; private wins ties.
fn preferred_context(profile: &UserProfile) -> ChatKind {
    let counts = &profile.context_counts;
    [
        (ChatKind::Private, counts.private),
        (ChatKind::Group, counts.group),
        (ChatKind::Channel, counts.channel),
    ]
    .into_iter()
    .fold((ChatKind::Private, 0), |best, (kind, n)| if n > best.1 { (kind, n) } else { best })
    .0
}

/// Aggregates learning signals over a conversation log.
pub fn compute_patterns(conversations: &[ConversationEntry], tz: FixedOffset) -> LearningPatterns {
    let mut type_counts: BTreeMap<InteractionType, usize> = BTreeMap::new();
    let mut hour_counts: BTreeMap<u32, usize> = BTreeMap::new();
    for entry in conversations {
        *type_counts.entry(entry.classified_type).or_insert(0) += 1;
        *hour_counts
            .entry(entry.timestamp.with_timezone(&tz).hour())
            .or_insert(0) += 1;
    }

    let top_question_types = top_keys(type_counts, 3);
    let peak_hours = top_keys(hour_counts, 3);
    let top_topics = extract_topics(conversations.iter().map(|e| e.message.as_str()), 5);

    let average_mood = if conversations.is_empty() {
        0.0
    } else {
        conversations.iter().map(|e| e.mood.score()).sum::<f32>() / conversations.len() as f32
    };

    LearningPatterns {
        top_question_types,
        top_topics,
        peak_hours,
        average_mood,
        effectiveness: effectiveness(conversations),
    }
}

/// Keys ordered by descending count; ties keep key order.
fn top_keys<K: Ord + Copy>(counts: BTreeMap<K, usize>, limit: usize) -> Vec<K> {
    let mut ranked: Vec<(K, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(k, _)| k).collect()
}

/// Preferred length and emoji use from high-quality replies.
fn infer_preferences(log: &[QualityEntry], threshold: f32) -> Option<(ResponseLength, bool)> {
    let good: Vec<&QualityEntry> = log.iter().filter(|q| q.quality_score >= threshold).collect();
    if good.len() < 3 {
        return None;
    }
    let avg_len = good.iter().map(|q| q.response_length).sum::<usize>() / good.len();
    let length = match avg_len {
        0..=149 => ResponseLength::Short,
        150..=600 => ResponseLength::Medium,
        _ => ResponseLength::Long,
    };
    let with_emoji = good.iter().filter(|q| q.used_emoji).count();
    Some((length, with_emoji * 2 >= good.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncara_models::Mood;

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn learning() -> LearningStore {
        LearningStore::new(Arc::new(DocumentStore::in_memory()), tz())
    }

    fn ctx(kind: ChatKind) -> InteractionContext {
        InteractionContext {
            chat_id: ChatId(1),
            chat_kind: kind,
            assistant_id: "aeris".into(),
            request_greeting: false,
        }
    }

    fn sender() -> Sender {
        Sender::new(UserId(7), "Rina").with_username("rina")
    }

    #[tokio::test]
    async fn test_upsert_creates_then_increments() {
        let store = learning();
        let now = Utc::now();

        let first = store.upsert_user(&sender(), &ctx(ChatKind::Private), now).await.unwrap();
        assert!(first.is_new);
        assert_eq!(first.profile.total_interactions, 1);
        assert!(first.greeting.is_none());

        let second = store.upsert_user(&sender(), &ctx(ChatKind::Group), now).await.unwrap();
        assert!(!second.is_new);
        assert_eq!(second.profile.total_interactions, 2);
        assert_eq!(second.profile.context_counts.group, 1);
        assert_eq!(second.profile.assistant_affinity.get("aeris"), Some(&2));
        assert_eq!(second.profile.preferred_context, Some(ChatKind::Private));
    }

    #[tokio::test]
    async fn test_greeting_only_when_requested() {
        let store = learning();
        let mut context = ctx(ChatKind::Private);
        context.request_greeting = true;

        let outcome = store.upsert_user(&sender(), &context, Utc::now()).await.unwrap();
        assert!(outcome.greeting.unwrap().contains("Rina"));

        let again = store.upsert_user(&sender(), &context, Utc::now()).await.unwrap();
        assert!(again.greeting.is_none());
    }

    #[tokio::test]
    async fn test_conversation_log_is_bounded() {
        let store = learning().with_config(LearningConfig {
            conversation_limit: 3,
            quality_limit: 2,
            ..LearningConfig::default()
        });
        store.upsert_user(&sender(), &ctx(ChatKind::Private), Utc::now()).await.unwrap();

        for i in 0..5 {
            store
                .record_exchange(UserId(7), &format!("pesan {}", i), "balasan", Vec::new(), Utc::now())
                .await
                .unwrap();
        }

        let profile = store.get_profile(UserId(7)).await.unwrap();
        assert_eq!(profile.conversations.len(), 3);
        assert_eq!(profile.conversations[0].message, "pesan 2");
        assert_eq!(profile.quality_log.len(), 2);

        let recent = store.recent_conversations(UserId(7), 2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].message, "pesan 4");
    }

    #[tokio::test]
    async fn test_profile_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let docs = Arc::new(DocumentStore::open(dir.path()).await.unwrap());
            let store = LearningStore::new(docs, tz());
            store.upsert_user(&sender(), &ctx(ChatKind::Private), Utc::now()).await.unwrap();
            store
                .record_exchange(UserId(7), "hai", "halo Rina", Vec::new(), Utc::now())
                .await
                .unwrap();
        }

        let docs = Arc::new(DocumentStore::open(dir.path()).await.unwrap());
        let store = LearningStore::new(docs, tz());
        let profile = store.get_profile(UserId(7)).await.unwrap();
        assert_eq!(profile.username.as_deref(), Some("rina"));
        assert_eq!(store.recent_conversations(UserId(7), 5).await.len(), 1);
    }

    #[tokio::test]
    async fn test_append_to_unknown_user_fails() {
        let store = learning();
        let err = store
            .record_exchange(UserId(99), "hai", "halo", Vec::new(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::UnknownUser(UserId(99))));
    }

    #[tokio::test]
    async fn test_reachability_round_trip() {
        let store = learning();
        store.upsert_user(&sender(), &ctx(ChatKind::Private), Utc::now()).await.unwrap();

        store.set_unreachable(UserId(7)).await.unwrap();
        assert!(store.get_profile(UserId(7)).await.unwrap().unreachable);

        store.mark_reachable(UserId(7)).await.unwrap();
        assert!(!store.get_profile(UserId(7)).await.unwrap().unreachable);

        // unknown users are ignored
        store.mark_reachable(UserId(12345)).await.unwrap();
    }

    #[tokio::test]
    async fn test_context_relationship() {
        let store = learning();
        for _ in 0..6 {
            store.upsert_user(&sender(), &ctx(ChatKind::Private), Utc::now()).await.unwrap();
        }
        let context = store.get_context(UserId(7)).await.unwrap();
        assert_eq!(context.relationship, crate::RelationshipLevel::Acquaintance);
        assert!(store.get_context(UserId(8)).await.is_none());
    }

    #[tokio::test]
    async fn test_optimise_preferences() {
        let store = learning();
        store.upsert_user(&sender(), &ctx(ChatKind::Private), Utc::now()).await.unwrap();

        assert!(!store.optimise_preferences(UserId(7)).await.unwrap());

        for _ in 0..3 {
            store
                .record_quality(
                    UserId(7),
                    QualityEntry {
                        timestamp: Utc::now(),
                        quality_score: 0.9,
                        response_length: 80,
                        interaction_type: InteractionType::Question,
                        used_emoji: false,
                    },
                )
                .await
                .unwrap();
        }

        assert!(store.optimise_preferences(UserId(7)).await.unwrap());
        let prefs = store.get_profile(UserId(7)).await.unwrap().preferences;
        assert_eq!(prefs.length, ResponseLength::Short);
        assert!(!prefs.emoji);
    }

    #[tokio::test]
    async fn test_active_and_inactive_queries() {
        let store = learning();
        let now = Utc::now();
        store.upsert_user(&sender(), &ctx(ChatKind::Private), now - Duration::hours(3)).await.unwrap();
        let other = Sender::new(UserId(8), "Budi");
        store.upsert_user(&other, &ctx(ChatKind::Private), now - Duration::days(10)).await.unwrap();

        let active = store
            .active_users(now, Duration::hours(48), Duration::hours(1), 1)
            .await;
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].user_id, UserId(7));

        let inactive = store
            .inactive_users(now, Duration::days(7), Duration::days(30), 1)
            .await;
        assert_eq!(inactive.len(), 1);
        assert_eq!(inactive[0].user_id, UserId(8));
    }

    #[tokio::test]
    async fn test_group_activity() {
        let store = learning();
        store.record_group_activity(ChatId(-100), Some("Kelas".into()), Utc::now()).await.unwrap();
        store.record_group_activity(ChatId(-100), None, Utc::now()).await.unwrap();
        let group = store.documents().groups.get("-100").await.unwrap();
        assert_eq!(group.message_count, 2);
        assert_eq!(group.title.as_deref(), Some("Kelas"));
    }

    #[test]
    fn test_compute_patterns() {
        let at = |h: u32| {
            // 00:00 UTC is 07:00 in UTC+7
            DateTime::parse_from_rfc3339(&format!("2026-01-05T{:02}:00:00Z", h))
                .unwrap()
                .with_timezone(&Utc)
        };
        let entry = |msg: &str, kind, mood, hour| ConversationEntry {
            timestamp: at(hour),
            message: msg.into(),
            response: "ok".into(),
            classified_type: kind,
            mood,
            quality_score: 0.5,
            context_flags: Vec::new(),
        };
        let log = vec![
            entry("belajar rust?", InteractionType::Question, Mood::Positive, 1),
            entry("belajar lagi?", InteractionType::Question, Mood::Negative, 1),
            entry("tolong", InteractionType::Request, Mood::Positive, 2),
        ];

        let patterns = compute_patterns(&log, tz());
        assert_eq!(
            patterns.top_question_types,
            vec![InteractionType::Question, InteractionType::Request]
        );
        assert_eq!(patterns.peak_hours, vec![8, 9]);
        assert_eq!(patterns.top_topics[0], "belajar");
        assert!((patterns.average_mood - 1.0 / 3.0).abs() < 1e-6);
    }
}
