//! Learned per-user profiles.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatId, UserId};
use crate::message::ChatKind;

/// Classified intent of a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    Question,
    Request,
    Appreciation,
    Greeting,
    Statement,
}

impl fmt::Display for InteractionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Question => "question",
            Self::Request => "request",
            Self::Appreciation => "appreciation",
            Self::Greeting => "greeting",
            Self::Statement => "statement",
        };
        f.write_str(s)
    }
}

/// Detected mood of a user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Positive,
    Negative,
    Neutral,
}

impl Mood {
    /// Numeric value used for averaging (-1, 0, 1).
    pub fn score(self) -> f32 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
            Self::Neutral => 0.0,
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// One exchange between a user and an assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub response: String,
    pub classified_type: InteractionType,
    pub mood: Mood,
    /// Quality of the assistant reply, in `[0, 1]`.
    pub quality_score: f32,
    #[serde(default)]
    pub context_flags: Vec<String>,
}

/// Quality measurement of one assistant reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityEntry {
    pub timestamp: DateTime<Utc>,
    pub quality_score: f32,
    pub response_length: usize,
    pub interaction_type: InteractionType,
    #[serde(default)]
    pub used_emoji: bool,
}

/// Explicit feedback left by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub timestamp: DateTime<Utc>,
    /// Rating from -1 (bad) to 1 (good).
    pub rating: i8,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Preferred reply length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseLength {
    Short,
    #[default]
    Medium,
    Long,
}

/// Inferred or declared reply preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub style: String,
    pub length: ResponseLength,
    pub emoji: bool,
    pub formality: String,
    pub language: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            style: "friendly".into(),
            length: ResponseLength::Medium,
            emoji: true,
            formality: "casual".into(),
            language: "id".into(),
        }
    }
}

/// Interaction counters split by chat kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextCounters {
    pub private: u64,
    pub group: u64,
    pub channel: u64,
}

impl ContextCounters {
    pub fn increment(&mut self, kind: ChatKind) {
        match kind {
            ChatKind::Private => self.private += 1,
            ChatKind::Group => self.group += 1,
            ChatKind::Channel => self.channel += 1,
        }
    }
}

/// Aggregated learning signals recomputed on every append.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LearningPatterns {
    pub top_question_types: Vec<InteractionType>,
    pub top_topics: Vec<String>,
    /// Hours of the day (configured zone) with the most activity.
    pub peak_hours: Vec<u32>,
    /// Mean mood score in `[-1, 1]`.
    pub average_mood: f32,
    /// Effectiveness in `[0, 1]`.
    pub effectiveness: f32,
}

/// The context an interaction happened in, passed to `upsert_user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionContext {
    pub chat_id: ChatId,
    pub chat_kind: ChatKind,
    /// Assistant that handled the interaction.
    pub assistant_id: String,
    /// Whether the caller wants a greeting for first-time users.
    #[serde(default)]
    pub request_greeting: bool,
}

/// Persistent per-user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_interaction: DateTime<Utc>,
    pub total_interactions: u64,
    #[serde(default)]
    pub context_counts: ContextCounters,
    #[serde(default)]
    pub preferred_context: Option<ChatKind>,
    /// Interactions per assistant id.
    #[serde(default)]
    pub assistant_affinity: BTreeMap<String, u64>,
    #[serde(default)]
    pub preferences: Preferences,
    /// Most recent exchanges, oldest first.
    #[serde(default)]
    pub conversations: Vec<ConversationEntry>,
    #[serde(default)]
    pub quality_log: Vec<QualityEntry>,
    #[serde(default)]
    pub feedback: Vec<FeedbackEntry>,
    #[serde(default)]
    pub patterns: LearningPatterns,
    /// Set when the transport refused a direct message.
    #[serde(default)]
    pub unreachable: bool,
    #[serde(default)]
    pub personality_notes: String,
    #[serde(default)]
    pub last_proactive_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_reengaged_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Create a fresh profile first seen at `now`.
    pub fn new(user_id: UserId, first_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            first_name: first_name.into(),
            username: None,
            first_seen: now,
            last_interaction: now,
            total_interactions: 0,
            context_counts: ContextCounters::default(),
            preferred_context: None,
            assistant_affinity: BTreeMap::new(),
            preferences: Preferences::default(),
            conversations: Vec::new(),
            quality_log: Vec::new(),
            feedback: Vec::new(),
            patterns: LearningPatterns::default(),
            unreachable: false,
            personality_notes: String::new(),
            last_proactive_at: None,
            last_reengaged_at: None,
        }
    }

    /// Whether the user has ever talked to an assistant in a private chat.
    pub fn has_private_history(&self) -> bool {
        self.context_counts.private > 0
    }

    /// The assistant this user talks to most, if any.
    pub fn favorite_assistant(&self) -> Option<&str> {
        self.assistant_affinity
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(id, _)| id.as_str())
    }

    /// Display label: `@username` when known, else first name.
    pub fn label(&self) -> String {
        match &self.username {
            Some(u) => format!("@{}", u),
            None => self.first_name.clone(),
        }
    }
}
