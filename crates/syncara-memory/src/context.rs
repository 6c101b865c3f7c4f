//! Rolled-up user context handed to the prompt assembler.

use std::fmt;

use serde::{Deserialize, Serialize};
use syncara_models::{ConversationEntry, Mood, Preferences, ResponseLength, UserProfile};

/// Relationship bucket derived from the total interaction count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipLevel {
    New,
    Acquaintance,
    Friend,
    CloseFriend,
}

impl RelationshipLevel {
    pub fn from_interactions(total: u64) -> Self {
        match total {
            0..=4 => Self::New,
            5..=19 => Self::Acquaintance,
            20..=49 => Self::Friend,
            _ => Self::CloseFriend,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Acquaintance => "acquaintance",
            Self::Friend => "friend",
            Self::CloseFriend => "close_friend",
        }
    }
}

impl fmt::Display for RelationshipLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the assistant knows about a user when composing a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct UserContext {
    pub first_name: String,
    pub username: Option<String>,
    pub total_interactions: u64,
    pub relationship: RelationshipLevel,
    pub preferences: Preferences,
    /// Most recent exchanges, oldest first.
    pub recent: Vec<ConversationEntry>,
    pub top_topics: Vec<String>,
    /// Dominant mood over the recent window, if there is one.
    pub recent_mood: Option<Mood>,
    pub personality_notes: String,
}

impl UserContext {
    pub fn from_profile(profile: &UserProfile, recent_limit: usize) -> Self {
        let start = profile.conversations.len().saturating_sub(recent_limit);
        let recent = profile.conversations[start..].to_vec();
        Self {
            first_name: profile.first_name.clone(),
            username: profile.username.clone(),
            total_interactions: profile.total_interactions,
            relationship: RelationshipLevel::from_interactions(profile.total_interactions),
            preferences: profile.preferences.clone(),
            recent_mood: dominant_mood(&recent),
            recent,
            top_topics: profile.patterns.top_topics.clone(),
            personality_notes: profile.personality_notes.clone(),
        }
    }

    /// One-line description of reply preferences.
    pub fn preference_summary(&self) -> String {
        let length = match self.preferences.length {
            ResponseLength::Short => "short",
            ResponseLength::Medium => "medium-length",
            ResponseLength::Long => "detailed",
        };
        let emoji = if self.preferences.emoji {
            "with emoji"
        } else {
            "without emoji"
        };
        format!(
            "{} {} replies, {} tone, {}, language: {}",
            length, self.preferences.style, self.preferences.formality, emoji, self.preferences.language
        )
    }

    /// One-line summary of interactions and mood.
    pub fn interaction_summary(&self) -> String {
        let mut summary = format!(
            "{} interactions ({})",
            self.total_interactions, self.relationship
        );
        if let Some(mood) = self.recent_mood {
            summary.push_str(&format!(", recent mood: {}", mood));
        }
        if !self.top_topics.is_empty() {
            summary.push_str(&format!(", frequent topics: {}", self.top_topics.join(", ")));
        }
        summary
    }
}

/// The mood that strictly outnumbers the others, ignoring neutral entries.
fn dominant_mood(entries: &[ConversationEntry]) -> Option<Mood> {
    let positive = entries.iter().filter(|e| e.mood == Mood::Positive).count();
    let negative = entries.iter().filter(|e| e.mood == Mood::Negative).count();
    match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Some(Mood::Positive),
        std::cmp::Ordering::Less => Some(Mood::Negative),
        std::cmp::Ordering::Equal if entries.is_empty() => None,
        std::cmp::Ordering::Equal => Some(Mood::Neutral),
    }
}
