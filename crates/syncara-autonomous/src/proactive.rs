//! Proactive-message suggestions.

use std::fmt;

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use syncara_core::truncate;
use syncara_models::{InteractionType, Mood, UserId, UserProfile};

/// Replies scoring below this leave a question counted as unresolved.
const UNRESOLVED_QUALITY: f32 = 0.5;

/// Why a user was picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionReason {
    /// The latest exchange was a question that got a weak answer.
    UnresolvedQuestion,
    /// Recent messages lean negative.
    MoodCheckIn,
    /// It is one of the user's usual active hours.
    PeakHour,
}

impl SuggestionReason {
    pub fn confidence(self) -> f32 {
        match self {
            Self::UnresolvedQuestion => 0.9,
            Self::MoodCheckIn => 0.8,
            Self::PeakHour => 0.72,
        }
    }
}

impl fmt::Display for SuggestionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnresolvedQuestion => "unresolved_question",
            Self::MoodCheckIn => "mood_check_in",
            Self::PeakHour => "peak_hour",
        };
        f.write_str(s)
    }
}

/// A proposed proactive message.
#[derive(Debug, Clone, PartialEq)]
pub struct ProactiveSuggestion {
    pub user_id: UserId,
    pub reason: SuggestionReason,
    pub confidence: f32,
    pub message: String,
}

/// Scores `profile` for a proactive message at `now`.
///
/// Signals are checked strongest first; the first that applies wins.
pub fn suggest(
    profile: &UserProfile,
    now: DateTime<Utc>,
    tz: FixedOffset,
) -> Option<ProactiveSuggestion> {
    let name = &profile.first_name;
    let last = profile.conversations.last();

    let (reason, message) = if let Some(entry) = last.filter(|e| {
        e.classified_type == InteractionType::Question && e.quality_score < UNRESOLVED_QUALITY
    }) {
        (
            SuggestionReason::UnresolvedQuestion,
            format!(
                "Hai {}! Soal pertanyaanmu \"{}\", sudah ketemu jawabannya? Kalau belum, aku bisa bantu lagi 😊",
                name,
                truncate(&entry.message, 80)
            ),
        )
    } else if recent_mood_score(profile) < 0.0 {
        (
            SuggestionReason::MoodCheckIn,
            format!("Hai {}, gimana kabarmu hari ini? Semoga sudah lebih baik ya 🤗", name),
        )
    } else if profile
        .patterns
        .peak_hours
        .contains(&now.with_timezone(&tz).hour())
    {
        (
            SuggestionReason::PeakHour,
            format!("Hai {}! Lagi santai? Ada yang bisa aku bantu hari ini? ✨", name),
        )
    } else {
        return None;
    };

    Some(ProactiveSuggestion {
        user_id: profile.user_id,
        reason,
        confidence: reason.confidence(),
        message,
    })
}

/// Mean mood over the last three exchanges.
fn recent_mood_score(profile: &UserProfile) -> f32 {
    let start = profile.conversations.len().saturating_sub(3);
    let recent = &profile.conversations[start..];
    if recent.is_empty() {
        return 0.0;
    }
    recent.iter().map(|e| Mood::score(e.mood)).sum::<f32>() / recent.len() as f32
}
