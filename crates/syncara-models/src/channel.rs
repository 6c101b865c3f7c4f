//! Channel auto-poster content records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of content the channel auto-poster publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKind {
    DailyTip,
    FunFact,
    QnA,
    UserStory,
    Poll,
    WeeklyUpdate,
    AiTrend,
}

impl PostKind {
    pub const ALL: [PostKind; 7] = [
        Self::DailyTip,
        Self::FunFact,
        Self::QnA,
        Self::UserStory,
        Self::Poll,
        Self::WeeklyUpdate,
        Self::AiTrend,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            Self::DailyTip => "daily_tip",
            Self::FunFact => "fun_fact",
            Self::QnA => "qna",
            Self::UserStory => "user_story",
            Self::Poll => "poll",
            Self::WeeklyUpdate => "weekly_update",
            Self::AiTrend => "ai_trend",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DailyTip => "Daily Tip",
            Self::FunFact => "Fun Fact",
            Self::QnA => "Q&A",
            Self::UserStory => "User Story",
            Self::Poll => "Poll",
            Self::WeeklyUpdate => "Weekly Update",
            Self::AiTrend => "AI Trend",
        }
    }
}

impl fmt::Display for PostKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PostKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "daily_tip" | "tip" | "tips" | "daily_tips" => Ok(Self::DailyTip),
            "fun_fact" | "fact" | "fun_facts" => Ok(Self::FunFact),
            "qna" | "q&a" | "qa" => Ok(Self::QnA),
            "user_story" | "story" | "user_stories" => Ok(Self::UserStory),
            "poll" | "polls" => Ok(Self::Poll),
            "weekly_update" | "weekly" => Ok(Self::WeeklyUpdate),
            "ai_trend" | "trend" | "ai_trends" => Ok(Self::AiTrend),
            _ => Err(format!("unknown post kind: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Generated,
    Posted,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounters {
    pub views: u64,
    pub reactions: u64,
    pub forwards: u64,
}

/// One generated channel post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPost {
    pub post_id: String,
    pub kind: PostKind,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
    pub status: PostStatus,
    /// Calendar bucket the post belongs to (e.g. `2026-10-18`, `2026-W42`).
    pub bucket: String,
    #[serde(default)]
    pub engagement: EngagementCounters,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChannelPost {
    pub fn generated(
        kind: PostKind,
        title: impl Into<String>,
        content: impl Into<String>,
        hashtags: Vec<String>,
        bucket: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            post_id: uuid::Uuid::new_v4().to_string(),
            kind,
            title: title.into(),
            content: content.into(),
            hashtags,
            generated_at: now,
            posted_at: None,
            status: PostStatus::Generated,
            bucket: bucket.into(),
            engagement: EngagementCounters::default(),
            error: None,
        }
    }

    /// Text published to the channel.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n\n{}", self.title, self.content);
        if !self.hashtags.is_empty() {
            out.push_str("\n\n");
            let tags: Vec<String> = self
                .hashtags
                .iter()
                .map(|t| format!("#{}", t.trim_start_matches('#')))
                .collect();
            out.push_str(&tags.join(" "));
        }
        out
    }
}

/// Analytics record kept per posted item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelAnalytics {
    pub post_id: String,
    pub kind: PostKind,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub engagement: EngagementCounters,
}
