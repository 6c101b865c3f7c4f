//! Autonomous task audit records and scheduled tasks.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChatId, UserId};

/// Which autonomous job produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    ProactiveMessage,
    ProactiveAssistance,
    ScheduledTask,
    ReEngagement,
    LearningOptimization,
    ChannelPost,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ProactiveMessage => "proactive_message",
            Self::ProactiveAssistance => "proactive_assistance",
            Self::ScheduledTask => "scheduled_task",
            Self::ReEngagement => "re_engagement",
            Self::LearningOptimization => "learning_optimization",
            Self::ChannelPost => "channel_post",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Executed,
    Failed,
    Skipped,
}

/// Append-only audit entry for one autonomous action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutonomousTaskRecord {
    pub id: String,
    pub kind: TaskKind,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub timestamp: DateTime<Utc>,
    pub status: TaskStatus,
    /// Skip reason or error text.
    #[serde(default)]
    pub reason: Option<String>,
}

impl AutonomousTaskRecord {
    pub fn new(
        kind: TaskKind,
        user_id: Option<UserId>,
        status: TaskStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            user_id,
            timestamp: now,
            status,
            reason,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledTaskKind {
    Reminder,
    Message,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduledTaskStatus {
    Pending,
    Completed,
    Failed,
}

/// A reminder or message due at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: String,
    pub kind: ScheduledTaskKind,
    pub chat_id: ChatId,
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Assistant that should deliver the task.
    pub assistant_id: String,
    pub text: String,
    pub due_at: DateTime<Utc>,
    pub status: ScheduledTaskStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ScheduledTask {
    pub fn reminder(
        chat_id: ChatId,
        user_id: Option<UserId>,
        assistant_id: impl Into<String>,
        text: impl Into<String>,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind: ScheduledTaskKind::Reminder,
            chat_id,
            user_id,
            assistant_id: assistant_id.into(),
            text: text.into(),
            due_at,
            status: ScheduledTaskStatus::Pending,
            created_at: now,
            error: None,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == ScheduledTaskStatus::Pending && self.due_at <= now
    }
}
