//! Group records and the system event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ChatId;

/// A group chat an assistant has seen traffic in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    pub chat_id: ChatId,
    #[serde(default)]
    pub title: Option<String>,
    pub first_seen: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub message_count: u64,
}

impl GroupRecord {
    pub fn new(chat_id: ChatId, title: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            chat_id,
            title,
            first_seen: now,
            last_activity: now,
            message_count: 0,
        }
    }
}

/// Operational event recorded for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub event: String,
    #[serde(default)]
    pub detail: Option<String>,
}

impl SystemLogEntry {
    pub fn new(event: impl Into<String>, detail: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: now,
            event: event.into(),
            detail,
        }
    }
}
