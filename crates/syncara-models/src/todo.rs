//! Per-chat todo items.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ChatId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    Completed,
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Completed => f.write_str("completed"),
        }
    }
}

/// A todo item. Ids are opaque; users may also refer to pending items by ordinal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: String,
    pub description: String,
    pub status: TodoStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub owner_chat: ChatId,
}

impl Todo {
    pub fn new(owner_chat: ChatId, description: impl Into<String>, now: DateTime<Utc>) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        Self {
            id: id[..8].to_string(),
            description: description.into(),
            status: TodoStatus::Pending,
            created_at: now,
            completed_at: None,
            owner_chat,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TodoStatus::Pending
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = TodoStatus::Completed;
        self.completed_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_keeps_description() {
        let now = Utc::now();
        let mut t = Todo::new(ChatId(1), "beli susu", now);
        assert!(t.is_pending());
        assert_eq!(t.id.len(), 8);
        t.complete(now);
        assert_eq!(t.status, TodoStatus::Completed);
        assert_eq!(t.description, "beli susu");
        assert_eq!(t.completed_at, Some(now));
    }
}
