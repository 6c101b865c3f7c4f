//! The SyncaraBot document store and its collections.

use std::fs;
use std::path::{Path, PathBuf};

use syncara_models::{
    AutonomousTaskRecord, ChannelAnalytics, ChannelPost, GroupRecord, ScheduledTask,
    SystemLogEntry, Todo, UserProfile, VirtualFile,
};
use tracing::info;

use crate::collection::{Collection, Document};
use crate::error::{PersistenceError, Result};

impl Document for UserProfile {
    fn key(&self) -> String {
        self.user_id.to_string()
    }
}

impl Document for GroupRecord {
    fn key(&self) -> String {
        self.chat_id.to_string()
    }
}

impl Document for SystemLogEntry {
    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Document for ChannelPost {
    fn key(&self) -> String {
        self.post_id.clone()
    }
}

impl Document for ChannelAnalytics {
    fn key(&self) -> String {
        self.post_id.clone()
    }
}

impl Document for AutonomousTaskRecord {
    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Document for VirtualFile {
    fn key(&self) -> String {
        VirtualFile::key_for(self.owner_chat, &self.name)
    }
}

impl Document for Todo {
    fn key(&self) -> String {
        self.id.clone()
    }
}

impl Document for ScheduledTask {
    fn key(&self) -> String {
        self.id.clone()
    }
}

/// All persistent collections, opened from one database directory.
pub struct DocumentStore {
    root: Option<PathBuf>,
    pub users: Collection<UserProfile>,
    pub groups: Collection<GroupRecord>,
    pub system_log: Collection<SystemLogEntry>,
    pub channel_posts: Collection<ChannelPost>,
    pub channel_analytics: Collection<ChannelAnalytics>,
    pub autonomous_tasks: Collection<AutonomousTaskRecord>,
    pub canvas_files: Collection<VirtualFile>,
    pub todos: Collection<Todo>,
    pub scheduled_tasks: Collection<ScheduledTask>,
}

impl DocumentStore {
    /// Opens (or creates) the store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root).map_err(|source| PersistenceError::DirectoryError {
                path: root.clone(),
                source,
            })?;
        }

        let file = |name: &str| root.join(format!("{}.json", name));
        let store = Self {
            users: Collection::open("users", file("users"))?,
            groups: Collection::open("groups", file("groups"))?,
            system_log: Collection::open("system_log", file("system_log"))?,
            channel_posts: Collection::open("channel_posts", file("channel_posts"))?,
            channel_analytics: Collection::open("channel_analytics", file("channel_analytics"))?,
            autonomous_tasks: Collection::open("autonomous_tasks", file("autonomous_tasks"))?,
            canvas_files: Collection::open("canvas_files", file("canvas_files"))?,
            todos: Collection::open("todos", file("todos"))?,
            scheduled_tasks: Collection::open("scheduled_tasks", file("scheduled_tasks"))?,
            root: Some(root.clone()),
        };

        info!(path = %root.display(), "Document store opened");
        Ok(store)
    }

    /// Creates a store that keeps everything in memory.
    pub fn in_memory() -> Self {
        Self {
            root: None,
            users: Collection::in_memory("users"),
            groups: Collection::in_memory("groups"),
            system_log: Collection::in_memory("system_log"),
            channel_posts: Collection::in_memory("channel_posts"),
            channel_analytics: Collection::in_memory("channel_analytics"),
            autonomous_tasks: Collection::in_memory("autonomous_tasks"),
            canvas_files: Collection::in_memory("canvas_files"),
            todos: Collection::in_memory("todos"),
            scheduled_tasks: Collection::in_memory("scheduled_tasks"),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use syncara_models::{ChatId, UserId};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_open_creates_root_and_persists() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("db");

        {
            let store = DocumentStore::open(&root).await.unwrap();
            let profile = UserProfile::new(UserId(42), "Rina", Utc::now());
            store.users.insert_one(profile).await.unwrap();
        }

        assert!(root.join("users.json").exists());
        let store = DocumentStore::open(&root).await.unwrap();
        let loaded = store.users.get("42").await.unwrap();
        assert_eq!(loaded.first_name, "Rina");
    }

    #[tokio::test]
    async fn test_canvas_key_is_case_insensitive() {
        let store = DocumentStore::in_memory();
        let file = VirtualFile::new(ChatId(7), "Notes.md", "markdown", "hi", Utc::now());
        store.canvas_files.insert_one(file).await.unwrap();

        let key = VirtualFile::key_for(ChatId(7), "NOTES.MD");
        assert!(store.canvas_files.get(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_in_memory_has_no_root() {
        let store = DocumentStore::in_memory();
        assert!(store.root().is_none());
        let todo = Todo::new(ChatId(1), "buy milk", Utc::now());
        let id = todo.id.clone();
        store.todos.insert_one(todo).await.unwrap();
        assert!(store.todos.get(&id).await.is_some());
    }
}
