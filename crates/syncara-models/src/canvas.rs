//! Virtual files kept per chat by the canvas handlers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ChatId;

/// Maximum number of prior versions kept per file.
pub const MAX_FILE_HISTORY: usize = 10;

/// A prior version of a virtual file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileVersion {
    pub content: String,
    pub saved_at: DateTime<Utc>,
}

/// A text file owned by a chat, keyed by `(owner_chat, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualFile {
    pub name: String,
    pub file_type: String,
    pub content: String,
    pub owner_chat: ChatId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub version_history: Vec<FileVersion>,
    /// Incremented on every edit.
    #[serde(default)]
    pub version: u32,
    /// Version that was last exported, if any.
    #[serde(default)]
    pub exported_version: Option<u32>,
}

impl VirtualFile {
    pub fn new(
        owner_chat: ChatId,
        name: impl Into<String>,
        file_type: impl Into<String>,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            file_type: file_type.into(),
            content: content.into(),
            owner_chat,
            created_at: now,
            updated_at: now,
            version_history: Vec::new(),
            version: 1,
            exported_version: None,
        }
    }

    /// Storage key for the `(chat, name)` pair.
    pub fn key_for(owner_chat: ChatId, name: &str) -> String {
        format!("{}:{}", owner_chat, name.to_lowercase())
    }

    pub fn key(&self) -> String {
        Self::key_for(self.owner_chat, &self.name)
    }

    /// Replace the content, pushing the previous content onto the history.
    ///
    /// History is trimmed to [`MAX_FILE_HISTORY`] entries, oldest first out.
    pub fn edit(&mut self, content: impl Into<String>, now: DateTime<Utc>) {
        let previous = std::mem::replace(&mut self.content, content.into());
        self.version_history.push(FileVersion {
            content: previous,
            saved_at: self.updated_at,
        });
        if self.version_history.len() > MAX_FILE_HISTORY {
            let excess = self.version_history.len() - MAX_FILE_HISTORY;
            self.version_history.drain(..excess);
        }
        self.updated_at = now;
        self.version += 1;
    }

    /// Whether the current version was already exported.
    pub fn is_exported(&self) -> bool {
        self.exported_version == Some(self.version)
    }

    /// File name with an extension matching the file type.
    pub fn export_name(&self) -> String {
        if self.name.contains('.') {
            return self.name.clone();
        }
        let ext = match self.file_type.to_lowercase().as_str() {
            "markdown" | "md" => "md",
            "python" | "py" => "py",
            "rust" | "rs" => "rs",
            "javascript" | "js" => "js",
            "json" => "json",
            "html" => "html",
            _ => "txt",
        };
        format!("{}.{}", self.name, ext)
    }
}
