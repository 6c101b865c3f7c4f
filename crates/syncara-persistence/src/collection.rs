//! Typed document collections.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::atomic::{atomic_write_json, read_json_optional};
use crate::error::{PersistenceError, Result};

/// A record that can live in a [`Collection`].
///
/// The key must be stable for the lifetime of the document; mutations
/// through [`Collection::update_one`] must not change it.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    fn key(&self) -> String;
}

/// A named set of documents, cached in memory and optionally backed by a
/// JSON file that is rewritten atomically after every mutation.
pub struct Collection<T: Document> {
    name: String,
    path: Option<PathBuf>,
    docs: RwLock<Vec<T>>,
}

impl<T: Document> Collection<T> {
    /// Opens a file-backed collection, loading existing documents.
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>) -> Result<Self> {
        let name = name.into();
        let path = path.into();
        let docs: Vec<T> = read_json_optional(&path)?.unwrap_or_default();
        debug!(collection = %name, count = docs.len(), path = %path.display(), "Loaded collection");
        Ok(Self {
            name,
            path: Some(path),
            docs: RwLock::new(docs),
        })
    }

    /// Creates a collection that is never written to disk.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            docs: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn persist(&self, docs: &[T]) -> Result<()> {
        match &self.path {
            Some(path) => atomic_write_json(path, docs),
            None => Ok(()),
        }
    }

    /// Returns the document stored under `key`.
    pub async fn get(&self, key: &str) -> Option<T> {
        let docs = self.docs.read().await;
        docs.iter().find(|d| d.key() == key).cloned()
    }

    /// Returns the document stored under `key` or a `NotFound` error.
    pub async fn require(&self, key: &str) -> Result<T> {
        self.get(key).await.ok_or_else(|| PersistenceError::NotFound {
            collection: self.name.clone(),
            key: key.to_string(),
        })
    }

    /// Returns the first document matching `pred`, in insertion order.
    pub async fn find_one(&self, pred: impl Fn(&T) -> bool) -> Option<T> {
        let docs = self.docs.read().await;
        docs.iter().find(|d| pred(d)).cloned()
    }

    /// Returns documents matching `pred` in insertion order, up to `limit`.
    pub async fn find(&self, pred: impl Fn(&T) -> bool, limit: Option<usize>) -> Vec<T> {
        let docs = self.docs.read().await;
        docs.iter()
            .filter(|d| pred(d))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Returns documents matching `pred`, ordered by `cmp`, up to `limit`.
    pub async fn find_sorted(
        &self,
        pred: impl Fn(&T) -> bool,
        cmp: impl Fn(&T, &T) -> Ordering,
        limit: Option<usize>,
    ) -> Vec<T> {
        let mut found = self.find(pred, None).await;
        found.sort_by(|a, b| cmp(a, b));
        if let Some(limit) = limit {
            found.truncate(limit);
        }
        found
    }

    pub async fn all(&self) -> Vec<T> {
        self.docs.read().await.clone()
    }

    pub async fn count(&self, pred: impl Fn(&T) -> bool) -> usize {
        let docs = self.docs.read().await;
        docs.iter().filter(|d| pred(d)).count()
    }

    /// Counts documents grouped by the label `f` extracts.
    pub async fn group_count<K: Ord>(&self, f: impl Fn(&T) -> K) -> BTreeMap<K, usize> {
        let docs = self.docs.read().await;
        let mut counts = BTreeMap::new();
        for doc in docs.iter() {
            *counts.entry(f(doc)).or_insert(0) += 1;
        }
        counts
    }

    /// Inserts a new document, failing if its key is already present.
    pub async fn insert_one(&self, doc: T) -> Result<()> {
        let mut docs = self.docs.write().await;
        let key = doc.key();
        if docs.iter().any(|d| d.key() == key) {
            return Err(PersistenceError::DuplicateKey {
                collection: self.name.clone(),
                key,
            });
        }
        docs.push(doc);
        self.persist(&docs)
    }

    /// Inserts or replaces the document with the same key.
    pub async fn upsert(&self, doc: T) -> Result<()> {
        let mut docs = self.docs.write().await;
        let key = doc.key();
        match docs.iter_mut().find(|d| d.key() == key) {
            Some(existing) => *existing = doc,
            None => docs.push(doc),
        }
        self.persist(&docs)
    }

    /// Applies `f` to the document under `key`. Returns `false` if absent.
    pub async fn update_one(&self, key: &str, f: impl FnOnce(&mut T)) -> Result<bool> {
        let mut docs = self.docs.write().await;
        let Some(doc) = docs.iter_mut().find(|d| d.key() == key) else {
            return Ok(false);
        };
        f(doc);
        self.persist(&docs)?;
        Ok(true)
    }

    /// Applies `f` to every document matching `pred`. Returns how many changed.
    pub async fn update_many(
        &self,
        pred: impl Fn(&T) -> bool,
        mut f: impl FnMut(&mut T),
    ) -> Result<usize> {
        let mut docs = self.docs.write().await;
        let mut changed = 0;
        for doc in docs.iter_mut().filter(|d| pred(d)) {
            f(doc);
            changed += 1;
        }
        if changed > 0 {
            self.persist(&docs)?;
        }
        Ok(changed)
    }

    /// Applies `f` to the document under `key`, inserting `default()` first
    /// when it does not exist. Returns the stored result.
    pub async fn upsert_with(
        &self,
        key: &str,
        default: impl FnOnce() -> T,
        f: impl FnOnce(&mut T),
    ) -> Result<T> {
        let mut docs = self.docs.write().await;
        let idx = match docs.iter().position(|d| d.key() == key) {
            Some(idx) => idx,
            None => {
                docs.push(default());
                docs.len() - 1
            }
        };
        f(&mut docs[idx]);
        let updated = docs[idx].clone();
        self.persist(&docs)?;
        Ok(updated)
    }

    /// Removes the document under `key`. Returns `false` if absent.
    pub async fn delete_one(&self, key: &str) -> Result<bool> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| d.key() != key);
        if docs.len() == before {
            return Ok(false);
        }
        self.persist(&docs)?;
        Ok(true)
    }

    /// Removes every document matching `pred`. Returns how many were removed.
    pub async fn delete_many(&self, pred: impl Fn(&T) -> bool) -> Result<usize> {
        let mut docs = self.docs.write().await;
        let before = docs.len();
        docs.retain(|d| !pred(d));
        let removed = before - docs.len();
        if removed > 0 {
            self.persist(&docs)?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::tempdir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: String,
        tag: String,
        rank: u32,
    }

    impl Document for Note {
        fn key(&self) -> String {
            self.id.clone()
        }
    }

    fn note(id: &str, tag: &str, rank: u32) -> Note {
        Note {
            id: id.to_string(),
            tag: tag.to_string(),
            rank,
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_key() {
        let notes = Collection::in_memory("notes");
        notes.insert_one(note("a", "x", 1)).await.unwrap();

        let err = notes.insert_one(note("a", "y", 2)).await.unwrap_err();
        assert!(matches!(err, PersistenceError::DuplicateKey { .. }));
        assert_eq!(notes.get("a").await.unwrap().tag, "x");
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let notes = Collection::in_memory("notes");
        notes.upsert(note("a", "x", 1)).await.unwrap();
        notes.upsert(note("a", "y", 2)).await.unwrap();

        assert_eq!(notes.count(|_| true).await, 1);
        assert_eq!(notes.get("a").await.unwrap().rank, 2);
    }

    #[tokio::test]
    async fn test_update_one_missing_returns_false() {
        let notes: Collection<Note> = Collection::in_memory("notes");
        assert!(!notes.update_one("nope", |n| n.rank = 9).await.unwrap());
    }

    #[tokio::test]
    async fn test_upsert_with_inserts_default_then_mutates() {
        let notes = Collection::in_memory("notes");
        let stored = notes
            .upsert_with("a", || note("a", "x", 0), |n| n.rank += 1)
            .await
            .unwrap();
        assert_eq!(stored.rank, 1);

        let stored = notes
            .upsert_with("a", || note("a", "x", 0), |n| n.rank += 1)
            .await
            .unwrap();
        assert_eq!(stored.rank, 2);
    }

    #[tokio::test]
    async fn test_find_sorted_and_limit() {
        let notes = Collection::in_memory("notes");
        notes.insert_one(note("a", "x", 3)).await.unwrap();
        notes.insert_one(note("b", "y", 1)).await.unwrap();
        notes.insert_one(note("c", "x", 2)).await.unwrap();

        let sorted = notes
            .find_sorted(|n| n.tag == "x", |a, b| a.rank.cmp(&b.rank), Some(1))
            .await;
        assert_eq!(sorted, vec![note("c", "x", 2)]);

        let groups = notes.group_count(|n| n.tag.clone()).await;
        assert_eq!(groups.get("x"), Some(&2));
        assert_eq!(groups.get("y"), Some(&1));
    }

    #[tokio::test]
    async fn test_delete_many() {
        let notes = Collection::in_memory("notes");
        notes.insert_one(note("a", "x", 3)).await.unwrap();
        notes.insert_one(note("b", "y", 1)).await.unwrap();

        assert_eq!(notes.delete_many(|n| n.tag == "x").await.unwrap(), 1);
        assert!(notes.get("a").await.is_none());
        assert!(!notes.delete_one("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_backed_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.json");

        {
            let notes = Collection::open("notes", &path).unwrap();
            notes.insert_one(note("a", "x", 1)).await.unwrap();
            notes.update_one("a", |n| n.rank = 5).await.unwrap();
        }

        let reopened: Collection<Note> = Collection::open("notes", &path).unwrap();
        assert_eq!(reopened.get("a").await.unwrap().rank, 5);
    }

    #[tokio::test]
    async fn test_require_not_found() {
        let notes: Collection<Note> = Collection::in_memory("notes");
        let err = notes.require("ghost").await.unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }
}
