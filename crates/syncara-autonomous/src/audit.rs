//! Append-only audit log of autonomous decisions.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use syncara_models::{AutonomousTaskRecord, TaskKind, TaskStatus, UserId};
use syncara_persistence::DocumentStore;
use tracing::debug;

use crate::error::Result;

/// Writes [`AutonomousTaskRecord`]s to the `autonomous_tasks` collection.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<DocumentStore>,
}

impl AuditLog {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        kind: TaskKind,
        user: Option<UserId>,
        status: TaskStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        debug!(%kind, ?user, ?status, reason = reason.as_deref().unwrap_or(""), "Audit");
        let record = AutonomousTaskRecord::new(kind, user, status, reason, now);
        self.store.autonomous_tasks.insert_one(record).await?;
        Ok(())
    }

    /// Most recent records first.
    pub async fn recent(&self, limit: usize) -> Vec<AutonomousTaskRecord> {
        self.store
            .autonomous_tasks
            .find_sorted(|_| true, |a, b| b.timestamp.cmp(&a.timestamp), Some(limit))
            .await
    }

    pub async fn for_user(&self, user: UserId) -> Vec<AutonomousTaskRecord> {
        self.store
            .autonomous_tasks
            .find_sorted(
                |r| r.user_id == Some(user),
                |a, b| a.timestamp.cmp(&b.timestamp),
                None,
            )
            .await
    }

    /// Record counts per status label since `since`.
    pub async fn summary(&self, since: DateTime<Utc>) -> BTreeMap<&'static str, usize> {
        self.store
            .autonomous_tasks
            .find(|r| r.timestamp >= since, None)
            .await
            .iter()
            .fold(BTreeMap::new(), |mut acc, r| {
                *acc.entry(status_label(r.status)).or_insert(0) += 1;
                acc
            })
    }

    /// Deletes records older than `cutoff`.
    pub async fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let removed = self
            .store
            .autonomous_tasks
            .delete_many(|r| r.timestamp < cutoff)
            .await?;
        Ok(removed)
    }
}

fn status_label(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Executed => "executed",
        TaskStatus::Failed => "failed",
        TaskStatus::Skipped => "skipped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_record_and_purge() {
        let audit = AuditLog::new(Arc::new(DocumentStore::in_memory()));
        let now = Utc::now();

        audit
            .record(TaskKind::ReEngagement, Some(UserId(1)), TaskStatus::Executed, None, now - Duration::days(40))
            .await
            .unwrap();
        audit
            .record(TaskKind::ProactiveMessage, Some(UserId(1)), TaskStatus::Skipped, Some("user unreachable".into()), now)
            .await
            .unwrap();

        assert_eq!(audit.for_user(UserId(1)).await.len(), 2);
        assert_eq!(audit.purge_older_than(now - Duration::days(30)).await.unwrap(), 1);

        let left = audit.recent(10).await;
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].status, TaskStatus::Skipped);
        assert_eq!(audit.summary(now - Duration::hours(1)).await.get("skipped"), Some(&1));
    }
}
