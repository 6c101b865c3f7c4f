//! The guarded send path for unsolicited messages.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use syncara_core::ClientHandle;
use syncara_memory::LearningStore;
use syncara_models::{ChatId, MessageId, TaskKind, TaskStatus, UserId};
use tracing::{debug, info, warn};

use crate::audit::AuditLog;

/// Result of a guarded send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent(MessageId),
    /// Not attempted; holds the reason.
    Skipped(String),
    /// Attempted and refused or failed; holds the error.
    Failed(String),
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }
}

/// Sends on behalf of the autonomous jobs.
///
/// A private message is only attempted when the target profile exists, is
/// not flagged unreachable and has talked to an assistant in a private
/// chat before. An invalid-peer refusal flags the user unreachable; a
/// successful DM clears the flag. Every call leaves one audit record.
#[derive(Clone)]
pub struct GuardedSender {
    learning: Arc<LearningStore>,
    audit: AuditLog,
}

impl GuardedSender {
    pub fn new(learning: Arc<LearningStore>, audit: AuditLog) -> Self {
        Self { learning, audit }
    }

    /// Direct message to `user`.
    pub async fn send_private(
        &self,
        client: &ClientHandle,
        user: UserId,
        text: &str,
        kind: TaskKind,
        now: DateTime<Utc>,
    ) -> SendOutcome {
        let outcome = match self.learning.get_profile(user).await {
            None => SendOutcome::Skipped("unknown user".to_string()),
            Some(profile) if profile.unreachable => {
                SendOutcome::Skipped("user unreachable".to_string())
            }
            Some(profile) if !profile.has_private_history() => {
                SendOutcome::Skipped("no private chat history".to_string())
            }
            Some(_) => self.deliver(client, user.private_chat(), Some(user), text).await,
        };
        self.audit_outcome(kind, Some(user), &outcome, now).await;
        outcome
    }

    /// Message to a chat the user asked us to post in, e.g. a reminder set
    /// in a group. Falls back to [`send_private`](Self::send_private) when
    /// `chat` is the user's private chat.
    pub async fn send_chat(
        &self,
        client: &ClientHandle,
        chat: ChatId,
        user: Option<UserId>,
        text: &str,
        kind: TaskKind,
        now: DateTime<Utc>,
    ) -> SendOutcome {
        if let Some(user) = user.filter(|u| u.private_chat() == chat) {
            return self.send_private(client, user, text, kind, now).await;
        }
        let outcome = self.deliver(client, chat, None, text).await;
        self.audit_outcome(kind, user, &outcome, now).await;
        outcome
    }

    async fn deliver(
        &self,
        client: &ClientHandle,
        chat: ChatId,
        dm_user: Option<UserId>,
        text: &str,
    ) -> SendOutcome {
        match client.transport.send_text(chat, text, None).await {
            Ok(id) => {
                if let Some(user) = dm_user {
                    if let Err(e) = self.learning.mark_reachable(user).await {
                        warn!(user_id = %user, error = %e, "Failed to clear unreachable flag");
                    }
                }
                debug!(chat_id = %chat, assistant = %client.assistant.id, "Autonomous message sent");
                SendOutcome::Sent(id)
            }
            Err(e) if e.is_invalid_peer() => {
                if let Some(user) = dm_user {
                    warn!(user_id = %user, error = %e, "DM refused, marking user unreachable");
                    if let Err(err) = self.learning.set_unreachable(user).await {
                        warn!(user_id = %user, error = %err, "Failed to set unreachable flag");
                    }
                } else {
                    warn!(chat_id = %chat, error = %e, "Chat refused message");
                }
                SendOutcome::Failed(e.to_string())
            }
            Err(e) => {
                warn!(chat_id = %chat, error = %e, "Autonomous send failed");
                SendOutcome::Failed(e.to_string())
            }
        }
    }

    async fn audit_outcome(
        &self,
        kind: TaskKind,
        user: Option<UserId>,
        outcome: &SendOutcome,
        now: DateTime<Utc>,
    ) {
        let (status, reason) = match outcome {
            SendOutcome::Sent(_) => (TaskStatus::Executed, None),
            SendOutcome::Skipped(reason) => {
                info!(%kind, ?user, reason = %reason, "Autonomous send skipped");
                (TaskStatus::Skipped, Some(reason.clone()))
            }
            SendOutcome::Failed(error) => (TaskStatus::Failed, Some(error.clone())),
        };
        if let Err(e) = self.audit.record(kind, user, status, reason, now).await {
            warn!(error = %e, "Failed to write audit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use syncara_core::TransportError;
    use syncara_models::{Assistant, ChatKind, InteractionContext, Sender};
    use syncara_persistence::DocumentStore;
    use syncara_test_utils::MockTransport;

    struct Fixture {
        guard: GuardedSender,
        learning: Arc<LearningStore>,
        audit: AuditLog,
        transport: Arc<MockTransport>,
        client: ClientHandle,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(DocumentStore::in_memory());
        let learning = Arc::new(LearningStore::new(
            store.clone(),
            FixedOffset::east_opt(7 * 3600).unwrap(),
        ));
        let audit = AuditLog::new(store);
        let transport = Arc::new(MockTransport::new(1, "Aeris", "Aeris_sync"));
        let client = ClientHandle {
            assistant: Assistant::new("aeris", "cred"),
            transport: transport.clone(),
        };
        Fixture {
            guard: GuardedSender::new(learning.clone(), audit.clone()),
            learning,
            audit,
            transport,
            client,
        }
    }

    async fn seed(learning: &LearningStore, user: i64, kind: ChatKind) {
        let ctx = InteractionContext {
            chat_id: if kind == ChatKind::Private { UserId(user).private_chat() } else { ChatId(-100) },
            chat_kind: kind,
            assistant_id: "aeris".into(),
            request_greeting: false,
        };
        learning
            .upsert_user(&Sender::new(UserId(user), "Rina"), &ctx, Utc::now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sends_to_known_private_user() {
        let f = fixture();
        seed(&f.learning, 7, ChatKind::Private).await;

        let outcome = f
            .guard
            .send_private(&f.client, UserId(7), "hai", TaskKind::ProactiveMessage, Utc::now())
            .await;
        assert!(outcome.is_sent());
        assert_eq!(f.transport.sent_to(ChatId(7)).await.len(), 1);
        assert_eq!(f.audit.for_user(UserId(7)).await[0].status, TaskStatus::Executed);
    }

    #[tokio::test]
    async fn test_skips_without_private_history() {
        let f = fixture();
        seed(&f.learning, 7, ChatKind::Group).await;

        let outcome = f
            .guard
            .send_private(&f.client, UserId(7), "hai", TaskKind::ReEngagement, Utc::now())
            .await;
        assert_eq!(outcome, SendOutcome::Skipped("no private chat history".into()));
        assert_eq!(f.transport.sent_count().await, 0);
    }

    #[tokio::test]
    async fn test_skips_unknown_user() {
        let f = fixture();
        let outcome = f
            .guard
            .send_private(&f.client, UserId(99), "hai", TaskKind::ReEngagement, Utc::now())
            .await;
        assert_eq!(outcome, SendOutcome::Skipped("unknown user".into()));
    }

    #[tokio::test]
    async fn test_invalid_peer_sets_unreachable_and_blocks_next_send() {
        let f = fixture();
        seed(&f.learning, 7, ChatKind::Private).await;
        f.transport.refuse_chat(ChatId(7)).await;

        let first = f
            .guard
            .send_private(&f.client, UserId(7), "hai", TaskKind::ReEngagement, Utc::now())
            .await;
        assert!(matches!(first, SendOutcome::Failed(_)));
        assert!(f.learning.get_profile(UserId(7)).await.unwrap().unreachable);

        let second = f
            .guard
            .send_private(&f.client, UserId(7), "hai", TaskKind::ReEngagement, Utc::now())
            .await;
        assert_eq!(second, SendOutcome::Skipped("user unreachable".into()));
    }

    #[tokio::test]
    async fn test_other_errors_do_not_flag_user() {
        let f = fixture();
        seed(&f.learning, 7, ChatKind::Private).await;
        f.transport
            .fail_op("send_text", TransportError::Network("timeout".into()))
            .await;

        let outcome = f
            .guard
            .send_private(&f.client, UserId(7), "hai", TaskKind::ReEngagement, Utc::now())
            .await;
        assert!(matches!(outcome, SendOutcome::Failed(_)));
        assert!(!f.learning.get_profile(UserId(7)).await.unwrap().unreachable);
    }

    #[tokio::test]
    async fn test_group_send_bypasses_profile_checks() {
        let f = fixture();
        let outcome = f
            .guard
            .send_chat(&f.client, ChatId(-100), Some(UserId(5)), "⏰", TaskKind::ScheduledTask, Utc::now())
            .await;
        assert!(outcome.is_sent());
        assert_eq!(f.transport.sent_to(ChatId(-100)).await.len(), 1);
    }
}
