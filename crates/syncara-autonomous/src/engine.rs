//! The job bodies run by the scheduler.

use std::sync::Arc;

use chrono::{DateTime, Duration as Span, FixedOffset, Utc};
use syncara_core::{ClientDirectory, ClientHandle, Clock};
use syncara_memory::LearningStore;
use syncara_models::{
    InteractionType, ScheduledTaskStatus, TaskKind, TaskStatus, UserProfile,
};
use syncara_persistence::DocumentStore;
use tracing::{debug, info, warn};

use crate::audit::AuditLog;
use crate::channel::ChannelPoster;
use crate::config::AutonomousConfig;
use crate::error::Result;
use crate::guard::{GuardedSender, SendOutcome};
use crate::proactive::{suggest, SuggestionReason};

/// Counts from one job iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub examined: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl JobSummary {
    fn tally(&mut self, outcome: &SendOutcome) {
        match outcome {
            SendOutcome::Sent(_) => self.sent += 1,
            SendOutcome::Skipped(_) => self.skipped += 1,
            SendOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Shared state and job bodies for the autonomous loop.
///
/// Each job method is one iteration; [`AutonomousLoop`](crate::AutonomousLoop)
/// decides when to call them.
pub struct AutonomousEngine {
    config: AutonomousConfig,
    clients: Arc<dyn ClientDirectory>,
    learning: Arc<LearningStore>,
    store: Arc<DocumentStore>,
    guard: GuardedSender,
    audit: AuditLog,
    channel: Arc<ChannelPoster>,
    clock: Arc<dyn Clock>,
    tz: FixedOffset,
}

impl AutonomousEngine {
    pub fn new(
        config: AutonomousConfig,
        clients: Arc<dyn ClientDirectory>,
        learning: Arc<LearningStore>,
        channel: Arc<ChannelPoster>,
        clock: Arc<dyn Clock>,
        tz: FixedOffset,
    ) -> Self {
        let store = learning.documents().clone();
        let audit = AuditLog::new(store.clone());
        Self {
            guard: GuardedSender::new(learning.clone(), audit.clone()),
            config,
            clients,
            learning,
            store,
            audit,
            channel,
            clock,
            tz,
        }
    }

    pub fn config(&self) -> &AutonomousConfig {
        &self.config
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn guard(&self) -> &GuardedSender {
        &self.guard
    }

    pub fn channel(&self) -> &Arc<ChannelPoster> {
        &self.channel
    }

    /// Sends one proactive message to each recently active user whose
    /// suggestion clears the confidence threshold.
    pub async fn activity_scan(&self) -> Result<JobSummary> {
        let now = self.clock.now();
        let candidates = self
            .learning
            .active_users(
                now,
                self.config.active_within,
                self.config.min_idle,
                self.config.min_interactions,
            )
            .await;

        let mut summary = JobSummary::default();
        for profile in candidates {
            summary.examined += 1;
            if self.in_cooldown(profile.last_proactive_at, self.config.proactive_cooldown, now) {
                continue;
            }
            let Some(suggestion) = suggest(&profile, now, self.tz) else {
                continue;
            };
            if suggestion.confidence <= self.config.confidence_threshold {
                continue;
            }
            let Some(client) = self.client_for(&profile).await else {
                warn!("No assistant client available for proactive message");
                break;
            };

            debug!(
                user_id = %profile.user_id,
                reason = %suggestion.reason,
                confidence = suggestion.confidence,
                "Proactive suggestion"
            );
            let outcome = self
                .guard
                .send_private(&client, profile.user_id, &suggestion.message, TaskKind::ProactiveMessage, now)
                .await;
            if outcome.is_sent() {
                self.learning.mark_proactive(profile.user_id, now).await?;
            }
            summary.tally(&outcome);
        }
        Ok(summary)
    }

    /// Per assistant, nudges up to `max_sweep_sends` users with an open
    /// question or a busy day, pausing between sends.
    pub async fn proactive_sweep(&self) -> Result<JobSummary> {
        let now = self.clock.now();
        let clients = self.clients.clients().await;
        let users = self
            .learning
            .active_users(now, Span::hours(24), self.config.min_idle, self.config.min_interactions)
            .await;

        let mut summary = JobSummary::default();
        for (index, client) in clients.iter().enumerate() {
            let mut sent_here = 0;
            for profile in &users {
                if sent_here >= self.config.max_sweep_sends {
                    break;
                }
                let owned = match profile.favorite_assistant() {
                    Some(id) => id == client.assistant.id,
                    None => index == 0,
                };
                if !owned
                    || self.in_cooldown(profile.last_proactive_at, self.config.proactive_cooldown, now)
                {
                    continue;
                }
                summary.examined += 1;
                let Some(message) = sweep_message(profile, now, self.tz) else {
                    continue;
                };

                if summary.sent > 0 && !self.config.send_delay.is_zero() {
                    tokio::time::sleep(self.config.send_delay).await;
                }
                let outcome = self
                    .guard
                    .send_private(client, profile.user_id, &message, TaskKind::ProactiveAssistance, now)
                    .await;
                if outcome.is_sent() {
                    sent_here += 1;
                    self.learning.mark_proactive(profile.user_id, now).await?;
                }
                summary.tally(&outcome);
            }
        }
        Ok(summary)
    }

    /// Delivers due reminders and scheduled messages.
    pub async fn run_scheduled_tasks(&self) -> Result<JobSummary> {
        let now = self.clock.now();
        let due = self
            .store
            .scheduled_tasks
            .find_sorted(|t| t.is_due(now), |a, b| a.due_at.cmp(&b.due_at), None)
            .await;

        let mut summary = JobSummary::default();
        for task in due {
            summary.examined += 1;
            let client = match self.clients.client(&task.assistant_id).await {
                Some(c) => Some(c),
                None => self.clients.clients().await.into_iter().next(),
            };
            let outcome = match client {
                Some(client) => {
                    let text = format!("⏰ Pengingat: {}", task.text);
                    self.guard
                        .send_chat(&client, task.chat_id, task.user_id, &text, TaskKind::ScheduledTask, now)
                        .await
                }
                None => SendOutcome::Failed("no assistant client available".to_string()),
            };

            let (status, error) = match &outcome {
                SendOutcome::Sent(_) => (ScheduledTaskStatus::Completed, None),
                SendOutcome::Skipped(reason) | SendOutcome::Failed(reason) => {
                    (ScheduledTaskStatus::Failed, Some(reason.clone()))
                }
            };
            self.store
                .scheduled_tasks
                .update_one(&task.id, |t| {
                    t.status = status;
                    t.error = error;
                })
                .await?;
            summary.tally(&outcome);
        }
        Ok(summary)
    }

    /// Re-engages users quiet for 7 to 30 days.
    pub async fn chat_health(&self) -> Result<JobSummary> {
        let now = self.clock.now();
        let candidates = self
            .learning
            .inactive_users(
                now,
                self.config.inactive_min,
                self.config.inactive_max,
                self.config.reengage_min_interactions,
            )
            .await;

        let mut summary = JobSummary::default();
        for profile in candidates {
            summary.examined += 1;
            if self.in_cooldown(profile.last_reengaged_at, self.config.reengage_cooldown, now) {
                continue;
            }
            let Some(client) = self.client_for(&profile).await else {
                warn!("No assistant client available for re-engagement");
                break;
            };
            let days = (now - profile.last_interaction).num_days();
            let message = format!(
                "Hai {}! Sudah {} hari kita nggak ngobrol nih. Aku kangen, gimana kabarmu? 😊",
                profile.first_name, days
            );
            let outcome = self
                .guard
                .send_private(&client, profile.user_id, &message, TaskKind::ReEngagement, now)
                .await;
            if outcome.is_sent() {
                self.learning.mark_reengaged(profile.user_id, now).await?;
            }
            summary.tally(&outcome);
        }
        Ok(summary)
    }

    /// Re-derives reply preferences and purges old audit records.
    pub async fn optimise_learning(&self) -> Result<JobSummary> {
        let now = self.clock.now();
        let mut summary = JobSummary::default();

        for profile in self.learning.all_profiles().await {
            summary.examined += 1;
            match self.learning.optimise_preferences(profile.user_id).await {
                Ok(true) => summary.sent += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(user_id = %profile.user_id, error = %e, "Preference optimisation failed");
                    summary.failed += 1;
                }
            }
        }

        let purged = self
            .audit
            .purge_older_than(now - self.config.audit_retention)
            .await?;
        info!(
            users = summary.examined,
            updated = summary.sent,
            purged,
            "Learning optimisation complete"
        );
        self.audit
            .record(
                TaskKind::LearningOptimization,
                None,
                TaskStatus::Executed,
                Some(format!("{} profiles updated, {} audit records purged", summary.sent, purged)),
                now,
            )
            .await?;
        Ok(summary)
    }

    /// One channel auto-poster tick.
    pub async fn channel_tick(&self) -> Result<JobSummary> {
        let posted = self.channel.tick(self.clock.now()).await;
        Ok(JobSummary {
            sent: posted.len(),
            ..JobSummary::default()
        })
    }

    fn in_cooldown(&self, last: Option<DateTime<Utc>>, cooldown: Span, now: DateTime<Utc>) -> bool {
        last.is_some_and(|at| now - at < cooldown)
    }

    /// The user's favourite running assistant, else the first running one.
    async fn client_for(&self, profile: &UserProfile) -> Option<ClientHandle> {
        if let Some(id) = profile.favorite_assistant() {
            if let Some(client) = self.clients.client(id).await {
                return Some(client);
            }
        }
        self.clients.clients().await.into_iter().next()
    }
}

/// Sweep message for users with an open question or five or more
/// exchanges in the last day.
fn sweep_message(profile: &UserProfile, now: DateTime<Utc>, tz: FixedOffset) -> Option<String> {
    if let Some(s) = suggest(profile, now, tz).filter(|s| s.reason == SuggestionReason::UnresolvedQuestion) {
        return Some(s.message);
    }
    let busy = profile
        .conversations
        .iter()
        .filter(|e| now - e.timestamp <= Span::hours(24))
        .count()
        >= 5;
    let asked = profile
        .conversations
        .iter()
        .any(|e| e.classified_type == InteractionType::Question);
    busy.then(|| {
        if asked {
            format!(
                "Hai {}! Hari ini kamu banyak bertanya, ada yang masih bikin penasaran? Aku siap bantu 😊",
                profile.first_name
            )
        } else {
            format!(
                "Hai {}! Seru banget ngobrol sama kamu hari ini. Ada lagi yang bisa aku bantu? ✨",
                profile.first_name
            )
        }
    })
}
