//! Job-level tests for the autonomous engine against in-memory storage.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use syncara_autonomous::{AutonomousConfig, AutonomousEngine, AutonomousLoop, ChannelPoster};
use syncara_core::{ClientDirectory, ClientHandle};
use syncara_memory::LearningStore;
use syncara_models::{
    Assistant, ChatId, ConversationEntry, InteractionType, Mood, ScheduledTask,
    ScheduledTaskStatus, TaskKind, TaskStatus, UserId, UserProfile,
};
use syncara_persistence::DocumentStore;
use syncara_test_utils::{FixedClock, MockTransport, ScriptedModel};

struct Clients(Vec<ClientHandle>);

#[async_trait]
impl ClientDirectory for Clients {
    async fn clients(&self) -> Vec<ClientHandle> {
        self.0.clone()
    }
}

struct Harness {
    engine: Arc<AutonomousEngine>,
    learning: Arc<LearningStore>,
    store: Arc<DocumentStore>,
    transport: Arc<MockTransport>,
}

fn tz() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap()
}

/// 10:00 local, outside any peak hour used below.
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 3, 0, 0).unwrap()
}

fn harness(config: AutonomousConfig) -> Harness {
    let store = Arc::new(DocumentStore::in_memory());
    let learning = Arc::new(LearningStore::new(store.clone(), tz()));
    let transport = Arc::new(MockTransport::new(1, "Aeris", "Aeris_sync"));
    let clients: Arc<dyn ClientDirectory> = Arc::new(Clients(vec![ClientHandle {
        assistant: Assistant::new("aeris", "cred"),
        transport: transport.clone(),
    }]));
    let channel = Arc::new(ChannelPoster::new(
        None,
        Arc::new(ScriptedModel::new()),
        clients.clone(),
        store.clone(),
        tz(),
    ));
    let engine = Arc::new(AutonomousEngine::new(
        config,
        clients,
        learning.clone(),
        channel,
        Arc::new(FixedClock::new(now())),
        tz(),
    ));
    Harness {
        engine,
        learning,
        store,
        transport,
    }
}

/// A private-chat regular whose last question got a weak answer.
fn regular(user: i64, idle: Duration) -> UserProfile {
    let mut profile = UserProfile::new(UserId(user), "Rina", now() - Duration::days(60));
    profile.last_interaction = now() - idle;
    profile.total_interactions = 8;
    profile.context_counts.private = 8;
    profile.assistant_affinity.insert("aeris".into(), 8);
    profile.conversations.push(ConversationEntry {
        timestamp: now() - idle,
        message: "gimana cara deploy ke VPS?".into(),
        response: "hmm".into(),
        classified_type: InteractionType::Question,
        mood: Mood::Neutral,
        quality_score: 0.3,
        context_flags: Vec::new(),
    });
    profile
}

#[tokio::test]
async fn test_unreachable_user_is_skipped_and_audited() {
    let h = harness(AutonomousConfig::default());
    let mut profile = regular(7, Duration::hours(2));
    profile.unreachable = true;
    h.store.users.upsert(profile).await.unwrap();

    let summary = h.engine.activity_scan().await.unwrap();

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.sent, 0);
    assert_eq!(h.transport.sent_count().await, 0);

    let records = h.engine.audit().for_user(UserId(7)).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, TaskKind::ProactiveMessage);
    assert_eq!(records[0].status, TaskStatus::Skipped);
    assert_eq!(records[0].reason.as_deref(), Some("user unreachable"));
}

#[tokio::test]
async fn test_activity_scan_sends_once_then_cools_down() {
    let h = harness(AutonomousConfig::default());
    h.store.users.upsert(regular(7, Duration::hours(2))).await.unwrap();

    let first = h.engine.activity_scan().await.unwrap();
    assert_eq!(first.sent, 1);
    let sent = h.transport.sent_to(ChatId(7)).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.as_deref().unwrap().contains("gimana cara deploy ke VPS?"));

    let profile = h.learning.get_profile(UserId(7)).await.unwrap();
    assert_eq!(profile.last_proactive_at, Some(now()));

    let second = h.engine.activity_scan().await.unwrap();
    assert_eq!(second.examined, 1);
    assert_eq!(second.sent, 0);
    assert_eq!(h.transport.sent_count().await, 1);
    assert_eq!(h.engine.audit().for_user(UserId(7)).await.len(), 1);
}

#[tokio::test]
async fn test_refused_dm_marks_user_unreachable() {
    let h = harness(AutonomousConfig::default());
    h.store.users.upsert(regular(7, Duration::hours(2))).await.unwrap();
    h.transport.refuse_chat(ChatId(7)).await;

    let summary = h.engine.activity_scan().await.unwrap();
    assert_eq!(summary.failed, 1);

    let profile = h.learning.get_profile(UserId(7)).await.unwrap();
    assert!(profile.unreachable);
    assert!(profile.last_proactive_at.is_none());

    // the next scan skips without touching the transport
    h.transport.clear_sent().await;
    let again = h.engine.activity_scan().await.unwrap();
    assert_eq!(again.skipped, 1);
}

#[tokio::test]
async fn test_low_confidence_is_not_sent() {
    let h = harness(AutonomousConfig::default().with_confidence_threshold(0.95));
    h.store.users.upsert(regular(7, Duration::hours(2))).await.unwrap();

    let summary = h.engine.activity_scan().await.unwrap();
    assert_eq!(summary.examined, 1);
    assert_eq!(summary, syncara_autonomous::JobSummary { examined: 1, ..Default::default() });
    assert_eq!(h.transport.sent_count().await, 0);
}

#[tokio::test]
async fn test_proactive_sweep_respects_cap() {
    let config = AutonomousConfig {
        max_sweep_sends: 2,
        ..AutonomousConfig::default()
    }
    .with_send_delay(StdDuration::ZERO);
    let h = harness(config);
    for user in 10..14 {
        h.store.users.upsert(regular(user, Duration::hours(3))).await.unwrap();
    }

    let summary = h.engine.proactive_sweep().await.unwrap();
    assert_eq!(summary.sent, 2);
    assert_eq!(h.transport.sent_count().await, 2);
}

#[tokio::test]
async fn test_chat_health_reengages_quiet_users() {
    let h = harness(AutonomousConfig::default());
    h.store.users.upsert(regular(7, Duration::days(10))).await.unwrap();
    // too quiet to bother
    h.store.users.upsert(regular(8, Duration::days(45))).await.unwrap();

    let summary = h.engine.chat_health().await.unwrap();
    assert_eq!(summary.sent, 1);

    let sent = h.transport.sent_to(ChatId(7)).await;
    assert_eq!(sent.len(), 1);
    assert!(sent[0].text.as_deref().unwrap().contains("Sudah 10 hari"));
    assert!(h.transport.sent_to(ChatId(8)).await.is_empty());

    let profile = h.learning.get_profile(UserId(7)).await.unwrap();
    assert_eq!(profile.last_reengaged_at, Some(now()));

    let again = h.engine.chat_health().await.unwrap();
    assert_eq!(again.sent, 0);
}

#[tokio::test]
async fn test_due_reminder_is_delivered_to_its_chat() {
    let h = harness(AutonomousConfig::default());
    let due = ScheduledTask::reminder(
        ChatId(-100),
        Some(UserId(7)),
        "aeris",
        "minum obat",
        now() - Duration::minutes(1),
        now() - Duration::hours(1),
    );
    let later = ScheduledTask::reminder(
        ChatId(-100),
        Some(UserId(7)),
        "aeris",
        "rapat",
        now() + Duration::hours(1),
        now() - Duration::hours(1),
    );
    let (due_id, later_id) = (due.id.clone(), later.id.clone());
    h.store.scheduled_tasks.insert_one(due).await.unwrap();
    h.store.scheduled_tasks.insert_one(later).await.unwrap();

    let summary = h.engine.run_scheduled_tasks().await.unwrap();
    assert_eq!(summary.sent, 1);

    let sent = h.transport.sent_to(ChatId(-100)).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].text.as_deref(), Some("⏰ Pengingat: minum obat"));

    let done = h.store.scheduled_tasks.get(&due_id).await.unwrap();
    assert_eq!(done.status, ScheduledTaskStatus::Completed);
    let pending = h.store.scheduled_tasks.get(&later_id).await.unwrap();
    assert_eq!(pending.status, ScheduledTaskStatus::Pending);
}

#[tokio::test]
async fn test_optimiser_records_an_audit_entry() {
    let h = harness(AutonomousConfig::default());
    h.store.users.upsert(regular(7, Duration::hours(2))).await.unwrap();

    let summary = h.engine.optimise_learning().await.unwrap();
    assert_eq!(summary.examined, 1);

    let recent = h.engine.audit().recent(5).await;
    assert!(recent
        .iter()
        .any(|r| r.kind == TaskKind::LearningOptimization && r.status == TaskStatus::Executed));
}

#[tokio::test]
async fn test_loop_shuts_down_promptly() {
    let h = harness(AutonomousConfig::default());
    let runner = AutonomousLoop::new(h.engine.clone());

    runner.start().await;
    assert!(runner.is_running().await);

    tokio::time::timeout(StdDuration::from_secs(2), runner.shutdown())
        .await
        .expect("loop did not stop");
    assert!(!runner.is_running().await);
    assert_eq!(h.transport.sent_count().await, 0);
}
