//! Owner commands driven against a mocked assistant session.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{FixedOffset, TimeZone, Utc};
use syncara_agent::PersonaRegistry;
use syncara_autonomous::ChannelPoster;
use syncara_core::Transport;
use syncara_handlers::{register_all, HandlerServices, ImageRequest, ImageService, MusicPlayer};
use syncara_memory::LearningStore;
use syncara_models::{Assistant, ChatId, InboundMessage, MediaSource, UserId};
use syncara_orchestrator::{
    AssistantManager, Capabilities, Orchestrator, OrchestratorConfig, Session, SessionLauncher,
};
use syncara_persistence::DocumentStore;
use syncara_shortcode::{DeferredBuffer, Dispatcher, ShortcodeRegistry};
use syncara_telegram::{Operator, OwnerCommand};
use syncara_test_utils::{FixedClock, MockTransport, ScriptedModel};
use tokio::sync::mpsc;

const OWNER: i64 = 42;
const CHANNEL: i64 = -1001;

struct MockSession(Arc<MockTransport>);

#[async_trait]
impl Session for MockSession {
    fn transport(&self) -> Arc<dyn Transport> {
        self.0.clone()
    }

    async fn stop(&self) {}
}

struct MockLauncher(Arc<MockTransport>);

#[async_trait]
impl SessionLauncher for MockLauncher {
    async fn launch(
        &self,
        _assistant: &Assistant,
        _inbound: mpsc::Sender<InboundMessage>,
    ) -> syncara_orchestrator::Result<Box<dyn Session>> {
        Ok(Box::new(MockSession(self.0.clone())))
    }
}

struct NoImages;

#[async_trait]
impl ImageService for NoImages {
    async fn generate(&self, _request: &ImageRequest) -> syncara_handlers::Result<MediaSource> {
        Ok(MediaSource::url("https://img.test/x.png"))
    }
}

struct Harness {
    operator: Operator,
    transport: Arc<MockTransport>,
}

fn tz() -> FixedOffset {
    FixedOffset::east_opt(7 * 3600).unwrap()
}

fn harness() -> Harness {
    let store = Arc::new(DocumentStore::in_memory());
    let learning = Arc::new(LearningStore::new(store.clone(), tz()));
    let transport = Arc::new(MockTransport::new(900, "Aeris", "Aeris_sync"));
    let model = Arc::new(ScriptedModel::new());
    let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 18, 5, 0, 0).unwrap()));

    let manager = Arc::new(AssistantManager::new(
        Arc::new(MockLauncher(transport.clone())),
        vec![Assistant::new("aeris", "cred")],
    ));
    let channel = Arc::new(ChannelPoster::new(
        Some(ChatId(CHANNEL)),
        model.clone(),
        manager.clone(),
        store.clone(),
        tz(),
    ));

    let mut registry = ShortcodeRegistry::new();
    register_all(
        &mut registry,
        &HandlerServices {
            store: store.clone(),
            learning: learning.clone(),
            channel: channel.clone(),
            images: Arc::new(NoImages),
            music: Arc::new(MusicPlayer::new()),
            tz: tz(),
        },
    )
    .unwrap();
    registry.seal();

    let caps = Capabilities {
        store,
        learning,
        model,
        personas: Arc::new(PersonaRegistry::new()),
        dispatcher: Dispatcher::new(Arc::new(registry)),
        deferred: Arc::new(DeferredBuffer::new(clock.clone())),
        manager,
        clock: clock.clone(),
    };
    let orchestrator = Arc::new(Orchestrator::new(
        caps,
        OrchestratorConfig::new(vec![UserId(OWNER)], tz()),
    ));

    Harness {
        operator: Operator::new(orchestrator, channel, clock),
        transport,
    }
}

#[tokio::test]
async fn test_owner_check() {
    let h = harness();
    assert!(h.operator.is_owner(UserId(OWNER)));
    assert!(!h.operator.is_owner(UserId(7)));
}

#[tokio::test]
async fn test_start_stop_assistant() {
    let h = harness();

    let listing = h.operator.execute(OwnerCommand::Assistants).await;
    assert!(listing.contains("aeris"));
    assert!(listing.contains("belum jalan"));

    let started = h
        .operator
        .execute(OwnerCommand::StartAssistant("aeris".into()))
        .await;
    assert!(started.starts_with("✅"), "{}", started);
    assert!(started.contains("@Aeris_sync"));
    assert!(h.operator.execute(OwnerCommand::Assistants).await.contains("🟢 aktif"));

    let stopped = h
        .operator
        .execute(OwnerCommand::StopAssistant("aeris".into()))
        .await;
    assert!(stopped.starts_with("✅"), "{}", stopped);

    // a stopped assistant stays down for the rest of the process
    let again = h
        .operator
        .execute(OwnerCommand::StartAssistant("aeris".into()))
        .await;
    assert!(again.starts_with("❌"), "{}", again);

    let unknown = h
        .operator
        .execute(OwnerCommand::StartAssistant("zed".into()))
        .await;
    assert!(unknown.starts_with("❌"));

    let empty = h.operator.execute(OwnerCommand::StopAssistant(" ".into())).await;
    assert!(empty.starts_with("Format"));
}

#[tokio::test]
async fn test_persona_remap() {
    let h = harness();
    h.operator
        .execute(OwnerCommand::StartAssistant("aeris".into()))
        .await;

    let ok = h
        .operator
        .execute(OwnerCommand::Persona("aeris kaelen".into()))
        .await;
    assert!(ok.starts_with("✅"), "{}", ok);
    assert!(h
        .operator
        .execute(OwnerCommand::Assistants)
        .await
        .contains("persona kaelen"));

    let bad = h
        .operator
        .execute(OwnerCommand::Persona("aeris nobody".into()))
        .await;
    assert!(bad.starts_with("❌"));

    let usage = h.operator.execute(OwnerCommand::Persona("aeris".into())).await;
    assert!(usage.contains("aeris"));
    assert!(usage.contains("kaelen"));
}

#[tokio::test]
async fn test_channel_controls() {
    let h = harness();

    let started = h.operator.execute(OwnerCommand::Channel("start".into())).await;
    assert!(started.contains("dimulai"));
    let again = h.operator.execute(OwnerCommand::Channel("START".into())).await;
    assert!(again.contains("sudah berjalan"));

    let status = h.operator.execute(OwnerCommand::Channel("status".into())).await;
    assert!(status.contains("🟢 aktif"));
    assert!(status.contains(&CHANNEL.to_string()));

    let schedule = h.operator.execute(OwnerCommand::Channel("schedule".into())).await;
    assert!(schedule.starts_with("Jadwal:"));
    assert!(schedule.lines().count() > 1);

    let stopped = h.operator.execute(OwnerCommand::Channel("stop".into())).await;
    assert!(stopped.contains("dihentikan"));
    let status = h.operator.execute(OwnerCommand::Channel(String::new())).await;
    assert!(status.contains("🔴 berhenti"));

    let bogus = h.operator.execute(OwnerCommand::Channel("reboot".into())).await;
    assert!(bogus.contains("tidak dikenal"));
}

#[tokio::test]
async fn test_manual_post_once_per_bucket() {
    let h = harness();
    h.operator
        .execute(OwnerCommand::StartAssistant("aeris".into()))
        .await;

    let posted = h.operator.execute(OwnerCommand::Post("tip".into())).await;
    assert!(posted.starts_with("✅"), "{}", posted);
    assert_eq!(h.transport.sent_to(ChatId(CHANNEL)).await.len(), 1);

    let repeat = h.operator.execute(OwnerCommand::Post("daily_tip".into())).await;
    assert!(repeat.contains("sudah diposting"), "{}", repeat);
    assert_eq!(h.transport.sent_to(ChatId(CHANNEL)).await.len(), 1);

    let stats = h.operator.execute(OwnerCommand::Channel("stats".into())).await;
    assert!(stats.contains("Total post: 1"));
}

#[tokio::test]
async fn test_unknown_post_kind_lists_kinds() {
    let h = harness();
    let reply = h.operator.execute(OwnerCommand::Post("gossip".into())).await;
    assert!(reply.starts_with("❌"));
    assert!(reply.contains("daily_tip"));
    assert!(reply.contains("ai_trend"));
}

#[tokio::test]
async fn test_shortcodes_and_help() {
    let h = harness();
    let docs = h.operator.execute(OwnerCommand::Shortcodes).await;
    assert!(docs.contains("shortcode terdaftar"));
    assert!(docs.contains("CANVAS:CREATE"));

    let help = h.operator.execute(OwnerCommand::Help).await;
    assert!(help.contains("/startassistant"));

    let status = h.operator.execute(OwnerCommand::Status).await;
    assert!(status.contains("Asisten:"));
    assert!(status.contains("Auto-post"));
}
