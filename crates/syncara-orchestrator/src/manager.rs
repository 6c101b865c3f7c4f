//! Lifecycle of the assistant client sessions.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use syncara_core::{ClientDirectory, ClientHandle, Transport};
use syncara_models::{Assistant, InboundMessage, UserId};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::error::{OrchestratorError, Result};

/// Capacity of each assistant's inbound queue.
const INBOUND_QUEUE: usize = 256;

/// A connected platform session.
#[async_trait]
pub trait Session: Send + Sync {
    fn transport(&self) -> Arc<dyn Transport>;

    /// Disconnects; no more messages are forwarded afterwards.
    async fn stop(&self);
}

/// Brings assistant sessions up.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Connects `assistant` and forwards every message it receives into
    /// `inbound`, in arrival order.
    async fn launch(
        &self,
        assistant: &Assistant,
        inbound: mpsc::Sender<InboundMessage>,
    ) -> Result<Box<dyn Session>>;
}

/// Lifecycle state reported by [`AssistantManager::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssistantState {
    Idle,
    Running { since: DateTime<Utc> },
    Stopped,
}

#[derive(Debug, Clone)]
pub struct AssistantStatus {
    pub assistant: Assistant,
    pub state: AssistantState,
}

struct Running {
    client: ClientHandle,
    session: Box<dyn Session>,
    started_at: DateTime<Utc>,
}

/// Starts, stops and looks up the configured assistants.
///
/// An assistant that has been stopped cannot be started again in the same
/// process, and nothing starts after [`shutdown`](Self::shutdown).
pub struct AssistantManager {
    launcher: Arc<dyn SessionLauncher>,
    configured: RwLock<Vec<Assistant>>,
    /// Running sessions in start order.
    running: RwLock<Vec<Running>>,
    stopped: RwLock<HashSet<String>>,
    shut_down: AtomicBool,
}

impl AssistantManager {
    pub fn new(launcher: Arc<dyn SessionLauncher>, assistants: Vec<Assistant>) -> Self {
        Self {
            launcher,
            configured: RwLock::new(assistants),
            running: RwLock::new(Vec::new()),
            stopped: RwLock::new(HashSet::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Starts the assistant and returns its client plus the queue of
    /// messages it receives.
    pub async fn start(
        &self,
        id: &str,
    ) -> Result<(ClientHandle, mpsc::Receiver<InboundMessage>)> {
        if self.shut_down.load(Ordering::SeqCst) {
            return Err(OrchestratorError::ShutDown);
        }
        if self.stopped.read().await.contains(id) {
            return Err(OrchestratorError::StoppedForProcess(id.to_string()));
        }
        if self.is_running(id).await {
            return Err(OrchestratorError::AlreadyRunning(id.to_string()));
        }
        let mut assistant = self
            .configured(id)
            .await
            .ok_or_else(|| OrchestratorError::UnknownAssistant(id.to_string()))?;
        if !assistant.enabled {
            return Err(OrchestratorError::Launch {
                assistant: id.to_string(),
                message: "assistant is disabled".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(INBOUND_QUEUE);
        let session = self.launcher.launch(&assistant, tx).await?;
        let transport = session.transport();
        let identity = transport.identity();
        assistant.user_id = Some(identity.user_id);
        if let Some(username) = identity.username {
            assistant.handle = username;
        }

        let client = ClientHandle {
            assistant: assistant.clone(),
            transport,
        };
        let mut running = self.running.write().await;
        // another start may have won the race while the session was launching
        if running.iter().any(|r| r.client.assistant.id == id) {
            drop(running);
            session.stop().await;
            return Err(OrchestratorError::AlreadyRunning(id.to_string()));
        }
        running.push(Running {
            client: client.clone(),
            session,
            started_at: Utc::now(),
        });
        info!(
            assistant = %id,
            user_id = %identity.user_id,
            handle = %assistant.handle,
            "Assistant started"
        );
        Ok((client, rx))
    }

    /// Stops a running assistant for the rest of the process lifetime.
    pub async fn stop(&self, id: &str) -> Result<()> {
        let entry = {
            let mut running = self.running.write().await;
            let index = running
                .iter()
                .position(|r| r.client.assistant.id == id)
                .ok_or_else(|| OrchestratorError::NotRunning(id.to_string()))?;
            running.remove(index)
        };
        self.stopped.write().await.insert(id.to_string());
        entry.session.stop().await;
        info!(assistant = %id, "Assistant stopped");
        Ok(())
    }

    /// Stops every running assistant and refuses further starts.
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        let ids: Vec<String> = self
            .running
            .read()
            .await
            .iter()
            .map(|r| r.client.assistant.id.clone())
            .collect();
        for id in ids {
            if let Err(e) = self.stop(&id).await {
                warn!(assistant = %id, error = %e, "Failed to stop assistant during shutdown");
            }
        }
        debug!("Assistant manager shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    pub async fn is_running(&self, id: &str) -> bool {
        self.running
            .read()
            .await
            .iter()
            .any(|r| r.client.assistant.id == id)
    }

    /// The configuration entry for `id`.
    pub async fn configured(&self, id: &str) -> Option<Assistant> {
        self.configured
            .read()
            .await
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    pub async fn configured_ids(&self) -> Vec<String> {
        self.configured.read().await.iter().map(|a| a.id.clone()).collect()
    }

    /// The running client whose account username is `username`.
    pub async fn by_username(&self, username: &str) -> Option<ClientHandle> {
        let username = username.trim_start_matches('@');
        self.running
            .read()
            .await
            .iter()
            .find(|r| r.client.assistant.handle.eq_ignore_ascii_case(username))
            .map(|r| r.client.clone())
    }

    /// Whether `user` is the account of a running assistant.
    pub async fn is_assistant_account(&self, user: UserId) -> bool {
        self.running
            .read()
            .await
            .iter()
            .any(|r| r.client.assistant.user_id == Some(user))
    }

    /// Re-maps an assistant to another persona, running or not.
    pub async fn set_persona(&self, id: &str, persona: &str) -> Result<()> {
        {
            let mut configured = self.configured.write().await;
            let assistant = configured
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| OrchestratorError::UnknownAssistant(id.to_string()))?;
            assistant.persona_tag = persona.to_string();
        }
        if let Some(entry) = self
            .running
            .write()
            .await
            .iter_mut()
            .find(|r| r.client.assistant.id == id)
        {
            entry.client.assistant.persona_tag = persona.to_string();
        }
        info!(assistant = %id, persona = %persona, "Persona updated");
        Ok(())
    }

    /// Every configured assistant with its lifecycle state, in
    /// configuration order.
    pub async fn status(&self) -> Vec<AssistantStatus> {
        let configured = self.configured.read().await.clone();
        let running = self.running.read().await;
        let stopped = self.stopped.read().await;
        configured
            .into_iter()
            .map(|assistant| {
                if let Some(r) = running.iter().find(|r| r.client.assistant.id == assistant.id) {
                    AssistantStatus {
                        assistant: r.client.assistant.clone(),
                        state: AssistantState::Running { since: r.started_at },
                    }
                } else if stopped.contains(&assistant.id) {
                    AssistantStatus {
                        assistant,
                        state: AssistantState::Stopped,
                    }
                } else {
                    AssistantStatus {
                        assistant,
                        state: AssistantState::Idle,
                    }
                }
            })
            .collect()
    }
}

#[async_trait]
impl ClientDirectory for AssistantManager {
    async fn clients(&self) -> Vec<ClientHandle> {
        self.running
            .read()
            .await
            .iter()
            .map(|r| r.client.clone())
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use syncara_test_utils::MockTransport;
    use tokio::sync::Mutex;

    /// Launches [`MockTransport`] sessions and keeps their inbound senders.
    #[derive(Default)]
    pub struct MockLauncher {
        pub transports: Mutex<HashMap<String, Arc<MockTransport>>>,
        pub inbound: Mutex<HashMap<String, mpsc::Sender<InboundMessage>>>,
        pub stops: Arc<Mutex<Vec<String>>>,
    }

    struct MockSession {
        id: String,
        transport: Arc<MockTransport>,
        stops: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Session for MockSession {
        fn transport(&self) -> Arc<dyn Transport> {
            self.transport.clone()
        }

        async fn stop(&self) {
            self.stops.lock().await.push(self.id.clone());
        }
    }

    #[async_trait]
    impl SessionLauncher for MockLauncher {
        async fn launch(
            &self,
            assistant: &Assistant,
            inbound: mpsc::Sender<InboundMessage>,
        ) -> Result<Box<dyn Session>> {
            let user_id = 900 + self.transports.lock().await.len() as i64;
            let transport = Arc::new(MockTransport::new(
                user_id,
                &assistant.display_name,
                &format!("{}_sync", assistant.display_name),
            ));
            self.transports
                .lock()
                .await
                .insert(assistant.id.clone(), transport.clone());
            self.inbound.lock().await.insert(assistant.id.clone(), inbound);
            Ok(Box::new(MockSession {
                id: assistant.id.clone(),
                transport,
                stops: self.stops.clone(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockLauncher;
    use super::*;

    fn manager() -> (AssistantManager, Arc<MockLauncher>) {
        let launcher = Arc::new(MockLauncher::default());
        let manager = AssistantManager::new(
            launcher.clone(),
            vec![Assistant::new("aeris", "s1"), Assistant::new("kaelen", "s2")],
        );
        (manager, launcher)
    }

    #[tokio::test]
    async fn test_start_fills_identity() {
        let (manager, _) = manager();
        let (client, _rx) = manager.start("aeris").await.unwrap();
        assert_eq!(client.assistant.user_id, Some(UserId(900)));
        assert_eq!(client.assistant.handle, "Aeris_sync");

        assert!(manager.by_username("@aeris_SYNC").await.is_some());
        assert!(manager.is_assistant_account(UserId(900)).await);
        assert_eq!(manager.clients().await.len(), 1);
        assert!(matches!(
            manager.start("aeris").await,
            Err(OrchestratorError::AlreadyRunning(_))
        ));
        assert!(matches!(
            manager.start("nobody").await,
            Err(OrchestratorError::UnknownAssistant(_))
        ));
    }

    #[tokio::test]
    async fn test_stopped_assistant_cannot_restart() {
        let (manager, launcher) = manager();
        manager.start("aeris").await.unwrap();
        manager.stop("aeris").await.unwrap();

        assert_eq!(*launcher.stops.lock().await, vec!["aeris".to_string()]);
        assert!(manager.client("aeris").await.is_none());
        assert!(matches!(
            manager.start("aeris").await,
            Err(OrchestratorError::StoppedForProcess(_))
        ));
        assert!(matches!(
            manager.stop("aeris").await,
            Err(OrchestratorError::NotRunning(_))
        ));

        let states: Vec<_> = manager.status().await.into_iter().map(|s| s.state).collect();
        assert_eq!(states, vec![AssistantState::Stopped, AssistantState::Idle]);
    }

    #[tokio::test]
    async fn test_shutdown_stops_all_and_refuses_start() {
        let (manager, launcher) = manager();
        manager.start("aeris").await.unwrap();
        manager.start("kaelen").await.unwrap();

        manager.shutdown().await;
        assert!(manager.clients().await.is_empty());
        assert_eq!(launcher.stops.lock().await.len(), 2);
        assert!(matches!(
            manager.start("kaelen").await,
            Err(OrchestratorError::ShutDown)
        ));
    }

    #[tokio::test]
    async fn test_set_persona_updates_running_client() {
        let (manager, _) = manager();
        manager.start("aeris").await.unwrap();
        manager.set_persona("aeris", "kaelen").await.unwrap();

        assert_eq!(manager.client("aeris").await.unwrap().assistant.persona_tag, "kaelen");
        assert_eq!(manager.configured("aeris").await.unwrap().persona_tag, "kaelen");
        assert!(manager.set_persona("nobody", "aeris").await.is_err());
    }
}
