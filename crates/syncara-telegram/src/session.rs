//! Assistant sessions backed by long-polling bots.

use std::sync::Arc;

use async_trait::async_trait;
use syncara_core::Transport;
use syncara_models::{Assistant, InboundMessage};
use syncara_orchestrator::{OrchestratorError, Session, SessionLauncher};
use teloxide::dispatching::{ShutdownToken, UpdateFilterExt};
use teloxide::prelude::*;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::convert::inbound_from;
use crate::transport::TeloxideTransport;

/// Logs each assistant in with its bot token and polls for updates.
#[derive(Debug, Default, Clone)]
pub struct TelegramLauncher;

impl TelegramLauncher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionLauncher for TelegramLauncher {
    async fn launch(
        &self,
        assistant: &Assistant,
        inbound: mpsc::Sender<InboundMessage>,
    ) -> syncara_orchestrator::Result<Box<dyn Session>> {
        let bot = Bot::new(&assistant.session_credential);
        let me = bot.get_me().await.map_err(|e| OrchestratorError::Launch {
            assistant: assistant.id.clone(),
            message: e.to_string(),
        })?;
        info!(assistant = %assistant.id, username = ?me.user.username, "Assistant logged in");

        let transport = Arc::new(TeloxideTransport::new(bot.clone(), &me));

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(forward))
            .branch(Update::filter_channel_post().endpoint(forward));

        let mut dispatcher = Dispatcher::builder(bot, handler)
            .dependencies(dptree::deps![Arc::clone(&transport), inbound])
            .default_handler(|upd| async move {
                debug!("Ignored update: {:?}", upd.kind);
            })
            .build();
        let token = dispatcher.shutdown_token();

        let assistant_id = assistant.id.clone();
        let task = tokio::spawn(async move {
            dispatcher.dispatch().await;
            debug!(assistant = %assistant_id, "Polling stopped");
        });

        Ok(Box::new(TelegramSession {
            transport,
            token,
            task: Mutex::new(Some(task)),
        }))
    }
}

/// Converts an update, records it for history reads and queues it.
async fn forward(
    msg: Message,
    transport: Arc<TeloxideTransport>,
    inbound: mpsc::Sender<InboundMessage>,
) -> ResponseResult<()> {
    let Some(message) = inbound_from(&msg) else {
        return Ok(());
    };
    transport.observe(&message);
    if inbound.send(message).await.is_err() {
        debug!(chat_id = %msg.chat.id, "Inbound queue closed, dropping message");
    }
    Ok(())
}

struct TelegramSession {
    transport: Arc<TeloxideTransport>,
    token: ShutdownToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

#[async_trait]
impl Session for TelegramSession {
    fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }

    async fn stop(&self) {
        let Some(task) = self.task.lock().await.take() else {
            return;
        };
        match self.token.shutdown() {
            Ok(done) => {
                done.await;
                if let Err(e) = task.await {
                    warn!(error = %e, "Polling task ended abnormally");
                }
            }
            // Not polling yet (or already stopped).
            Err(_) => task.abort(),
        }
    }
}
