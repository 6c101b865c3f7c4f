//! The per-message pipeline.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use syncara_agent::{
    attach_image, AgentError, GenerationRequest, LanguageModel, PersonaRegistry, PromptAssembler,
    PromptInput,
};
use syncara_core::{split_message, ClientDirectory, ClientHandle, Clock, MAX_MESSAGE_LEN};
use syncara_memory::LearningStore;
use syncara_models::{
    ChatKind, HistoryMessage, InboundMessage, InteractionContext, MessageId, UserId,
};
use syncara_persistence::DocumentStore;
use syncara_shortcode::{DeferredBuffer, DispatchReport, Dispatcher, HandlerContext};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::addressing::{addressed_to, strip_handle};
use crate::error::Result;
use crate::manager::AssistantManager;

/// Sent when prompt assembly or generation fails.
pub const APOLOGY: &str = "Maaf, aku lagi ada gangguan. Coba lagi sebentar ya 🙏";

/// Shared services every subsystem is built from.
#[derive(Clone)]
pub struct Capabilities {
    pub store: Arc<DocumentStore>,
    pub learning: Arc<LearningStore>,
    pub model: Arc<dyn LanguageModel>,
    pub personas: Arc<PersonaRegistry>,
    pub dispatcher: Dispatcher,
    pub deferred: Arc<DeferredBuffer>,
    pub manager: Arc<AssistantManager>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub owners: Vec<UserId>,
    pub tz: FixedOffset,
    /// Prior chat messages included in the prompt.
    pub window_limit: usize,
}

impl OrchestratorConfig {
    pub fn new(owners: Vec<UserId>, tz: FixedOffset) -> Self {
        Self {
            owners,
            tz,
            window_limit: 20,
        }
    }
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    /// Not addressed to this assistant.
    Ignored,
    Replied {
        /// First message of the prose reply; `None` when nothing was left
        /// to say after the shortcodes ran.
        reply: Option<MessageId>,
        /// Deferred side effects delivered after the reply.
        delivered: usize,
        /// Shortcode tokens left in the text.
        failed_shortcodes: usize,
    },
    /// Prompt assembly or generation failed and the apology was sent.
    Apologised,
}

struct Consumer {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Runs inbound messages through prompt, model, shortcodes and memory.
pub struct Orchestrator {
    caps: Capabilities,
    assembler: PromptAssembler,
    config: OrchestratorConfig,
    consumers: Mutex<HashMap<String, Consumer>>,
}

impl Orchestrator {
    pub fn new(caps: Capabilities, config: OrchestratorConfig) -> Self {
        let assembler = PromptAssembler::new(config.owners.clone(), config.tz)
            .with_shortcode_docs(caps.dispatcher.registry().documentation())
            .with_window_limit(config.window_limit);
        Self {
            caps,
            assembler,
            config,
            consumers: Mutex::new(HashMap::new()),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn manager(&self) -> &Arc<AssistantManager> {
        &self.caps.manager
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.assembler.is_owner(user)
    }

    /// Starts an assistant and its message loop.
    ///
    /// Messages for one assistant are handled one at a time, in arrival
    /// order.
    pub async fn start_assistant(self: &Arc<Self>, id: &str) -> Result<ClientHandle> {
        let (client, inbound) = self.caps.manager.start(id).await?;
        let (stop, stop_rx) = watch::channel(false);
        let task = tokio::spawn(self.clone().consume(client.assistant.id.clone(), inbound, stop_rx));
        self.consumers
            .lock()
            .await
            .insert(client.assistant.id.clone(), Consumer { stop, task });
        Ok(client)
    }

    /// Stops an assistant, letting a message in flight finish first.
    pub async fn stop_assistant(&self, id: &str) -> Result<()> {
        self.caps.manager.stop(id).await?;
        let consumer = self.consumers.lock().await.remove(id);
        if let Some(consumer) = consumer {
            let _ = consumer.stop.send(true);
            if let Err(e) = consumer.task.await {
                warn!(assistant = %id, error = %e, "Message loop ended abnormally");
            }
        }
        Ok(())
    }

    /// Starts every configured assistant, logging the ones that fail.
    pub async fn start_all(self: &Arc<Self>) -> Vec<String> {
        let mut started = Vec::new();
        for id in self.caps.manager.configured_ids().await {
            match self.start_assistant(&id).await {
                Ok(_) => started.push(id),
                Err(e) => warn!(assistant = %id, error = %e, "Failed to start assistant"),
            }
        }
        started
    }

    /// Stops every assistant and tears the shortcode registry down.
    pub async fn shutdown(&self) {
        let ids: Vec<String> = self.consumers.lock().await.keys().cloned().collect();
        for id in ids {
            if let Err(e) = self.stop_assistant(&id).await {
                debug!(assistant = %id, error = %e, "Stop during shutdown");
            }
        }
        self.caps.manager.shutdown().await;
        self.caps.dispatcher.registry().teardown();
        info!("Orchestrator shut down");
    }

    /// Re-maps an assistant to a known persona.
    pub async fn set_persona(&self, assistant: &str, persona: &str) -> Result<()> {
        let name = self.caps.personas.require(persona)?.name.clone();
        self.caps.manager.set_persona(assistant, &name).await
    }

    async fn consume(
        self: Arc<Self>,
        assistant_id: String,
        mut inbound: mpsc::Receiver<InboundMessage>,
        mut stop: watch::Receiver<bool>,
    ) {
        debug!(assistant = %assistant_id, "Message loop started");
        loop {
            tokio::select! {
                _ = stop.changed() => break,
                message = inbound.recv() => {
                    let Some(message) = message else { break };
                    // look the client up per message so persona changes apply
                    let Some(client) = self.caps.manager.client(&assistant_id).await else {
                        break;
                    };
                    self.handle_incoming(&client, message).await;
                }
            }
        }
        debug!(assistant = %assistant_id, "Message loop finished");
    }

    /// Handles one inbound message on `client`.
    pub async fn handle_incoming(&self, client: &ClientHandle, message: InboundMessage) -> Handled {
        let me = client.transport.identity();
        let Some(addressed) = addressed_to(&me, &message) else {
            return Handled::Ignored;
        };
        if self.caps.manager.is_assistant_account(message.sender.id).await {
            debug!(sender = %message.sender.id, "Ignoring message from another assistant");
            return Handled::Ignored;
        }
        let now = self.caps.clock.now();
        let chat = message.chat_id;
        debug!(
            assistant = %client.assistant.id,
            chat_id = %chat,
            message_id = %message.id,
            ?addressed,
            "Handling message"
        );

        let handle = me.username.as_deref().unwrap_or(&client.assistant.handle);
        let mut visible = message.clone();
        visible.text = strip_handle(&message.text, handle);

        self.remember_sender(client, &visible, now).await;

        let (reply, image_attached) = match self.generate(client, &visible, now).await {
            Ok(generated) => generated,
            Err(e) => {
                warn!(
                    assistant = %client.assistant.id,
                    chat_id = %chat,
                    error = %e,
                    "Reply generation failed"
                );
                if let Err(e) = client.transport.send_text(chat, APOLOGY, Some(message.id)).await {
                    warn!(chat_id = %chat, error = %e, "Failed to send apology");
                }
                return Handled::Apologised;
            }
        };

        let ctx = HandlerContext {
            transport: client.transport.clone(),
            assistant: client.assistant.clone(),
            message: visible.clone(),
            deferred: self.caps.deferred.clone(),
            is_owner: self.is_owner(message.sender.id),
            now,
        };
        let report = self.caps.dispatcher.dispatch(&reply, &ctx).await;

        let reply_id = self.send_reply(client, &visible, &report.cleaned).await;

        let delivered = if report.deferred_ids.is_empty() {
            0
        } else {
            self.caps
                .deferred
                .flush(&report.deferred_ids, client.transport.as_ref())
                .await
                .len()
        };
        self.caps.deferred.purge_expired().await;

        let flags = context_flags(&visible, &report, image_attached, ctx.is_owner);
        if let Err(e) = self
            .caps
            .learning
            .record_exchange(message.sender.id, &visible.body(), &report.cleaned, flags, now)
            .await
        {
            warn!(user_id = %message.sender.id, error = %e, "Failed to record exchange");
        }

        Handled::Replied {
            reply: reply_id,
            delivered,
            failed_shortcodes: report.failed_count(),
        }
    }

    async fn remember_sender(&self, client: &ClientHandle, message: &InboundMessage, now: DateTime<Utc>) {
        let ctx = InteractionContext {
            chat_id: message.chat_id,
            chat_kind: message.chat_kind,
            assistant_id: client.assistant.id.clone(),
            request_greeting: false,
        };
        if let Err(e) = self.caps.learning.upsert_user(&message.sender, &ctx, now).await {
            warn!(user_id = %message.sender.id, error = %e, "Failed to upsert user");
        }
        if message.chat_kind == ChatKind::Group {
            if let Err(e) = self
                .caps
                .learning
                .record_group_activity(message.chat_id, message.chat_title.clone(), now)
                .await
            {
                warn!(chat_id = %message.chat_id, error = %e, "Failed to record group activity");
            }
        }
    }

    /// Renders the prompt and asks the model. Returns the raw reply and
    /// whether an image went with the request.
    async fn generate(
        &self,
        client: &ClientHandle,
        message: &InboundMessage,
        now: DateTime<Utc>,
    ) -> std::result::Result<(String, bool), AgentError> {
        let persona = self
            .caps
            .personas
            .resolve(&client.assistant.persona_tag)
            .ok_or_else(|| AgentError::UnknownPersona(client.assistant.persona_tag.clone()))?;
        let window = self.recent_window(client, message).await;
        let user = self.caps.learning.get_context(message.sender.id).await;

        let system_prompt = self.assembler.render(&PromptInput {
            persona,
            assistant: &client.assistant,
            message,
            recent_window: &window,
            user: user.as_ref(),
            now,
        })?;

        let image = attach_image(client.transport.as_ref(), message).await;
        let image_attached = image.is_some();
        let request = GenerationRequest::new(system_prompt, message.body())
            .with_params(persona.generation.clone())
            .with_image(image);
        let reply = self.caps.model.generate(request).await?;
        Ok((reply, image_attached))
    }

    /// Prior messages in the chat, without the current one.
    async fn recent_window(&self, client: &ClientHandle, message: &InboundMessage) -> Vec<HistoryMessage> {
        match client
            .transport
            .chat_history(message.chat_id, self.config.window_limit + 1)
            .await
        {
            Ok(mut history) => {
                history.retain(|m| m.id != message.id);
                let excess = history.len().saturating_sub(self.config.window_limit);
                history.drain(..excess);
                history
            }
            Err(e) => {
                debug!(chat_id = %message.chat_id, error = %e, "Chat history unavailable");
                Vec::new()
            }
        }
    }

    /// Sends the cleaned reply, split into Telegram-sized chunks, the first
    /// one replying to the trigger. Nothing is sent for an empty reply.
    async fn send_reply(&self, client: &ClientHandle, message: &InboundMessage, text: &str) -> Option<MessageId> {
        if text.trim().is_empty() {
            debug!(chat_id = %message.chat_id, "Reply empty after shortcodes, not sending");
            return None;
        }
        let mut first = None;
        for (i, chunk) in split_message(text, MAX_MESSAGE_LEN).iter().enumerate() {
            let reply_to = (i == 0).then_some(message.id);
            match client.transport.send_text(message.chat_id, chunk, reply_to).await {
                Ok(id) => {
                    first.get_or_insert(id);
                }
                Err(e) => {
                    warn!(chat_id = %message.chat_id, error = %e, "Failed to send reply");
                    if e.is_invalid_peer() && message.is_private() {
                        if let Err(e) = self.caps.learning.set_unreachable(message.sender.id).await {
                            warn!(user_id = %message.sender.id, error = %e, "Failed to flag user unreachable");
                        }
                    }
                    return first;
                }
            }
        }
        if message.is_private() {
            if let Err(e) = self.caps.learning.mark_reachable(message.sender.id).await {
                debug!(user_id = %message.sender.id, error = %e, "Failed to mark user reachable");
            }
        }
        first
    }
}

fn context_flags(
    message: &InboundMessage,
    report: &DispatchReport,
    image_attached: bool,
    is_owner: bool,
) -> Vec<String> {
    let mut flags = vec![match message.chat_kind {
        ChatKind::Private => "private",
        ChatKind::Group => "group",
        ChatKind::Channel => "channel",
    }
    .to_string()];
    if image_attached {
        flags.push("image".to_string());
    }
    if !report.results.is_empty() {
        flags.push("shortcodes".to_string());
    }
    if is_owner {
        flags.push("owner".to_string());
    }
    flags
}

