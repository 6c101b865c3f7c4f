//! Side effects delivered after the prose reply.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use syncara_core::{split_message, Clock, Transport, TransportResult, MAX_MESSAGE_LEN};
use syncara_models::{PendingSideEffect, SideEffectPayload};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Told about every entry the buffer manages to deliver.
#[async_trait]
pub trait DeliveryObserver: Send + Sync {
    async fn delivered(&self, effect: &PendingSideEffect);
}

/// FIFO of [`PendingSideEffect`]s keyed by id.
///
/// Handlers [`enqueue`](Self::enqueue) during dispatch; the orchestrator
/// [`flush`](Self::flush)es the ids it collected once the reply is out.
/// Delivery is best-effort per entry: a failed entry stays queued for a
/// later flush until its TTL runs out, and expired entries are dropped
/// with a warning.
pub struct DeferredBuffer {
    clock: Arc<dyn Clock>,
    queue: Mutex<VecDeque<PendingSideEffect>>,
    observers: Vec<Arc<dyn DeliveryObserver>>,
}

impl DeferredBuffer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            queue: Mutex::new(VecDeque::new()),
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DeliveryObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Appends `effect` and returns its id.
    pub async fn enqueue(&self, effect: PendingSideEffect) -> String {
        let id = effect.id.clone();
        debug!(id = %id, kind = %effect.kind(), chat_id = %effect.target_chat, "Deferred side effect");
        self.queue.lock().await.push_back(effect);
        id
    }

    /// Delivers the entries named in `ids`, in enqueue order.
    ///
    /// Returns the ids that were delivered. Unknown ids are ignored.
    pub async fn flush(&self, ids: &[String], transport: &dyn Transport) -> Vec<String> {
        let now = self.clock.now();
        let batch: Vec<PendingSideEffect> = {
            let mut queue = self.queue.lock().await;
            let (selected, rest): (VecDeque<_>, VecDeque<_>) =
                queue.drain(..).partition(|e| ids.contains(&e.id));
            *queue = rest;
            selected.into()
        };

        let mut delivered = Vec::new();
        let mut failed = Vec::new();
        for effect in batch {
            if effect.is_expired(now) {
                warn!(id = %effect.id, kind = %effect.kind(), "Deferred side effect expired, dropping");
                continue;
            }
            match deliver(&effect, transport).await {
                Ok(()) => {
                    for observer in &self.observers {
                        observer.delivered(&effect).await;
                    }
                    delivered.push(effect.id);
                }
                Err(e) => {
                    warn!(
                        id = %effect.id,
                        kind = %effect.kind(),
                        chat_id = %effect.target_chat,
                        error = %e,
                        "Deferred delivery failed"
                    );
                    failed.push(effect);
                }
            }
        }

        if !failed.is_empty() {
            let mut queue = self.queue.lock().await;
            for effect in failed.into_iter().rev() {
                queue.push_front(effect);
            }
        }
        delivered
    }

    /// Drops every expired entry, returning how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut queue = self.queue.lock().await;
        let before = queue.len();
        queue.retain(|e| {
            let expired = e.is_expired(now);
            if expired {
                warn!(id = %e.id, kind = %e.kind(), "Deferred side effect expired, dropping");
            }
            !expired
        });
        before - queue.len()
    }

    /// Ids still queued, oldest first.
    pub async fn pending(&self) -> Vec<String> {
        self.queue.lock().await.iter().map(|e| e.id.clone()).collect()
    }

    /// Id of the queued, unexpired entry carrying `tag`.
    pub async fn find_tagged(&self, tag: &str) -> Option<String> {
        let now = self.clock.now();
        self.queue
            .lock()
            .await
            .iter()
            .find(|e| e.tag.as_deref() == Some(tag) && !e.is_expired(now))
            .map(|e| e.id.clone())
    }

    /// A copy of the queued entry with `id`.
    pub async fn get(&self, id: &str) -> Option<PendingSideEffect> {
        self.queue.lock().await.iter().find(|e| e.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.queue.lock().await.is_empty()
    }
}

async fn deliver(effect: &PendingSideEffect, transport: &dyn Transport) -> TransportResult<()> {
    let chat = effect.target_chat;
    let reply_to = effect.reply_to_message;
    match &effect.payload {
        SideEffectPayload::Photo { source, caption } => {
            transport
                .send_photo(chat, source.clone(), caption.as_deref(), reply_to)
                .await?;
        }
        SideEffectPayload::Document { source, caption } => {
            transport
                .send_document(chat, source.clone(), caption.as_deref(), reply_to)
                .await?;
        }
        SideEffectPayload::Audio { source, caption } => {
            transport
                .send_audio(chat, source.clone(), caption.as_deref(), reply_to)
                .await?;
        }
        SideEffectPayload::Text { text } => {
            for (i, chunk) in split_message(text, MAX_MESSAGE_LEN).iter().enumerate() {
                let reply = if i == 0 { reply_to } else { None };
                transport.send_text(chat, chunk, reply).await?;
            }
        }
    }
    Ok(())
}
