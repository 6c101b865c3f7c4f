//! The handler contract.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use syncara_core::Transport;
use syncara_models::{Assistant, ChatId, InboundMessage, PendingSideEffect, SideEffectPayload};

use crate::deferred::DeferredBuffer;

/// What a handler did with its token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Done; strip the token.
    Handled,
    /// A side effect with this id was enqueued; strip the token.
    Deferred(String),
    /// Could not be executed; keep the token in the reply.
    Failed,
}

impl HandlerOutcome {
    /// Whether the token is removed from the reply.
    pub fn strips_token(&self) -> bool {
        !matches!(self, Self::Failed)
    }

    pub fn deferred_id(&self) -> Option<&str> {
        match self {
            Self::Deferred(id) => Some(id),
            _ => None,
        }
    }
}

impl From<bool> for HandlerOutcome {
    fn from(ok: bool) -> Self {
        if ok {
            Self::Handled
        } else {
            Self::Failed
        }
    }
}

/// Everything a handler may touch for one triggering message.
#[derive(Clone)]
pub struct HandlerContext {
    /// Client of the assistant that produced the reply.
    pub transport: Arc<dyn Transport>,
    pub assistant: Assistant,
    /// The inbound message that triggered the reply.
    pub message: InboundMessage,
    pub deferred: Arc<DeferredBuffer>,
    pub is_owner: bool,
    pub now: DateTime<Utc>,
}

impl HandlerContext {
    pub fn chat(&self) -> ChatId {
        self.message.chat_id
    }

    /// Enqueues `payload` for delivery to the triggering chat as a reply
    /// to the triggering message, returning the `Deferred` outcome.
    pub async fn defer(&self, payload: SideEffectPayload) -> HandlerOutcome {
        let effect = PendingSideEffect::new(self.chat(), Some(self.message.id), payload)
            .created_at(self.now);
        HandlerOutcome::Deferred(self.deferred.enqueue(effect).await)
    }

    /// Like [`defer`](Self::defer), tagging the entry so the handler can
    /// look it up with [`DeferredBuffer::find_tagged`].
    pub async fn defer_tagged(&self, payload: SideEffectPayload, tag: impl Into<String>) -> HandlerOutcome {
        let effect = PendingSideEffect::new(self.chat(), Some(self.message.id), payload)
            .created_at(self.now)
            .with_tag(tag);
        HandlerOutcome::Deferred(self.deferred.enqueue(effect).await)
    }

    /// Enqueues a text result for delivery after the prose reply.
    pub async fn defer_text(&self, text: impl Into<String>) -> HandlerOutcome {
        self.defer(SideEffectPayload::Text { text: text.into() }).await
    }
}

/// A side-effecting action bound to one or more shortcode keys.
///
/// Implementations convert every error into [`HandlerOutcome::Failed`];
/// the dispatcher never sees an error.
#[async_trait]
pub trait ShortcodeHandler: Send + Sync {
    async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome;
}

/// Splits `a|b|c` params into trimmed parts. Empty params yield no parts.
pub fn split_params(params: &str) -> Vec<&str> {
    if params.trim().is_empty() {
        return Vec::new();
    }
    params.split('|').map(str::trim).collect()
}
