//! The LLM gateway: one text reply per request, optional image attached.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use syncara_core::Transport;
use syncara_models::{GenerationParams, InboundMessage, MediaKind};
use tracing::{debug, warn};

use crate::client::{ChatMessage, OpenRouterClient};
use crate::error::Result;

/// An image inlined into a request as base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub base64: String,
}

impl ImageAttachment {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// One generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub prompt: String,
    pub params: GenerationParams,
    pub image: Option<ImageAttachment>,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            prompt: prompt.into(),
            params: GenerationParams::default(),
            image: None,
        }
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_image(mut self, image: Option<ImageAttachment>) -> Self {
        self.image = image;
        self
    }
}

/// A text generator the orchestrator and channel poster call.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

/// OpenRouter-backed [`LanguageModel`]. Network failures are retried once.
#[derive(Clone)]
pub struct LlmGateway {
    client: OpenRouterClient,
    model: String,
    retry_delay: Duration,
}

impl LlmGateway {
    pub fn new(client: OpenRouterClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            retry_delay: Duration::from_millis(500),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LanguageModel for LlmGateway {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let user_message = match &request.image {
            Some(image) => ChatMessage::user_with_image(&request.prompt, image.data_url()),
            None => ChatMessage::user(&request.prompt),
        };
        let messages = vec![ChatMessage::system(&request.system_prompt), user_message];

        let reply = retry_once(self.retry_delay, || {
            self.client.chat(&self.model, messages.clone(), &request.params)
        })
        .await?;
        debug!(model = %self.model, chars = reply.len(), "Generated reply");
        Ok(reply)
    }
}

/// Runs `op`, and once more after `delay` if the first error is retryable.
pub async fn retry_once<F, Fut, T>(delay: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match op().await {
        Err(e) if e.is_retryable() => {
            warn!(error = %e, "LLM request failed, retrying once");
            tokio::time::sleep(delay).await;
            op().await
        }
        other => other,
    }
}

/// Fetches the photo attached to `message`, if any, for inlining.
///
/// A failed download is logged and yields `None` so the request can go
/// ahead text-only.
pub async fn attach_image(
    transport: &dyn Transport,
    message: &InboundMessage,
) -> Option<ImageAttachment> {
    let media = message.media.as_ref().filter(|m| m.is_image())?;
    match transport.download_media(media).await {
        Ok(bytes) => Some(ImageAttachment::from_bytes(mime_for(media), &bytes)),
        Err(e) => {
            warn!(
                chat_id = %message.chat_id,
                message_id = %message.id,
                error = %e,
                "Image fetch failed, continuing text-only"
            );
            None
        }
    }
}

fn mime_for(media: &MediaKind) -> &'static str {
    match media {
        MediaKind::Photo { .. } => "image/jpeg",
        _ => "application/octet-stream",
    }
}
