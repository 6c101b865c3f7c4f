//! Image generation: `IMAGE:GEN:<prompt>|style=..|aspect=..|seed=..`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use syncara_models::{MediaSource, SideEffectPayload};
use syncara_shortcode::{HandlerContext, HandlerOutcome, ShortcodeHandler, ShortcodeRegistry};
use tracing::{debug, info};
use url::Url;

use crate::error::{HandlerError, Result};
use crate::settle;

/// Default image endpoint; the prompt is appended as a path segment.
pub const DEFAULT_IMAGE_API_URL: &str = "https://image.pollinations.ai/prompt/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Output shape of a generated image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aspect {
    #[default]
    Square,
    Landscape,
    Portrait,
}

impl Aspect {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1:1" | "square" => Ok(Self::Square),
            "16:9" | "landscape" | "wide" => Ok(Self::Landscape),
            "9:16" | "portrait" | "tall" => Ok(Self::Portrait),
            other => Err(HandlerError::invalid(format!("unknown aspect '{}'", other))),
        }
    }

    pub fn dimensions(self) -> (u32, u32) {
        match self {
            Self::Square => (1024, 1024),
            Self::Landscape => (1344, 768),
            Self::Portrait => (768, 1344),
        }
    }
}

/// A parsed image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub style: Option<String>,
    pub aspect: Aspect,
    pub seed: Option<u64>,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            style: None,
            aspect: Aspect::default(),
            seed: None,
        }
    }

    /// Parses `prompt|key=value|...`. Unknown keys are rejected.
    pub fn parse(params: &str) -> Result<Self> {
        let mut parts = params.split('|').map(str::trim);
        let prompt = parts.next().unwrap_or_default();
        if prompt.is_empty() {
            return Err(HandlerError::invalid("empty prompt"));
        }
        let mut request = Self::new(prompt);
        for part in parts.filter(|p| !p.is_empty()) {
            let (key, value) = part
                .split_once('=')
                .map(|(k, v)| (k.trim(), v.trim()))
                .ok_or_else(|| HandlerError::invalid(format!("expected key=value, got '{}'", part)))?;
            match key {
                "style" => request.style = Some(value.to_string()),
                "aspect" => request.aspect = Aspect::parse(value)?,
                "seed" => {
                    request.seed = Some(
                        value
                            .parse()
                            .map_err(|_| HandlerError::invalid(format!("bad seed '{}'", value)))?,
                    )
                }
                other => return Err(HandlerError::invalid(format!("unknown option '{}'", other))),
            }
        }
        Ok(request)
    }

    /// Prompt sent to the service, with the style folded in.
    pub fn full_prompt(&self) -> String {
        match &self.style {
            Some(style) => format!("{}, {} style", self.prompt, style),
            None => self.prompt.clone(),
        }
    }
}

/// An external text-to-image service.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Generates an image, returning something a photo send accepts.
    async fn generate(&self, request: &ImageRequest) -> Result<MediaSource>;
}

/// HTTP client for a pollinations-style GET endpoint.
///
/// The image is downloaded before the handler returns so the deferred
/// delivery only has to upload bytes.
#[derive(Clone)]
pub struct PollinationsClient {
    client: reqwest::Client,
    base: Url,
}

impl PollinationsClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let mut base = Url::parse(base_url)
            .map_err(|e| HandlerError::Image(format!("invalid image API url: {}", e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base })
    }

    /// Request URL for `request`.
    pub fn request_url(&self, request: &ImageRequest) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| HandlerError::Image("image API url cannot be a base".to_string()))?
            .pop_if_empty()
            .push(&request.full_prompt());
        let (width, height) = request.aspect.dimensions();
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("width", &width.to_string())
                .append_pair("height", &height.to_string())
                .append_pair("nologo", "true");
            if let Some(seed) = request.seed {
                query.append_pair("seed", &seed.to_string());
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ImageService for PollinationsClient {
    async fn generate(&self, request: &ImageRequest) -> Result<MediaSource> {
        let url = self.request_url(request)?;
        debug!(url = %url, "Requesting image");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HandlerError::Image(format!("image service returned {}", status)));
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(HandlerError::Image("image service returned no data".to_string()));
        }
        info!(bytes = bytes.len(), "Image generated");
        Ok(MediaSource::bytes("image.png", bytes.to_vec()))
    }
}

pub struct ImageHandler {
    service: Arc<dyn ImageService>,
}

impl ImageHandler {
    pub fn new(service: Arc<dyn ImageService>) -> Self {
        Self { service }
    }

    async fn run(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        let request = ImageRequest::parse(params)?;
        let source = self.service.generate(&request).await?;
        let payload = SideEffectPayload::Photo {
            source,
            caption: Some(format!("🎨 Prompt: {}", request.prompt)),
        };
        Ok(ctx.defer(payload).await)
    }
}

#[async_trait]
impl ShortcodeHandler for ImageHandler {
    async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome {
        settle("IMAGE:GEN", self.run(ctx, params).await)
    }
}

pub fn register(
    registry: &mut ShortcodeRegistry,
    service: &Arc<dyn ImageService>,
) -> syncara_shortcode::Result<()> {
    registry.register(
        "IMAGE:GEN",
        "IMAGE:GEN:prompt|style=anime|aspect=16:9|seed=7",
        "Buat gambar dari deskripsi (opsi style, aspect, seed)",
        Arc::new(ImageHandler::new(service.clone())),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, StaticImages};

    #[test]
    fn test_parse_request() {
        let r = ImageRequest::parse("kucing oranye|style=anime|seed=7|aspect=16:9").unwrap();
        assert_eq!(r.prompt, "kucing oranye");
        assert_eq!(r.style.as_deref(), Some("anime"));
        assert_eq!(r.seed, Some(7));
        assert_eq!(r.aspect, Aspect::Landscape);
        assert_eq!(r.full_prompt(), "kucing oranye, anime style");

        assert_eq!(ImageRequest::parse("kucing").unwrap(), ImageRequest::new("kucing"));
        assert!(ImageRequest::parse("").is_err());
        assert!(ImageRequest::parse("kucing|seed=x").is_err());
        assert!(ImageRequest::parse("kucing|color=red").is_err());
    }

    #[test]
    fn test_request_url_encodes_prompt() {
        let client = PollinationsClient::new("https://image.pollinations.ai/prompt").unwrap();
        let mut request = ImageRequest::new("kucing oranye");
        request.seed = Some(7);
        let url = client.request_url(&request).unwrap();
        assert_eq!(url.path(), "/prompt/kucing%20oranye");
        let query = url.query().unwrap();
        assert!(query.contains("width=1024"));
        assert!(query.contains("seed=7"));
    }

    #[tokio::test]
    async fn test_defers_photo_with_prompt_caption() {
        let ctx = context(false);
        let handler = ImageHandler::new(Arc::new(StaticImages::ok()));

        let outcome = handler.handle(&ctx, "kucing oranye").await;
        let effect = ctx.deferred.get(outcome.deferred_id().unwrap()).await.unwrap();
        assert_eq!(effect.target_chat, ctx.chat());
        assert_eq!(effect.reply_to_message, Some(ctx.message.id));
        assert!(matches!(
            effect.payload,
            SideEffectPayload::Photo { caption: Some(ref c), .. } if c == "🎨 Prompt: kucing oranye"
        ));
    }

    #[tokio::test]
    async fn test_service_failure_keeps_token() {
        let ctx = context(false);
        let handler = ImageHandler::new(Arc::new(StaticImages::failing()));
        assert_eq!(handler.handle(&ctx, "kucing").await, HandlerOutcome::Failed);
        assert!(ctx.deferred.is_empty().await);
    }
}
