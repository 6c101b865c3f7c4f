//! Media by URL: `MEDIA:PHOTO:<url>|<caption>` and `MEDIA:DOCUMENT:<url>|<name>`.

use async_trait::async_trait;
use std::sync::Arc;
use syncara_models::{MediaSource, SideEffectPayload};
use syncara_shortcode::{
    split_params, HandlerContext, HandlerOutcome, ShortcodeHandler, ShortcodeRegistry,
};
use url::Url;

use crate::error::{HandlerError, Result};
use crate::settle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaAction {
    Photo,
    Document,
}

pub struct MediaHandler {
    action: MediaAction,
}

impl MediaHandler {
    pub fn new(action: MediaAction) -> Self {
        Self { action }
    }

    async fn run(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        let parts = split_params(params);
        let url = parse_http_url(parts.first().copied().unwrap_or_default())?;
        let caption = parts
            .get(1)
            .filter(|c| !c.is_empty())
            .map(|c| c.to_string());
        let source = MediaSource::url(url.as_str());
        let payload = match self.action {
            MediaAction::Photo => SideEffectPayload::Photo { source, caption },
            MediaAction::Document => SideEffectPayload::Document { source, caption },
        };
        Ok(ctx.defer(payload).await)
    }
}

#[async_trait]
impl ShortcodeHandler for MediaHandler {
    async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome {
        settle("MEDIA", self.run(ctx, params).await)
    }
}

/// Accepts absolute `http`/`https` URLs only.
pub(crate) fn parse_http_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| HandlerError::invalid(format!("bad url '{}': {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(HandlerError::invalid(format!("unsupported scheme '{}'", other))),
    }
}

pub fn register(registry: &mut ShortcodeRegistry) -> syncara_shortcode::Result<()> {
    registry.register(
        "MEDIA:PHOTO",
        "MEDIA:PHOTO:url|caption",
        "Kirim foto dari URL",
        Arc::new(MediaHandler::new(MediaAction::Photo)),
    )?;
    registry.register(
        "MEDIA:DOCUMENT",
        "MEDIA:DOCUMENT:url|nama",
        "Kirim dokumen dari URL",
        Arc::new(MediaHandler::new(MediaAction::Document)),
    )
}
