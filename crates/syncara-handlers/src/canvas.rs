//! Virtual files kept per chat: `CANVAS:CREATE|SHOW|EDIT|LIST|EXPORT`.

use std::sync::Arc;

use async_trait::async_trait;
use syncara_models::{MediaSource, PendingSideEffect, SideEffectPayload, VirtualFile};
use syncara_persistence::DocumentStore;
use syncara_shortcode::{
    DeliveryObserver, HandlerContext, HandlerOutcome, ShortcodeHandler, ShortcodeRegistry,
};
use tracing::{debug, warn};

use crate::error::{HandlerError, Result};
use crate::settle;

const DEFAULT_FILE_TYPE: &str = "text";
const EXPORT_TAG_PREFIX: &str = "canvas:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasAction {
    Create,
    Show,
    Edit,
    List,
    Export,
}

pub struct CanvasHandler {
    store: Arc<DocumentStore>,
    action: CanvasAction,
}

impl CanvasHandler {
    pub fn new(store: Arc<DocumentStore>, action: CanvasAction) -> Self {
        Self { store, action }
    }

    async fn run(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        match self.action {
            CanvasAction::Create => self.create(ctx, params).await,
            CanvasAction::Show => self.show(ctx, params).await,
            CanvasAction::Edit => self.edit(ctx, params).await,
            CanvasAction::List => self.list(ctx).await,
            CanvasAction::Export => self.export(ctx, params).await,
        }
    }

    /// `name|content` or `name|type|content`. An existing file of the same
    /// name is overwritten with its old content kept in the history.
    async fn create(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        let (name, file_type, content) = parse_create(params)?;
        let key = VirtualFile::key_for(ctx.chat(), name);
        let now = ctx.now;

        let existed = self
            .store
            .canvas_files
            .update_one(&key, |file| {
                file.file_type = file_type.to_string();
                file.edit(content, now);
            })
            .await?;
        if !existed {
            let file = VirtualFile::new(ctx.chat(), name, file_type, content, now);
            self.store.canvas_files.insert_one(file).await?;
        }
        debug!(chat_id = %ctx.chat(), name, existed, "Canvas file written");
        Ok(HandlerOutcome::Handled)
    }

    async fn show(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        let file = self.require(ctx, params).await?;
        if file.content.is_empty() {
            return Ok(ctx.defer_text(format!("📄 {} masih kosong.", file.name)).await);
        }
        Ok(ctx.defer_text(file.content).await)
    }

    /// `name|new content`; the previous content moves to the history.
    async fn edit(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        let (name, content) = params
            .split_once('|')
            .map(|(n, c)| (n.trim(), c.trim()))
            .filter(|(n, _)| !n.is_empty())
            .ok_or_else(|| HandlerError::invalid("expected name|content"))?;
        let key = VirtualFile::key_for(ctx.chat(), name);
        let now = ctx.now;
        let updated = self
            .store
            .canvas_files
            .update_one(&key, |file| file.edit(content, now))
            .await?;
        if !updated {
            return Err(HandlerError::NotFound(name.to_string()));
        }
        Ok(HandlerOutcome::Handled)
    }

    async fn list(&self, ctx: &HandlerContext) -> Result<HandlerOutcome> {
        let chat = ctx.chat();
        let files = self
            .store
            .canvas_files
            .find_sorted(|f| f.owner_chat == chat, |a, b| a.name.cmp(&b.name), None)
            .await;
        let text = if files.is_empty() {
            "📁 Belum ada file di chat ini.".to_string()
        } else {
            let mut out = format!("📁 File ({}):", files.len());
            for file in &files {
                out.push_str(&format!(
                    "\n• {} ({}, v{}, {} karakter)",
                    file.name,
                    file.file_type,
                    file.version,
                    file.content.chars().count()
                ));
            }
            out
        };
        Ok(ctx.defer_text(text).await)
    }

    /// Sends the file as a document once per version.
    ///
    /// A version counts as exported only once [`CanvasExports`] saw the
    /// document delivered. While an earlier export of the same version is
    /// still queued, its id is handed back so this reply's flush retries it.
    async fn export(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        let file = self.require(ctx, params).await?;
        if file.is_exported() {
            debug!(name = %file.name, version = file.version, "Canvas file already exported");
            return Ok(HandlerOutcome::Handled);
        }

        let tag = export_tag(&file);
        if let Some(id) = ctx.deferred.find_tagged(&tag).await {
            debug!(name = %file.name, id = %id, "Canvas export still queued, retrying");
            return Ok(HandlerOutcome::Deferred(id));
        }

        let payload = SideEffectPayload::Document {
            source: MediaSource::bytes(file.export_name(), file.content.clone().into_bytes()),
            caption: Some(format!("📎 {}", file.name)),
        };
        Ok(ctx.defer_tagged(payload, tag).await)
    }

    async fn require(&self, ctx: &HandlerContext, params: &str) -> Result<VirtualFile> {
        let name = params.trim();
        if name.is_empty() {
            return Err(HandlerError::invalid("missing file name"));
        }
        self.store
            .canvas_files
            .get(&VirtualFile::key_for(ctx.chat(), name))
            .await
            .ok_or_else(|| HandlerError::NotFound(name.to_string()))
    }
}

#[async_trait]
impl ShortcodeHandler for CanvasHandler {
    async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome {
        settle("CANVAS", self.run(ctx, params).await)
    }
}

fn export_tag(file: &VirtualFile) -> String {
    format!("{}{}:{}", EXPORT_TAG_PREFIX, file.key(), file.version)
}

/// Marks a canvas version exported once its document was delivered.
pub struct CanvasExports {
    store: Arc<DocumentStore>,
}

impl CanvasExports {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl DeliveryObserver for CanvasExports {
    async fn delivered(&self, effect: &PendingSideEffect) {
        let Some((key, version)) = effect
            .tag
            .as_deref()
            .and_then(|t| t.strip_prefix(EXPORT_TAG_PREFIX))
            .and_then(|t| t.rsplit_once(':'))
        else {
            return;
        };
        let Ok(version) = version.parse::<u32>() else {
            return;
        };
        let marked = self
            .store
            .canvas_files
            .update_one(key, |f| f.exported_version = Some(version))
            .await;
        if let Err(e) = marked {
            warn!(key, version, error = %e, "Failed to mark canvas export");
        }
    }
}

/// Splits create params. Content keeps any further `|` characters.
fn parse_create(params: &str) -> Result<(&str, &str, &str)> {
    let mut parts = params.splitn(3, '|').map(str::trim);
    let name = parts.next().filter(|n| !n.is_empty());
    let (name, second, third) = match (name, parts.next(), parts.next()) {
        (Some(name), Some(second), third) => (name, second, third),
        _ => return Err(HandlerError::invalid("expected name|content or name|type|content")),
    };
    Ok(match third {
        Some(content) => (name, if second.is_empty() { DEFAULT_FILE_TYPE } else { second }, content),
        None => (name, DEFAULT_FILE_TYPE, second),
    })
}

pub fn register(registry: &mut ShortcodeRegistry, store: &Arc<DocumentStore>) -> syncara_shortcode::Result<()> {
    let entries = [
        (
            "CANVAS:CREATE",
            "CANVAS:CREATE:nama|tipe|isi",
            "Buat file virtual di chat ini (tipe opsional)",
            CanvasAction::Create,
        ),
        ("CANVAS:SHOW", "CANVAS:SHOW:nama", "Tampilkan isi file", CanvasAction::Show),
        (
            "CANVAS:EDIT",
            "CANVAS:EDIT:nama|isi baru",
            "Ganti isi file, versi lama disimpan di riwayat",
            CanvasAction::Edit,
        ),
        ("CANVAS:LIST", "CANVAS:LIST", "Daftar file di chat ini", CanvasAction::List),
        (
            "CANVAS:EXPORT",
            "CANVAS:EXPORT:nama",
            "Kirim file sebagai dokumen",
            CanvasAction::Export,
        ),
    ];
    for (key, usage, description, action) in entries {
        registry.register(
            key,
            usage,
            description,
            Arc::new(CanvasHandler::new(store.clone(), action)),
        )?;
    }
    Ok(())
}
