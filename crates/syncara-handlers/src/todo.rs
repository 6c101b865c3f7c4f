//! Per-chat todo list: `TODO:CREATE|LIST|COMPLETE|DELETE|UPDATE|CLEAR|STATS`.
//!
//! Items are referenced either by their opaque id or by a 1-based ordinal
//! over the chat's pending items in creation order.

use std::sync::Arc;

use async_trait::async_trait;
use syncara_models::{ChatId, Todo, TodoStatus};
use syncara_persistence::DocumentStore;
use syncara_shortcode::{
    split_params, HandlerContext, HandlerOutcome, ShortcodeHandler, ShortcodeRegistry,
};
use tracing::debug;

use crate::error::{HandlerError, Result};
use crate::settle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoAction {
    Create,
    List,
    Complete,
    Delete,
    Update,
    Clear,
    Stats,
}

/// Which items `TODO:LIST` shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListFilter {
    All,
    Pending,
    Completed,
}

impl ListFilter {
    fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "" | "all" | "semua" => Ok(Self::All),
            "pending" | "belum" => Ok(Self::Pending),
            "completed" | "done" | "selesai" => Ok(Self::Completed),
            other => Err(HandlerError::invalid(format!("unknown filter '{}'", other))),
        }
    }

    fn matches(self, todo: &Todo) -> bool {
        match self {
            Self::All => true,
            Self::Pending => todo.status == TodoStatus::Pending,
            Self::Completed => todo.status == TodoStatus::Completed,
        }
    }
}

pub struct TodoHandler {
    store: Arc<DocumentStore>,
    action: TodoAction,
}

impl TodoHandler {
    pub fn new(store: Arc<DocumentStore>, action: TodoAction) -> Self {
        Self { store, action }
    }

    async fn run(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        let chat = ctx.chat();
        match self.action {
            TodoAction::Create => {
                let description = params.trim();
                if description.is_empty() {
                    return Err(HandlerError::invalid("empty todo"));
                }
                let todo = Todo::new(chat, description, ctx.now);
                let id = todo.id.clone();
                self.store.todos.insert_one(todo).await?;
                debug!(chat_id = %chat, id = %id, "Todo created");
                Ok(ctx.defer_text(format!("✅ Todo ditambahkan: {} (id: {})", description, id)).await)
            }
            TodoAction::List => {
                let filter = ListFilter::parse(params)?;
                let todos = self.chat_todos(chat).await;
                Ok(ctx.defer_text(render_list(&todos, filter)).await)
            }
            TodoAction::Complete => {
                let todo = self.resolve(chat, params).await?;
                if !todo.is_pending() {
                    return Ok(HandlerOutcome::Handled);
                }
                let now = ctx.now;
                self.store.todos.update_one(&todo.id, |t| t.complete(now)).await?;
                Ok(HandlerOutcome::Handled)
            }
            TodoAction::Delete => {
                let todo = self.resolve(chat, params).await?;
                self.store.todos.delete_one(&todo.id).await?;
                Ok(HandlerOutcome::Handled)
            }
            TodoAction::Update => {
                let (reference, description) = params
                    .split_once('|')
                    .map(|(r, d)| (r.trim(), d.trim()))
                    .filter(|(_, d)| !d.is_empty())
                    .ok_or_else(|| HandlerError::invalid("expected ref|description"))?;
                let todo = self.resolve(chat, reference).await?;
                self.store
                    .todos
                    .update_one(&todo.id, |t| t.description = description.to_string())
                    .await?;
                Ok(HandlerOutcome::Handled)
            }
            TodoAction::Clear => {
                let all = match split_params(params).first().copied() {
                    None | Some("completed") | Some("selesai") => false,
                    Some("all") | Some("semua") => true,
                    Some(other) => {
                        return Err(HandlerError::invalid(format!("unknown scope '{}'", other)))
                    }
                };
                let removed = self
                    .store
                    .todos
                    .delete_many(|t| t.owner_chat == chat && (all || !t.is_pending()))
                    .await?;
                debug!(chat_id = %chat, removed, all, "Todos cleared");
                Ok(HandlerOutcome::Handled)
            }
            TodoAction::Stats => {
                let todos = self.chat_todos(chat).await;
                let done = todos.iter().filter(|t| !t.is_pending()).count();
                let total = todos.len();
                let percent = if total == 0 { 0 } else { done * 100 / total };
                Ok(ctx
                    .defer_text(format!(
                        "📊 Todo: {} total, {} selesai, {} belum ({}% selesai)",
                        total,
                        done,
                        total - done,
                        percent
                    ))
                    .await)
            }
        }
    }

    /// All todos of `chat`, oldest first.
    async fn chat_todos(&self, chat: ChatId) -> Vec<Todo> {
        self.store
            .todos
            .find_sorted(
                |t| t.owner_chat == chat,
                |a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)),
                None,
            )
            .await
    }

    /// An id match wins over an ordinal.
    async fn resolve(&self, chat: ChatId, reference: &str) -> Result<Todo> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(HandlerError::invalid("missing todo reference"));
        }
        let todos = self.chat_todos(chat).await;
        if let Some(todo) = todos.iter().find(|t| t.id == reference) {
            return Ok(todo.clone());
        }
        reference
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| todos.iter().filter(|t| t.is_pending()).nth(i))
            .cloned()
            .ok_or_else(|| HandlerError::NotFound(format!("todo {}", reference)))
    }
}

#[async_trait]
impl ShortcodeHandler for TodoHandler {
    async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome {
        settle("TODO", self.run(ctx, params).await)
    }
}

/// Pending items are numbered by their ordinal; completed ones are ticked.
fn render_list(todos: &[Todo], filter: ListFilter) -> String {
    let mut lines = Vec::new();
    let mut ordinal = 0;
    for todo in todos {
        if todo.is_pending() {
            ordinal += 1;
        }
        if !filter.matches(todo) {
            continue;
        }
        lines.push(match todo.status {
            TodoStatus::Pending => format!("{}. {} ({})", ordinal, todo.description, todo.id),
            TodoStatus::Completed => format!("✔️ {} ({})", todo.description, todo.id),
        });
    }
    if lines.is_empty() {
        return "📝 Tidak ada todo.".to_string();
    }
    format!("📝 Todo:\n{}", lines.join("\n"))
}

pub fn register(registry: &mut ShortcodeRegistry, store: &Arc<DocumentStore>) -> syncara_shortcode::Result<()> {
    let entries = [
        ("TODO:CREATE", "TODO:CREATE:deskripsi", "Tambah todo", TodoAction::Create),
        (
            "TODO:LIST",
            "TODO:LIST:all|pending|completed",
            "Tampilkan todo di chat ini",
            TodoAction::List,
        ),
        (
            "TODO:COMPLETE",
            "TODO:COMPLETE:id atau nomor",
            "Tandai todo selesai",
            TodoAction::Complete,
        ),
        ("TODO:DELETE", "TODO:DELETE:id atau nomor", "Hapus todo", TodoAction::Delete),
        (
            "TODO:UPDATE",
            "TODO:UPDATE:id atau nomor|deskripsi baru",
            "Ubah deskripsi todo",
            TodoAction::Update,
        ),
        (
            "TODO:CLEAR",
            "TODO:CLEAR:completed|all",
            "Hapus todo yang selesai (atau semua)",
            TodoAction::Clear,
        ),
        ("TODO:STATS", "TODO:STATS", "Ringkasan todo", TodoAction::Stats),
    ];
    for (key, usage, description, action) in entries {
        registry.register(key, usage, description, Arc::new(TodoHandler::new(store.clone(), action)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::context;
    use chrono::Duration;
    use syncara_models::SideEffectPayload;

    async fn seed(store: &DocumentStore, ctx: &HandlerContext, items: &[&str]) -> Vec<Todo> {
        let mut out = Vec::new();
        for (i, description) in items.iter().enumerate() {
            let todo = Todo::new(ctx.chat(), *description, ctx.now + Duration::seconds(i as i64));
            store.todos.insert_one(todo.clone()).await.unwrap();
            out.push(todo);
        }
        out
    }

    async fn deferred_text(ctx: &HandlerContext, outcome: &HandlerOutcome) -> String {
        match ctx.deferred.get(outcome.deferred_id().unwrap()).await.unwrap().payload {
            SideEffectPayload::Text { text } => text,
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_by_ordinal() {
        let store = Arc::new(DocumentStore::in_memory());
        let ctx = context(false);
        let seeded = seed(&store, &ctx, &["A", "B"]).await;

        let complete = TodoHandler::new(store.clone(), TodoAction::Complete);
        assert_eq!(complete.handle(&ctx, "2").await, HandlerOutcome::Handled);

        let a = store.todos.get(&seeded[0].id).await.unwrap();
        let b = store.todos.get(&seeded[1].id).await.unwrap();
        assert_eq!(a.status, TodoStatus::Pending);
        assert_eq!(b.status, TodoStatus::Completed);

        let list = TodoHandler::new(store.clone(), TodoAction::List);
        let outcome = list.handle(&ctx, "pending").await;
        let text = deferred_text(&ctx, &outcome).await;
        assert!(text.contains("1. A"));
        assert!(!text.contains('B'));
    }

    #[tokio::test]
    async fn test_create_then_complete_by_id_keeps_description() {
        let store = Arc::new(DocumentStore::in_memory());
        let ctx = context(false);

        let outcome = TodoHandler::new(store.clone(), TodoAction::Create)
            .handle(&ctx, "Beli susu")
            .await;
        assert!(deferred_text(&ctx, &outcome).await.contains("Beli susu"));
        let created = store.todos.all().await.pop().unwrap();

        let complete = TodoHandler::new(store.clone(), TodoAction::Complete);
        assert_eq!(complete.handle(&ctx, &created.id).await, HandlerOutcome::Handled);

        let done = store.todos.get(&created.id).await.unwrap();
        assert_eq!(done.status, TodoStatus::Completed);
        assert_eq!(done.description, "Beli susu");
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_ordinals_skip_completed_items() {
        let store = Arc::new(DocumentStore::in_memory());
        let ctx = context(false);
        let seeded = seed(&store, &ctx, &["A", "B", "C"]).await;
        let complete = TodoHandler::new(store.clone(), TodoAction::Complete);
        complete.handle(&ctx, "1").await;

        // pending view is now [B, C]
        let delete = TodoHandler::new(store.clone(), TodoAction::Delete);
        assert_eq!(delete.handle(&ctx, "2").await, HandlerOutcome::Handled);
        assert!(store.todos.get(&seeded[2].id).await.is_none());
        assert!(store.todos.get(&seeded[1].id).await.is_some());

        assert_eq!(delete.handle(&ctx, "5").await, HandlerOutcome::Failed);
        assert_eq!(delete.handle(&ctx, "").await, HandlerOutcome::Failed);
    }

    #[tokio::test]
    async fn test_update_and_clear() {
        let store = Arc::new(DocumentStore::in_memory());
        let ctx = context(false);
        let seeded = seed(&store, &ctx, &["A", "B"]).await;

        let update = TodoHandler::new(store.clone(), TodoAction::Update);
        assert_eq!(update.handle(&ctx, "1|Beli roti").await, HandlerOutcome::Handled);
        assert_eq!(store.todos.get(&seeded[0].id).await.unwrap().description, "Beli roti");
        assert_eq!(update.handle(&ctx, "1|").await, HandlerOutcome::Failed);

        TodoHandler::new(store.clone(), TodoAction::Complete).handle(&ctx, "1").await;
        let clear = TodoHandler::new(store.clone(), TodoAction::Clear);
        assert_eq!(clear.handle(&ctx, "").await, HandlerOutcome::Handled);
        assert_eq!(store.todos.count(|_| true).await, 1);
        assert_eq!(clear.handle(&ctx, "all").await, HandlerOutcome::Handled);
        assert_eq!(store.todos.count(|_| true).await, 0);
    }

    #[tokio::test]
    async fn test_stats() {
        let store = Arc::new(DocumentStore::in_memory());
        let ctx = context(false);
        seed(&store, &ctx, &["A", "B", "C", "D"]).await;
        TodoHandler::new(store.clone(), TodoAction::Complete).handle(&ctx, "1").await;

        let outcome = TodoHandler::new(store.clone(), TodoAction::Stats).handle(&ctx, "").await;
        let text = deferred_text(&ctx, &outcome).await;
        assert!(text.contains("4 total, 1 selesai, 3 belum (25% selesai)"));
    }

    #[test]
    fn test_list_filter_parse() {
        assert_eq!(ListFilter::parse("").unwrap(), ListFilter::All);
        assert_eq!(ListFilter::parse("Pending").unwrap(), ListFilter::Pending);
        assert!(ListFilter::parse("kemarin").is_err());
    }
}
