//! Reminders: `REMINDER:SET:<delay>|<text>` and `REMINDER:LIST`.
//!
//! Reminders are stored as scheduled tasks and delivered by the
//! scheduled-task job.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, FixedOffset};
use syncara_models::{ScheduledTask, ScheduledTaskStatus};
use syncara_persistence::DocumentStore;
use syncara_shortcode::{HandlerContext, HandlerOutcome, ShortcodeHandler, ShortcodeRegistry};
use tracing::debug;

use crate::error::{HandlerError, Result};
use crate::settle;

/// Longest accepted delay.
const MAX_DELAY_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderAction {
    Set,
    List,
}

pub struct ReminderHandler {
    store: Arc<DocumentStore>,
    tz: FixedOffset,
    action: ReminderAction,
}

impl ReminderHandler {
    pub fn new(store: Arc<DocumentStore>, tz: FixedOffset, action: ReminderAction) -> Self {
        Self { store, tz, action }
    }

    async fn run(&self, ctx: &HandlerContext, params: &str) -> Result<HandlerOutcome> {
        let chat = ctx.chat();
        match self.action {
            ReminderAction::Set => {
                let (delay, text) = params
                    .split_once('|')
                    .map(|(d, t)| (d.trim(), t.trim()))
                    .filter(|(_, t)| !t.is_empty())
                    .ok_or_else(|| HandlerError::invalid("expected delay|text"))?;
                let delay = parse_delay(delay)?;
                let task = ScheduledTask::reminder(
                    chat,
                    Some(ctx.message.sender.id),
                    ctx.assistant.id.clone(),
                    text,
                    ctx.now + delay,
                    ctx.now,
                );
                debug!(chat_id = %chat, due_at = %task.due_at, "Reminder scheduled");
                self.store.scheduled_tasks.insert_one(task).await?;
                Ok(HandlerOutcome::Handled)
            }
            ReminderAction::List => {
                let tasks = self
                    .store
                    .scheduled_tasks
                    .find_sorted(
                        |t| t.chat_id == chat && t.status == ScheduledTaskStatus::Pending,
                        |a, b| a.due_at.cmp(&b.due_at),
                        None,
                    )
                    .await;
                let text = if tasks.is_empty() {
                    "⏰ Tidak ada pengingat aktif.".to_string()
                } else {
                    let lines: Vec<String> = tasks
                        .iter()
                        .enumerate()
                        .map(|(i, t)| {
                            format!(
                                "{}. {} - {}",
                                i + 1,
                                t.due_at.with_timezone(&self.tz).format("%d/%m %H:%M"),
                                t.text
                            )
                        })
                        .collect();
                    format!("⏰ Pengingat:\n{}", lines.join("\n"))
                };
                Ok(ctx.defer_text(text).await)
            }
        }
    }
}

#[async_trait]
impl ShortcodeHandler for ReminderHandler {
    async fn handle(&self, ctx: &HandlerContext, params: &str) -> HandlerOutcome {
        settle("REMINDER", self.run(ctx, params).await)
    }
}

/// `30`, `30m`, `2h` or `1d`. A bare number is minutes.
fn parse_delay(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();
    let (number, unit) = match s.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => s.split_at(i),
        None => (s.as_str(), "m"),
    };
    let n: i64 = number
        .parse()
        .map_err(|_| HandlerError::invalid(format!("bad delay '{}'", s)))?;
    let delay = match unit.trim() {
        "m" | "min" | "menit" => Duration::minutes(n),
        "h" | "j" | "jam" => Duration::hours(n),
        "d" | "hari" => Duration::days(n),
        other => return Err(HandlerError::invalid(format!("unknown unit '{}'", other))),
    };
    if n <= 0 || delay > Duration::days(MAX_DELAY_DAYS) {
        return Err(HandlerError::invalid(format!("delay out of range '{}'", s)));
    }
    Ok(delay)
}

pub fn register(
    registry: &mut ShortcodeRegistry,
    store: &Arc<DocumentStore>,
    tz: FixedOffset,
) -> syncara_shortcode::Result<()> {
    registry.register(
        "REMINDER:SET",
        "REMINDER:SET:30m|teks",
        "Ingatkan chat ini setelah jeda (menit, atau akhiran m/h/d)",
        Arc::new(ReminderHandler::new(store.clone(), tz, ReminderAction::Set)),
    )?;
    registry.register(
        "REMINDER:LIST",
        "REMINDER:LIST",
        "Daftar pengingat aktif di chat ini",
        Arc::new(ReminderHandler::new(store.clone(), tz, ReminderAction::List)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{context, tz};

    #[test]
    fn test_parse_delay() {
        assert_eq!(parse_delay("30").unwrap(), Duration::minutes(30));
        assert_eq!(parse_delay("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_delay("1 hari").unwrap(), Duration::days(1));
        assert!(parse_delay("0").is_err());
        assert!(parse_delay("soon").is_err());
        assert!(parse_delay("5w").is_err());
        assert!(parse_delay("400d").is_err());
    }

    #[tokio::test]
    async fn test_set_stores_pending_task() {
        let store = Arc::new(DocumentStore::in_memory());
        let ctx = context(false);
        let set = ReminderHandler::new(store.clone(), tz(), ReminderAction::Set);

        assert_eq!(set.handle(&ctx, "15|minum obat").await, HandlerOutcome::Handled);
        let tasks = store.scheduled_tasks.all().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].text, "minum obat");
        assert_eq!(tasks[0].due_at, ctx.now + Duration::minutes(15));
        assert_eq!(tasks[0].chat_id, ctx.chat());
        assert_eq!(tasks[0].assistant_id, "aeris");

        assert_eq!(set.handle(&ctx, "15").await, HandlerOutcome::Failed);
    }
}
