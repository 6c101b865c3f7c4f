//! Per-request system prompt assembly.

use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{DateTime, FixedOffset, Utc};
use regex::{Captures, Regex};
use syncara_memory::UserContext;
use syncara_models::{Assistant, HistoryMessage, InboundMessage, UserId};

use crate::error::{AgentError, Result};
use crate::persona::Persona;

static PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid placeholder regex")
});

/// Placeholders a persona template may use.
pub const KNOWN_PLACEHOLDERS: &[&str] = &[
    "bot_name",
    "bot_username",
    "owner_list",
    "current_time",
    "current_time_in_configured_zone",
    "shortcodes",
];

/// Everything that varies per request.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub persona: &'a Persona,
    pub assistant: &'a Assistant,
    pub message: &'a InboundMessage,
    /// Prior messages in the chat, oldest first.
    pub recent_window: &'a [HistoryMessage],
    pub user: Option<&'a UserContext>,
    pub now: DateTime<Utc>,
}

/// Renders system prompts. Holds the process-wide inputs: owners, the
/// configured zone and the shortcode documentation.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    owners: Vec<UserId>,
    tz: FixedOffset,
    shortcode_docs: String,
    window_limit: usize,
}

impl PromptAssembler {
    pub fn new(owners: Vec<UserId>, tz: FixedOffset) -> Self {
        Self {
            owners,
            tz,
            shortcode_docs: String::new(),
            window_limit: 20,
        }
    }

    /// Sets the enumerated shortcode documentation substituted for `{shortcodes}`.
    pub fn with_shortcode_docs(mut self, docs: impl Into<String>) -> Self {
        self.shortcode_docs = docs.into();
        self
    }

    /// Sets how many window messages are rendered at most.
    pub fn with_window_limit(mut self, limit: usize) -> Self {
        self.window_limit = limit;
        self
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owners.contains(&user)
    }

    /// Builds the full system prompt.
    pub fn render(&self, input: &PromptInput<'_>) -> Result<String> {
        let mut prompt = self.render_template(input.persona, input.assistant, input.now)?;

        if self.is_owner(input.message.sender.id) {
            prompt.push_str("\n\n## Owner mode\n");
            prompt.push_str(
                "Pesan ini dikirim oleh owner kamu. Kamu boleh menjalankan shortcode khusus owner \
                 (CHANNEL, GROUP admin) bila diminta.",
            );
        }

        if let Some(user) = input.user {
            prompt.push_str("\n\n## Tentang pengguna\n");
            let _ = writeln!(prompt, "- Nama: {}", user.first_name);
            let _ = writeln!(prompt, "- Hubungan: {}", user.relationship);
            let _ = writeln!(prompt, "- Preferensi: {}", user.preference_summary());
            let _ = write!(prompt, "- Ringkasan: {}", user.interaction_summary());
            if !user.personality_notes.is_empty() {
                let _ = write!(prompt, "\n- Catatan: {}", user.personality_notes);
            }
        }

        let window = self.render_window(input.recent_window);
        if !window.is_empty() {
            prompt.push_str("\n\n## Riwayat chat terbaru\n");
            prompt.push_str(&window);
        }

        prompt.push_str("\n\n## Pesan saat ini\n");
        prompt.push_str(&render_current(input.message));
        Ok(prompt)
    }

    /// Substitutes the persona template placeholders.
    pub fn render_template(
        &self,
        persona: &Persona,
        assistant: &Assistant,
        now: DateTime<Utc>,
    ) -> Result<String> {
        if let Some(unknown) = PLACEHOLDER_REGEX
            .captures_iter(&persona.template)
            .map(|c| c[1].to_string())
            .find(|name| !KNOWN_PLACEHOLDERS.contains(&name.as_str()))
        {
            return Err(AgentError::PromptAssembly(unknown));
        }

        let owner_list = if self.owners.is_empty() {
            "(none)".to_string()
        } else {
            self.owners
                .iter()
                .map(UserId::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        let current_time = now
            .with_timezone(&self.tz)
            .format("%A, %d %B %Y %H:%M (UTC%:z)")
            .to_string();

        let rendered = PLACEHOLDER_REGEX.replace_all(&persona.template, |caps: &Captures| {
            match &caps[1] {
                "bot_name" => assistant.display_name.clone(),
                "bot_username" => assistant.handle.clone(),
                "owner_list" => owner_list.clone(),
                "current_time" | "current_time_in_configured_zone" => current_time.clone(),
                "shortcodes" => self.shortcode_docs.clone(),
                other => format!("{{{}}}", other),
            }
        });
        Ok(rendered.into_owned())
    }

    fn render_window(&self, window: &[HistoryMessage]) -> String {
        let start = window.len().saturating_sub(self.window_limit);
        let mut out = String::new();
        for msg in &window[start..] {
            let time = msg.date.with_timezone(&self.tz).format("%H:%M");
            let _ = write!(
                out,
                "[{}] #{} {} (id {})",
                time, msg.id, msg.sender_name, msg.sender_id
            );
            if let Some(reply_to) = msg.reply_to {
                let _ = write!(out, " ↪ #{}", reply_to);
            }
            let _ = writeln!(out, ": {}", msg.text);
        }
        out.truncate(out.trim_end().len());
        out
    }
}

fn render_current(message: &InboundMessage) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "message_id: {}", message.id);
    if let Some(reply_to) = message.reply_to_message {
        let _ = write!(out, "reply_to: #{}", reply_to);
        if let Some(author) = &message.reply_to_sender {
            let _ = write!(out, " from {} (id {})", author.display_name(), author.id);
        }
        if let Some(excerpt) = &message.reply_excerpt {
            let _ = write!(out, ": \"{}\"", syncara_core::truncate(excerpt, 200));
        }
        out.push('\n');
    }
    let sender = &message.sender;
    let _ = write!(out, "from: {}", sender.display_name());
    if let Some(username) = &sender.username {
        let _ = write!(out, " (@{}, id {})", username, sender.id);
    } else {
        let _ = write!(out, " (id {})", sender.id);
    }
    let _ = write!(out, "\ntext: {}", message.body());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use syncara_models::{ChatId, ChatKind, MessageId, Sender};

    fn tz() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn assistant() -> Assistant {
        Assistant::new("aeris", "cred").with_identity(UserId(1), "Aeris", "Aeris_sync")
    }

    fn message(sender: UserId) -> InboundMessage {
        InboundMessage::text(
            MessageId(55),
            ChatId(-100),
            ChatKind::Group,
            Sender::new(sender, "Rina").with_username("rina"),
            "hai",
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 1, 30, 0).unwrap()
    }

    #[test]
    fn test_template_substitution() {
        let persona = Persona::new(
            "t",
            "{bot_name} @{bot_username} | {owner_list} | {current_time} | {shortcodes}",
        );
        let assembler = PromptAssembler::new(vec![UserId(9), UserId(10)], tz())
            .with_shortcode_docs("[TODO:LIST] - list todos");

        let out = assembler.render_template(&persona, &assistant(), now()).unwrap();
        assert!(out.starts_with("Aeris @Aeris_sync | 9, 10 | "));
        assert!(out.contains("08:30"));
        assert!(out.contains("UTC+07:00"));
        assert!(out.ends_with("[TODO:LIST] - list todos"));
    }

    #[test]
    fn test_unknown_placeholder_fails() {
        let persona = Persona::new("t", "Hi {bot_name}, mood {mood}");
        let assembler = PromptAssembler::new(Vec::new(), tz());
        let err = assembler.render_template(&persona, &assistant(), now()).unwrap_err();
        assert!(matches!(err, AgentError::PromptAssembly(ref p) if p == "mood"));
    }

    #[test]
    fn test_owner_stanza_only_for_owner() {
        let persona = Persona::new("t", "{bot_name}");
        let assembler = PromptAssembler::new(vec![UserId(9)], tz());
        let a = assistant();

        let owner_msg = message(UserId(9));
        let input = PromptInput {
            persona: &persona,
            assistant: &a,
            message: &owner_msg,
            recent_window: &[],
            user: None,
            now: now(),
        };
        assert!(assembler.render(&input).unwrap().contains("## Owner mode"));

        let other_msg = message(UserId(7));
        let input = PromptInput {
            message: &other_msg,
            ..input
        };
        assert!(!assembler.render(&input).unwrap().contains("## Owner mode"));
    }

    #[test]
    fn test_window_and_current_message() {
        let persona = Persona::new("t", "{bot_name}");
        let assembler = PromptAssembler::new(Vec::new(), tz()).with_window_limit(1);
        let a = assistant();
        let mut msg = message(UserId(7));
        msg.reply_to_message = Some(MessageId(54));
        msg.reply_to_sender = Some(Sender::new(UserId(1), "Aeris"));
        msg.reply_excerpt = Some("sebelumnya".into());

        let window = vec![
            HistoryMessage {
                id: MessageId(50),
                sender_id: UserId(8),
                sender_name: "Budi".into(),
                date: now(),
                text: "lama".into(),
                reply_to: None,
            },
            HistoryMessage {
                id: MessageId(54),
                sender_id: UserId(1),
                sender_name: "Aeris".into(),
                date: now(),
                text: "sebelumnya".into(),
                reply_to: Some(MessageId(50)),
            },
        ];
        let input = PromptInput {
            persona: &persona,
            assistant: &a,
            message: &msg,
            recent_window: &window,
            user: None,
            now: now(),
        };

        let out = assembler.render(&input).unwrap();
        assert!(!out.contains("lama"));
        assert!(out.contains("[08:30] #54 Aeris (id 1) ↪ #50: sebelumnya"));
        assert!(out.contains("message_id: 55"));
        assert!(out.contains("reply_to: #54 from Aeris (id 1): \"sebelumnya\""));
        assert!(out.contains("from: Rina (@rina, id 7)"));
        assert!(out.ends_with("text: hai"));
    }

    #[test]
    fn test_builtin_personas_render() {
        let registry = crate::PersonaRegistry::new();
        let assembler = PromptAssembler::new(vec![UserId(9)], tz());
        for name in registry.names() {
            let persona = registry.get(name).unwrap();
            assert!(assembler.render_template(persona, &assistant(), now()).is_ok());
        }
    }
}
