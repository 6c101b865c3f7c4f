//! Owner commands served by the manager bot.

use std::sync::Arc;

use syncara_autonomous::{ChannelPoster, PostOutcome};
use syncara_core::Clock;
use syncara_models::{PostKind, UserId};
use syncara_orchestrator::{AssistantState, Orchestrator};
use teloxide::utils::command::BotCommands;
use tracing::info;

/// Reply for anyone who is not an owner.
pub const OWNER_ONLY: &str = "⛔ Perintah ini khusus owner.";

/// Manager bot commands.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Perintah manager SyncaraBot:")]
pub enum OwnerCommand {
    #[command(description = "Tampilkan bantuan")]
    Help,

    #[command(description = "Daftar asisten dan statusnya")]
    Assistants,

    #[command(description = "Jalankan asisten: /startassistant <nama>")]
    StartAssistant(String),

    #[command(description = "Hentikan asisten: /stopassistant <nama>")]
    StopAssistant(String),

    #[command(description = "Status asisten dan auto-post channel")]
    Status,

    #[command(description = "Daftar shortcode yang terdaftar")]
    Shortcodes,

    #[command(description = "Ganti persona: /persona <asisten> <persona>")]
    Persona(String),

    #[command(description = "Auto-post channel: /channel start|stop|status|schedule|stats")]
    Channel(String),

    #[command(description = "Posting manual ke channel: /post <jenis>")]
    Post(String),
}

/// Executes owner commands against the running system.
pub struct Operator {
    orchestrator: Arc<Orchestrator>,
    channel: Arc<ChannelPoster>,
    clock: Arc<dyn Clock>,
}

impl Operator {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        channel: Arc<ChannelPoster>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            orchestrator,
            channel,
            clock,
        }
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.orchestrator.is_owner(user)
    }

    /// Runs `cmd` and returns the reply text.
    pub async fn execute(&self, cmd: OwnerCommand) -> String {
        info!(command = ?cmd, "Owner command");
        match cmd {
            OwnerCommand::Help => OwnerCommand::descriptions().to_string(),
            OwnerCommand::Assistants => self.assistants().await,
            OwnerCommand::StartAssistant(name) => self.start_assistant(name.trim()).await,
            OwnerCommand::StopAssistant(name) => self.stop_assistant(name.trim()).await,
            OwnerCommand::Status => {
                let channel = self.channel.status(self.clock.now()).await.render();
                format!("{}\n\n{}", self.assistants().await, channel)
            }
            OwnerCommand::Shortcodes => self.shortcodes(),
            OwnerCommand::Persona(args) => self.persona(&args).await,
            OwnerCommand::Channel(action) => self.channel(action.trim()).await,
            OwnerCommand::Post(kind) => self.post(kind.trim()).await,
        }
    }

    async fn assistants(&self) -> String {
        let statuses = self.orchestrator.manager().status().await;
        if statuses.is_empty() {
            return "Belum ada asisten yang dikonfigurasi.".to_string();
        }
        let mut out = String::from("Asisten:");
        for status in statuses {
            let a = &status.assistant;
            let state = match status.state {
                AssistantState::Running { since } => {
                    format!("🟢 aktif sejak {}", since.format("%Y-%m-%d %H:%M UTC"))
                }
                AssistantState::Stopped => "🔴 dihentikan".to_string(),
                AssistantState::Idle => "⚪ belum jalan".to_string(),
            };
            out.push_str(&format!(
                "\n- {} (@{}) persona {}: {}",
                a.id, a.handle, a.persona_tag, state
            ));
        }
        out
    }

    async fn start_assistant(&self, name: &str) -> String {
        if name.is_empty() {
            return "Format: /startassistant <nama>".to_string();
        }
        match self.orchestrator.start_assistant(name).await {
            Ok(client) => format!(
                "✅ {} berjalan sebagai @{}",
                client.assistant.id, client.assistant.handle
            ),
            Err(e) => format!("❌ Gagal menjalankan {}: {}", name, e),
        }
    }

    async fn stop_assistant(&self, name: &str) -> String {
        if name.is_empty() {
            return "Format: /stopassistant <nama>".to_string();
        }
        match self.orchestrator.stop_assistant(name).await {
            Ok(()) => format!("✅ {} dihentikan", name),
            Err(e) => format!("❌ Gagal menghentikan {}: {}", name, e),
        }
    }

    fn shortcodes(&self) -> String {
        let registry = self.orchestrator.capabilities().dispatcher.registry();
        format!(
            "{} shortcode terdaftar:\n{}",
            registry.len(),
            registry.documentation()
        )
    }

    async fn persona(&self, args: &str) -> String {
        let mut parts = args.split_whitespace();
        let (Some(assistant), Some(persona)) = (parts.next(), parts.next()) else {
            let names = self.orchestrator.capabilities().personas.names().join(", ");
            return format!("Format: /persona <asisten> <persona>\nPersona: {}", names);
        };
        match self.orchestrator.set_persona(assistant, persona).await {
            Ok(()) => format!("✅ {} sekarang memakai persona {}", assistant, persona),
            Err(e) => format!("❌ {}", e),
        }
    }

    async fn channel(&self, action: &str) -> String {
        match action.to_lowercase().as_str() {
            "start" => {
                if self.channel.start() {
                    "✅ Auto-post channel dimulai".to_string()
                } else {
                    "Auto-post channel sudah berjalan".to_string()
                }
            }
            "stop" => {
                if self.channel.stop() {
                    "✅ Auto-post channel dihentikan".to_string()
                } else {
                    "Auto-post channel memang tidak berjalan".to_string()
                }
            }
            "" | "status" => self.channel.status(self.clock.now()).await.render(),
            "schedule" => format!("Jadwal:\n{}", self.channel.schedule_lines().join("\n")),
            "stats" => self.channel.stats().await.render(),
            other => format!(
                "Aksi tidak dikenal: {}. Pakai start, stop, status, schedule atau stats.",
                other
            ),
        }
    }

    async fn post(&self, kind: &str) -> String {
        let kind: PostKind = match kind.parse() {
            Ok(kind) => kind,
            Err(e) => {
                let kinds: Vec<&str> = PostKind::ALL.iter().map(|k| k.slug()).collect();
                return format!("❌ {}\nJenis: {}", e, kinds.join(", "));
            }
        };
        match self.channel.post_now(kind, self.clock.now()).await {
            Ok(PostOutcome::Posted(post)) => {
                format!("✅ {} terkirim ke channel: {}", kind.label(), post.title)
            }
            Ok(PostOutcome::AlreadyPosted { bucket, .. }) => {
                format!("{} sudah diposting untuk periode {}", kind.label(), bucket)
            }
            Err(e) => format!("❌ Gagal posting {}: {}", kind.label(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            OwnerCommand::parse("/startassistant aeris", "syncara_manager_bot").unwrap(),
            OwnerCommand::StartAssistant("aeris".into())
        );
        assert_eq!(
            OwnerCommand::parse("/persona aeris kaelen", "syncara_manager_bot").unwrap(),
            OwnerCommand::Persona("aeris kaelen".into())
        );
        assert_eq!(
            OwnerCommand::parse("/status", "syncara_manager_bot").unwrap(),
            OwnerCommand::Status
        );
        assert!(OwnerCommand::parse("/reboot", "syncara_manager_bot").is_err());
    }

    #[test]
    fn test_descriptions_list_every_command() {
        let help = OwnerCommand::descriptions().to_string();
        for cmd in ["/assistants", "/startassistant", "/persona", "/channel", "/post"] {
            assert!(help.contains(cmd), "missing {}", cmd);
        }
    }
}
