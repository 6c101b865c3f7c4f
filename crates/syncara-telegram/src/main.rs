//! SyncaraBot binary.
//!
//! Start everything with:
//! ```bash
//! MANAGER_BOT_TOKEN=xxx ASSISTANT_SESSION_AERIS=yyy LLM_API_KEY=zzz cargo run -p syncara-telegram
//! ```

use std::sync::Arc;

use clap::Parser;
use syncara_agent::{LlmGateway, OpenRouterClient, PersonaRegistry};
use syncara_autonomous::{AutonomousConfig, AutonomousEngine, AutonomousLoop, ChannelPoster};
use syncara_core::config::{self, STATE_DIR_ENV};
use syncara_core::{Clock, Settings, SystemClock};
use syncara_handlers::{
    register_all, CanvasExports, HandlerServices, MusicPlayer, PollinationsClient,
};
use syncara_memory::LearningStore;
use syncara_models::{Assistant, ChatId};
use syncara_orchestrator::{AssistantManager, Capabilities, Orchestrator, OrchestratorConfig};
use syncara_persistence::DocumentStore;
use syncara_shortcode::{DeferredBuffer, Dispatcher, ShortcodeRegistry};
use syncara_telegram::{ManagerBot, Operator, Result, TelegramLauncher};
use tracing_subscriber::EnvFilter;

/// SyncaraBot - multi-persona Telegram assistants
#[derive(Parser, Debug)]
#[command(name = "syncara")]
#[command(about = "Run the SyncaraBot assistants and the manager bot")]
struct Args {
    /// State directory (default: ~/.syncara)
    #[arg(long, env = "SYNCARA_STATE_DIR")]
    state_dir: Option<String>,

    /// Do not start the autonomous background jobs
    #[arg(long)]
    no_autonomous: bool,

    /// Verbose logging (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Some(dir) = &args.state_dir {
        std::env::set_var(STATE_DIR_ENV, dir);
    }
    config::load_env();

    let filter = match args.verbose {
        0 => "syncara=info,teloxide=warn",
        1 => "syncara=debug,teloxide=info",
        _ => "syncara=trace,teloxide=debug",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = Settings::from_env()?;
    if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "Failed to create all directories");
    }

    let tz = settings.tz_offset;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(DocumentStore::open(config::db_dir().join(&settings.database)).await?);
    let learning = Arc::new(LearningStore::new(store.clone(), tz));
    let model = Arc::new(LlmGateway::new(
        OpenRouterClient::new(settings.llm_api_key.clone()),
        settings.llm_model.clone(),
    ));
    let personas = Arc::new(PersonaRegistry::new());

    let assistants = settings
        .assistants
        .iter()
        .map(|a| Assistant::new(a.name.clone(), a.session_credential.clone()))
        .collect();
    let manager = Arc::new(AssistantManager::new(
        Arc::new(TelegramLauncher::new()),
        assistants,
    ));

    let channel = Arc::new(ChannelPoster::new(
        settings.channel_id.map(ChatId),
        model.clone(),
        manager.clone(),
        store.clone(),
        tz,
    ));

    let mut registry = ShortcodeRegistry::new();
    register_all(
        &mut registry,
        &HandlerServices {
            store: store.clone(),
            learning: learning.clone(),
            channel: channel.clone(),
            images: Arc::new(PollinationsClient::new(&settings.image_api_url)?),
            music: Arc::new(MusicPlayer::new()),
            tz,
        },
    )?;
    registry.seal();
    tracing::info!(shortcodes = registry.len(), "Shortcode registry sealed");

    let caps = Capabilities {
        store: store.clone(),
        learning: learning.clone(),
        model,
        personas,
        dispatcher: Dispatcher::new(Arc::new(registry)),
        deferred: Arc::new(
            DeferredBuffer::new(clock.clone())
                .with_observer(Arc::new(CanvasExports::new(store.clone()))),
        ),
        manager: manager.clone(),
        clock: clock.clone(),
    };
    let orchestrator = Arc::new(Orchestrator::new(
        caps,
        OrchestratorConfig::new(settings.owner_ids.clone(), tz),
    ));

    let started = orchestrator.start_all().await;
    tracing::info!(assistants = ?started, "Assistants started");
    println!("\n[robot] SyncaraBot");
    println!("   Assistants: {}", started.join(", "));
    println!("   State: {}", config::state_dir().display());

    let autonomous = if args.no_autonomous {
        None
    } else {
        let engine = AutonomousEngine::new(
            AutonomousConfig::new(),
            manager.clone(),
            learning,
            channel.clone(),
            clock.clone(),
            tz,
        );
        let autonomous = AutonomousLoop::new(Arc::new(engine));
        autonomous.start().await;
        Some(autonomous)
    };

    let operator = Arc::new(Operator::new(orchestrator.clone(), channel, clock));
    let result = ManagerBot::new(&settings.manager_bot_token, operator).run().await;

    if let Some(autonomous) = autonomous {
        autonomous.shutdown().await;
    }
    orchestrator.shutdown().await;

    result
}
