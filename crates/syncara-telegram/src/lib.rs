//! Telegram surface for SyncaraBot.
//!
//! This crate connects the assistants to Telegram and gives the owner a
//! control bot.
//!
//! - [`TeloxideTransport`] implements [`syncara_core::Transport`] over the
//!   Bot API and caches recent messages per chat for prompt windows.
//! - [`TelegramLauncher`] logs each assistant in and forwards its updates
//!   to the orchestrator's inbound queue.
//! - [`ManagerBot`] serves the owner-only [`OwnerCommand`]s.
//!
//! # Environment Variables
//!
//! Required:
//! - `MANAGER_BOT_TOKEN`: token of the control bot
//! - `ASSISTANT_SESSION_<NAME>` (or `ASSISTANT_SESSION_DEFAULT`): bot token per assistant
//! - `LLM_API_KEY` (or `OPENROUTER_API_KEY`)
//!
//! Optional:
//! - `SYNCARA_ASSISTANTS`: comma separated persona names (default: aeris)
//! - `OWNER_IDS`, `SYNCARA_CHANNEL_ID`, `SYNCARA_TZ_OFFSET_HOURS`
//! - `LLM_MODEL`, `IMAGE_API_URL`, `SYNCARA_DATABASE`
//!
//! # Commands
//!
//! - `/assistants`, `/status` - what is running
//! - `/startassistant <name>`, `/stopassistant <name>`
//! - `/persona <assistant> <persona>`
//! - `/shortcodes` - registered shortcode documentation
//! - `/channel start|stop|status|schedule|stats`, `/post <kind>`

pub mod commands;
pub mod convert;
pub mod error;
pub mod manager_bot;
pub mod session;
pub mod transport;

pub use commands::{Operator, OwnerCommand, OWNER_ONLY};
pub use convert::inbound_from;
pub use error::{Result, TelegramError};
pub use manager_bot::ManagerBot;
pub use session::TelegramLauncher;
pub use transport::{map_api_error, map_request_error, HistoryCache, TeloxideTransport};
