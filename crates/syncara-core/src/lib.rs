//! Syncara Core - shared plumbing for every SyncaraBot crate.
//!
//! - **config**: state directory layout and `.env` loading
//! - **settings**: typed process settings read from the environment
//! - **transport**: the chat-platform interface the assistants drive
//! - **clock**: injectable wall clock
//! - **text**: small string helpers

pub mod clock;
pub mod config;
pub mod settings;
pub mod text;
pub mod transport;

pub use clock::{Clock, SystemClock};
pub use config::{
    cache_dir, config_dir, db_dir, ensure_all_dirs, env_file, load_env, logs_dir, state_dir,
};
pub use settings::{ConfigError, Settings};
pub use text::{truncate, split_message, MAX_MESSAGE_LEN};
pub use transport::{
    ChatInfo, ChatRights, ClientDirectory, ClientHandle, ClientIdentity, Transport,
    TransportError, TransportResult,
};
