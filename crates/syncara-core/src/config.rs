//! State directory layout for SyncaraBot.
//!
//! ```text
//! ~/.syncara/
//! ├── db/           # Document store collections
//! ├── logs/         # Application logs
//! ├── config/       # .env.local and user configuration
//! └── cache/        # Downloaded media, temporary files
//! ```
//!
//! `SYNCARA_STATE_DIR` overrides the base directory; `~` is expanded.

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::debug;

/// Environment variable for a custom state directory.
pub const STATE_DIR_ENV: &str = "SYNCARA_STATE_DIR";

const DEFAULT_STATE_DIR: &str = ".syncara";

const DB_SUBDIR: &str = "db";
const LOGS_SUBDIR: &str = "logs";
const CONFIG_SUBDIR: &str = "config";
const CACHE_SUBDIR: &str = "cache";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Resolves a state directory from an optional override.
///
/// Exposed separately from [`state_dir`] so callers (and tests) can resolve
/// without touching the process-wide cache.
pub fn resolve_state_dir(override_dir: Option<&str>) -> PathBuf {
    match override_dir {
        Some(raw) if !raw.trim().is_empty() => {
            PathBuf::from(shellexpand::tilde(raw.trim()).into_owned())
        }
        _ => dirs::home_dir()
            .map(|h| h.join(DEFAULT_STATE_DIR))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR)),
    }
}

/// Get the SyncaraBot state directory.
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| resolve_state_dir(std::env::var(STATE_DIR_ENV).ok().as_deref()))
        .clone()
}

pub fn db_dir() -> PathBuf {
    state_dir().join(DB_SUBDIR)
}

pub fn logs_dir() -> PathBuf {
    state_dir().join(LOGS_SUBDIR)
}

pub fn config_dir() -> PathBuf {
    state_dir().join(CONFIG_SUBDIR)
}

pub fn cache_dir() -> PathBuf {
    state_dir().join(CACHE_SUBDIR)
}

/// Environment file for secrets (tokens, API keys).
pub fn env_file() -> PathBuf {
    config_dir().join(".env.local")
}

/// Ensure the state directory and all subdirectories exist.
pub fn ensure_all_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(db_dir())?;
    std::fs::create_dir_all(logs_dir())?;
    std::fs::create_dir_all(config_dir())?;
    std::fs::create_dir_all(cache_dir())?;
    Ok(())
}

/// Loads environment files: the config-dir `.env.local` first, then
/// `.env.local` or `.env` in the working directory. Existing variables win.
pub fn load_env() {
    let path = env_file();
    if path.exists() {
        match dotenvy::from_path(&path) {
            Ok(()) => debug!(path = %path.display(), "Loaded environment file"),
            Err(e) => debug!(path = %path.display(), error = %e, "Failed to load environment file"),
        }
    }
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_override_is_used() {
        let dir = resolve_state_dir(Some("/srv/syncara"));
        assert_eq!(dir, PathBuf::from("/srv/syncara"));
    }

    #[test]
    fn test_resolve_expands_tilde() {
        let dir = resolve_state_dir(Some("~/bots/syncara"));
        assert!(!dir.to_string_lossy().starts_with('~'));
        assert!(dir.ends_with("bots/syncara"));
    }

    #[test]
    fn test_resolve_default() {
        let dir = resolve_state_dir(None);
        assert!(dir.ends_with(".syncara"));
        let blank = resolve_state_dir(Some("  "));
        assert_eq!(dir, blank);
    }

    #[test]
    fn test_subdir_names() {
        assert!(db_dir().ends_with("db"));
        assert!(logs_dir().ends_with("logs"));
        assert!(config_dir().ends_with("config"));
        assert!(cache_dir().ends_with("cache"));
        assert!(env_file().ends_with(".env.local"));
    }
}
