//! Process settings read from the environment.

use chrono::FixedOffset;
use syncara_models::UserId;
use thiserror::Error;

/// Default LLM model identifier (OpenRouter naming).
pub const DEFAULT_LLM_MODEL: &str = "google/gemini-2.0-flash-001";

/// Default wall-clock zone offset (WIB, UTC+7).
pub const DEFAULT_TZ_OFFSET_HOURS: i32 = 7;

/// Default database name under the state `db/` directory.
pub const DEFAULT_DATABASE: &str = "syncara";

/// Default image generation endpoint.
pub const DEFAULT_IMAGE_API_URL: &str = "https://image.pollinations.ai/prompt";

/// Errors raised while reading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(String),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// One configured assistant: persona name plus its session credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantSettings {
    pub name: String,
    pub session_credential: String,
}

/// Typed settings for the whole process.
#[derive(Debug, Clone)]
pub struct Settings {
    pub telegram_api_id: Option<i32>,
    pub telegram_api_hash: Option<String>,
    pub manager_bot_token: String,
    pub assistants: Vec<AssistantSettings>,
    pub llm_api_key: String,
    pub llm_model: String,
    pub database: String,
    pub owner_ids: Vec<UserId>,
    pub tz_offset: FixedOffset,
    pub channel_id: Option<i64>,
    pub image_api_url: String,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| get(key).ok_or_else(|| ConfigError::Missing(key.to_string()));

        let telegram_api_id = get("TELEGRAM_API_ID")
            .map(|raw| parse_number::<i32>("TELEGRAM_API_ID", &raw))
            .transpose()?;

        let names = get("SYNCARA_ASSISTANTS").unwrap_or_else(|| "aeris".to_string());
        let mut assistants = Vec::new();
        for name in names.split(',').map(|n| n.trim().to_lowercase()) {
            if name.is_empty() || assistants.iter().any(|a: &AssistantSettings| a.name == name) {
                continue;
            }
            let specific = format!("ASSISTANT_SESSION_{}", name.to_uppercase());
            let session_credential = get(&specific)
                .or_else(|| get("ASSISTANT_SESSION_DEFAULT"))
                .ok_or(ConfigError::Missing(specific))?;
            assistants.push(AssistantSettings {
                name,
                session_credential,
            });
        }

        let llm_api_key = get("LLM_API_KEY")
            .or_else(|| get("OPENROUTER_API_KEY"))
            .ok_or_else(|| ConfigError::Missing("LLM_API_KEY".to_string()))?;

        let owner_ids = match get("OWNER_IDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_number::<i64>("OWNER_IDS", s).map(UserId))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let offset_hours = get("SYNCARA_TZ_OFFSET_HOURS")
            .map(|raw| parse_number::<i32>("SYNCARA_TZ_OFFSET_HOURS", &raw))
            .transpose()?
            .unwrap_or(DEFAULT_TZ_OFFSET_HOURS);
        let tz_offset = FixedOffset::east_opt(offset_hours * 3600).ok_or_else(|| {
            ConfigError::Invalid {
                key: "SYNCARA_TZ_OFFSET_HOURS".to_string(),
                message: format!("offset {} out of range", offset_hours),
            }
        })?;

        let channel_id = get("SYNCARA_CHANNEL_ID")
            .map(|raw| parse_number::<i64>("SYNCARA_CHANNEL_ID", &raw))
            .transpose()?;

        Ok(Self {
            telegram_api_id,
            telegram_api_hash: get("TELEGRAM_API_HASH"),
            manager_bot_token: require("MANAGER_BOT_TOKEN")?,
            assistants,
            llm_api_key,
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            database: get("SYNCARA_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            owner_ids,
            tz_offset,
            channel_id,
            image_api_url: get("IMAGE_API_URL").unwrap_or_else(|| DEFAULT_IMAGE_API_URL.to_string()),
        })
    }

    pub fn is_owner(&self, user: UserId) -> bool {
        self.owner_ids.contains(&user)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        key: key.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("MANAGER_BOT_TOKEN", "123:abc"),
            ("ASSISTANT_SESSION_DEFAULT", "default-session"),
            ("LLM_API_KEY", "sk-test"),
        ]
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&base())).unwrap();
        assert_eq!(settings.assistants.len(), 1);
        assert_eq!(settings.assistants[0].name, "aeris");
        assert_eq!(settings.assistants[0].session_credential, "default-session");
        assert_eq!(settings.llm_model, DEFAULT_LLM_MODEL);
        assert_eq!(settings.database, DEFAULT_DATABASE);
        assert_eq!(settings.tz_offset.local_minus_utc(), 7 * 3600);
        assert!(settings.owner_ids.is_empty());
        assert!(settings.channel_id.is_none());
    }

    #[test]
    fn test_per_assistant_session_overrides_default() {
        let mut pairs = base();
        pairs.push(("SYNCARA_ASSISTANTS", "aeris, Kaelen,aeris"));
        pairs.push(("ASSISTANT_SESSION_KAELEN", "kaelen-session"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(settings.assistants.len(), 2);
        assert_eq!(settings.assistants[0].session_credential, "default-session");
        assert_eq!(settings.assistants[1].name, "kaelen");
        assert_eq!(settings.assistants[1].session_credential, "kaelen-session");
    }

    #[test]
    fn test_missing_session_without_default() {
        let pairs = vec![("MANAGER_BOT_TOKEN", "t"), ("LLM_API_KEY", "k")];
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == "ASSISTANT_SESSION_AERIS"));
    }

    #[test]
    fn test_missing_manager_token() {
        let pairs = vec![("ASSISTANT_SESSION_DEFAULT", "s"), ("LLM_API_KEY", "k")];
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ref k) if k == "MANAGER_BOT_TOKEN"));
    }

    #[test]
    fn test_openrouter_key_fallback() {
        let pairs = vec![
            ("MANAGER_BOT_TOKEN", "t"),
            ("ASSISTANT_SESSION_DEFAULT", "s"),
            ("OPENROUTER_API_KEY", "sk-or"),
        ];
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.llm_api_key, "sk-or");
    }

    #[test]
    fn test_owner_ids_parsed() {
        let mut pairs = base();
        pairs.push(("OWNER_IDS", "111, 222"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.owner_ids, vec![UserId(111), UserId(222)]);
        assert!(settings.is_owner(UserId(222)));
        assert!(!settings.is_owner(UserId(333)));
    }

    #[test]
    fn test_invalid_owner_id() {
        let mut pairs = base();
        pairs.push(("OWNER_IDS", "111,abc"));
        let err = Settings::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn test_tz_offset_override() {
        let mut pairs = base();
        pairs.push(("SYNCARA_TZ_OFFSET_HOURS", "-3"));
        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(settings.tz_offset.local_minus_utc(), -3 * 3600);
    }
}
