//! Assistant identities and their generation parameters.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Sampling parameters passed to the language model for one assistant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// Temperature for response generation (0.0 to 2.0).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Nucleus sampling cutoff.
    #[serde(default = "default_top_p")]
    pub top_p: f32,

    /// Maximum tokens to generate in responses.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub presence_penalty: f32,

    #[serde(default)]
    pub frequency_penalty: f32,
}

fn default_temperature() -> f32 {
    0.8
}

fn default_top_p() -> f32 {
    0.95
}

fn default_max_tokens() -> u32 {
    2048
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
        }
    }
}

impl GenerationParams {
    /// Set the temperature, clamped to the accepted range.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set the maximum tokens.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the top-p cutoff, clamped to `[0, 1]`.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p.clamp(0.0, 1.0);
        self
    }
}

/// A user-account client driven by a persona.
///
/// Assistants are defined in startup configuration. `user_id`, `display_name`
/// and `handle` are refreshed from the transport once the session connects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    /// Configuration key, e.g. `aeris`.
    pub id: String,
    /// Telegram account id, known after the session starts.
    pub user_id: Option<UserId>,
    /// Display name shown to users.
    pub display_name: String,
    /// Username without the leading `@`.
    pub handle: String,
    /// Persona this assistant speaks as.
    pub persona_tag: String,
    /// Session credential (bot token or session string).
    #[serde(skip_serializing, default)]
    pub session_credential: String,
    pub enabled: bool,
    #[serde(default)]
    pub generation: GenerationParams,
}

impl Assistant {
    /// Create an enabled assistant whose persona matches its id.
    pub fn new(id: impl Into<String>, session_credential: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: capitalize(&id),
            handle: id.clone(),
            persona_tag: id.clone(),
            id,
            user_id: None,
            session_credential: session_credential.into(),
            enabled: true,
            generation: GenerationParams::default(),
        }
    }

    /// Set the persona tag.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona_tag = persona.into();
        self
    }

    /// Set the account identity observed from the transport.
    pub fn with_identity(
        mut self,
        user_id: UserId,
        display_name: impl Into<String>,
        handle: impl Into<String>,
    ) -> Self {
        self.user_id = Some(user_id);
        self.display_name = display_name.into();
        self.handle = handle.into();
        self
    }

    /// Whether `handle` refers to this assistant (case-insensitive, `@` optional).
    pub fn matches_handle(&self, handle: &str) -> bool {
        let handle = handle.trim_start_matches('@');
        !self.handle.is_empty() && self.handle.eq_ignore_ascii_case(handle)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
