//! Personas, prompt assembly and the LLM gateway for SyncaraBot.
//!
//! - [`PersonaRegistry`]: built-in persona templates and their generation
//!   parameters
//! - [`PromptAssembler`]: renders the per-request system prompt from a
//!   persona, the responding assistant, the recent chat window and the
//!   learned user context
//! - [`LanguageModel`]: the seam the orchestrator calls; [`LlmGateway`] is
//!   the OpenRouter-backed implementation

pub mod client;
pub mod error;
pub mod gateway;
pub mod persona;
pub mod prompt;
mod prompts;

pub use client::{ChatContent, ChatMessage, ContentPart, OpenRouterClient};
pub use error::{AgentError, Result};
pub use gateway::{attach_image, GenerationRequest, ImageAttachment, LanguageModel, LlmGateway};
pub use persona::{Persona, PersonaRegistry, DEFAULT_PERSONA};
pub use prompt::{PromptAssembler, PromptInput, KNOWN_PLACEHOLDERS};
