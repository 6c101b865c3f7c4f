//! Built-in personas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use syncara_models::GenerationParams;

use crate::error::{AgentError, Result};
use crate::prompts::{AERIS_TEMPLATE, DEFAULT_TEMPLATE, KAELEN_TEMPLATE};

/// Name of the fallback persona.
pub const DEFAULT_PERSONA: &str = "default";

/// A named style and role an assistant speaks as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub description: String,
    /// Template with `{placeholder}` slots.
    pub template: String,
    pub generation: GenerationParams,
}

impl Persona {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            template: template.into(),
            generation: GenerationParams::default(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_generation(mut self, generation: GenerationParams) -> Self {
        self.generation = generation;
        self
    }
}

/// Registry of personas keyed by lowercase name.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: BTreeMap<String, Persona>,
}

impl Default for PersonaRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PersonaRegistry {
    /// Registry with the built-in personas.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(
            Persona::new("aeris", AERIS_TEMPLATE)
                .with_description("Warm, playful companion")
                .with_generation(GenerationParams::default().with_temperature(0.9)),
        );
        registry.register(
            Persona::new("kaelen", KAELEN_TEMPLATE)
                .with_description("Calm, analytical mentor")
                .with_generation(
                    GenerationParams::default()
                        .with_temperature(0.6)
                        .with_top_p(0.9),
                ),
        );
        registry.register(
            Persona::new(DEFAULT_PERSONA, DEFAULT_TEMPLATE)
                .with_description("Neutral helpful assistant"),
        );
        registry
    }

    pub fn empty() -> Self {
        Self {
            personas: BTreeMap::new(),
        }
    }

    /// Adds or replaces a persona.
    pub fn register(&mut self, persona: Persona) {
        self.personas.insert(persona.name.to_lowercase(), persona);
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.get(&name.to_lowercase())
    }

    /// Looks up a persona, failing with `UnknownPersona`.
    pub fn require(&self, name: &str) -> Result<&Persona> {
        self.get(name)
            .ok_or_else(|| AgentError::UnknownPersona(name.to_string()))
    }

    /// Looks up a persona, falling back to the default one.
    pub fn resolve(&self, name: &str) -> Option<&Persona> {
        self.get(name).or_else(|| self.get(DEFAULT_PERSONA))
    }

    pub fn names(&self) -> Vec<&str> {
        self.personas.keys().map(String::as_str).collect()
    }
}
