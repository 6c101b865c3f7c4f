//! Memory and learning store for SyncaraBot.
//!
//! Each user has one [`UserProfile`](syncara_models::UserProfile) document.
//! Writes append to bounded logs and trim in the same document update, then
//! recompute the aggregated learning patterns. The classifiers in
//! [`classify`] are pure functions so they can be tested in isolation.

pub mod classify;
pub mod context;
pub mod error;
pub mod store;

pub use classify::{
    classify_interaction, contains_emoji, detect_mood, effectiveness, extract_topics, jaccard,
    quality_score,
};
pub use context::{RelationshipLevel, UserContext};
pub use error::{MemoryError, Result};
pub use store::{LearningConfig, LearningStore, UpsertOutcome};
