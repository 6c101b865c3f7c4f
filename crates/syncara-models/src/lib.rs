//! Core data models for SyncaraBot.
//!
//! This crate provides the plain data types shared by every other crate:
//! assistants, learned user profiles, inbound messages, deferred side
//! effects, and the handler-local records (virtual files, todos, channel
//! posts, autonomous task audit entries).

pub mod assistant;
pub mod canvas;
pub mod channel;
pub mod group;
pub mod ids;
pub mod message;
pub mod profile;
pub mod side_effect;
pub mod task;
pub mod todo;

pub use assistant::{Assistant, GenerationParams};
pub use canvas::{FileVersion, VirtualFile, MAX_FILE_HISTORY};
pub use channel::{ChannelAnalytics, ChannelPost, EngagementCounters, PostKind, PostStatus};
pub use group::{GroupRecord, SystemLogEntry};
pub use ids::{ChatId, MessageId, UserId};
pub use message::{
    ChatKind, EntityKind, HistoryMessage, InboundMessage, MediaKind, MediaSource, Sender,
};
pub use profile::{
    ContextCounters, ConversationEntry, FeedbackEntry, InteractionContext, InteractionType,
    LearningPatterns, Mood, Preferences, QualityEntry, ResponseLength, UserProfile,
};
pub use side_effect::{
    PendingSideEffect, SideEffectKind, SideEffectPayload, DEFAULT_SIDE_EFFECT_TTL_SECS,
};
pub use task::{
    AutonomousTaskRecord, ScheduledTask, ScheduledTaskKind, ScheduledTaskStatus, TaskKind,
    TaskStatus,
};
pub use todo::{Todo, TodoStatus};
