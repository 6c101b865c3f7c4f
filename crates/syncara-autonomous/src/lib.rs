//! Autonomous behaviour for SyncaraBot.
//!
//! A set of cadenced jobs that run next to the message pipeline:
//!
//! | Job | Cadence |
//! |---|---|
//! | user-activity scan | 5 min |
//! | proactive-assistance sweep | 15 min |
//! | scheduled tasks | 1 min |
//! | chat-health monitor | 6 h |
//! | learning optimiser | 2 h |
//! | channel auto-poster | 1 min |
//!
//! Every unsolicited send goes through [`GuardedSender`], which refuses to
//! DM users that are unknown, unreachable or have never talked to an
//! assistant privately, and flags users whose DMs the transport refuses.
//! Every decision lands in the [`AuditLog`].

pub mod audit;
pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod proactive;
pub mod scheduler;

pub use audit::AuditLog;
pub use channel::{
    bucket_key, BucketPeriod, ChannelPoster, ChannelSchedule, ChannelStats, ChannelStatus,
    PostOutcome, ScheduleSlot, SlotDays,
};
pub use config::AutonomousConfig;
pub use engine::{AutonomousEngine, JobSummary};
pub use error::{AutonomousError, Result};
pub use guard::{GuardedSender, SendOutcome};
pub use proactive::{suggest, ProactiveSuggestion, SuggestionReason};
pub use scheduler::{AutonomousLoop, Job};
