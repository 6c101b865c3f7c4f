//! Assistant lifecycle and the per-message pipeline for SyncaraBot.
//!
//! [`AssistantManager`] owns the client sessions: it starts and stops
//! them, looks them up by id or username and exposes them to the
//! autonomous loop as a [`ClientDirectory`](syncara_core::ClientDirectory).
//!
//! [`Orchestrator`] runs each inbound message through the pipeline:
//!
//! 1. decide whether the assistant is addressed
//! 2. strip the assistant's handle and record the sender
//! 3. render the prompt and call the model
//! 4. dispatch shortcodes in the reply
//! 5. send the cleaned reply, then flush deferred side effects
//! 6. record the exchange in memory
//!
//! Failures in steps 3 and 4 become a fixed apology; failures after the
//! reply is composed are logged and never retried.
//!
//! # Example
//!
//! ```ignore
//! let orchestrator = Arc::new(Orchestrator::new(caps, OrchestratorConfig::new(owners, tz)));
//! orchestrator.start_all().await;
//! ```

pub mod addressing;
mod error;
pub mod manager;
mod orchestrator;

pub use addressing::{addressed_to, strip_handle, Addressed};
pub use error::{OrchestratorError, Result};
pub use manager::{AssistantManager, AssistantState, AssistantStatus, Session, SessionLauncher};
pub use orchestrator::{Capabilities, Handled, Orchestrator, OrchestratorConfig, APOLOGY};
