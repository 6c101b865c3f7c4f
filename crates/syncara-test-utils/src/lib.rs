//! Test utilities for SyncaraBot.
//!
//! Deterministic stand-ins for the external collaborators so the pipeline
//! can be exercised without Telegram or an inference service.
//!
//! - [`MockTransport`] - records every send and admin call; individual
//!   chats or operations can be scripted to fail
//! - [`ScriptedModel`] - returns queued replies and captures requests
//! - [`FixedClock`] - a settable clock
//! - [`fixtures`] - message and sender builders

pub mod fixtures;
pub mod mock_clock;
pub mod mock_model;
pub mod mock_transport;

pub use mock_clock::FixedClock;
pub use mock_model::ScriptedModel;
pub use mock_transport::{MockTransport, RecordedCall, SentKind, SentMessage};
