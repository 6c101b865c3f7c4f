//! Shortcode orchestration for SyncaraBot.
//!
//! The language model asks for side effects by embedding tokens of the form
//! `[CATEGORY:ACTION]` or `[CATEGORY:ACTION:PARAMS]` in its reply. This crate
//! turns those tokens into handler calls:
//!
//! - [`ShortcodeRegistry`] - key to handler map, sealed after startup
//! - [`parse`] - finds tokens in textual order and substitutes
//!   `current_message_id`
//! - [`Dispatcher`] - runs handlers one at a time and cleans the reply
//! - [`DeferredBuffer`] - side effects delivered after the prose reply
//!
//! A handler answers with a [`HandlerOutcome`]: `Handled` and `Deferred`
//! strip the token, `Failed` leaves it in the reply.

pub mod deferred;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod key;
pub mod parser;
pub mod registry;

pub use deferred::{DeferredBuffer, DeliveryObserver};
pub use dispatcher::{DispatchReport, DispatchedShortcode, Dispatcher};
pub use error::{Result, ShortcodeError};
pub use handler::{split_params, HandlerContext, HandlerOutcome, ShortcodeHandler};
pub use key::ShortcodeKey;
pub use parser::{parse, ParsedShortcode, CURRENT_MESSAGE_ID};
pub use registry::{ShortcodeEntry, ShortcodeRegistry};
