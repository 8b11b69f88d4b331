#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Multi-turn conversation state and orchestration.
//!
//! This crate owns the dialogue state machine between a user and a remote
//! completion provider: the message log, the request shape sent to the
//! provider, the topic gate applied to replies, and the session container
//! that ties a credential to a bound client.
//!
//! # Key pieces
//! - [`MessageStore`]: ordered conversation log with append/clear
//! - [`RequestBuilder`]: system prompt + history + new utterance mapping
//! - [`TopicModerator`]: keyword gate with a canned refusal
//! - [`SessionContext`]: per-session credential, client and store
//! - [`ChatOrchestrator`]: drives one turn end to end

mod moderation;
mod orchestrator;
mod request;
mod session;
mod store;

pub use moderation::TopicModerator;
pub use orchestrator::{ChatError, ChatOrchestrator, TurnResult};
pub use request::RequestBuilder;
pub use session::{CompletionBinder, SessionContext};
pub use store::MessageStore;
