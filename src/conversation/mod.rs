//! Conversation handling
//!
//! Session history storage, reply clean-up and the orchestrator that ties
//! the persona registry, completion provider and speech synthesizer
//! together.

pub mod history;
pub mod orchestrator;
pub mod text;

pub use history::{History, SessionStore};
pub use orchestrator::{ChatReply, ChatRequest, Greeting, Orchestrator, VoiceOptions};
pub use text::{ensure_introduction, strip_emphasis};
