//! VoxChat - persona chat server library
//!
//! This library provides the core functionality for VoxChat, an HTTP
//! server that proxies chat messages to an LLM completion API under a
//! selectable persona and optionally speaks the replies.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `persona`: Built-in personas and the read-only registry
//! - `conversation`: Session history store and the conversation orchestrator
//! - `providers`: Completion provider abstraction and implementations (OpenAI, Ollama)
//! - `speech`: Voice settings, reply chunking and the ElevenLabs synthesizer
//! - `server`: axum routes, wire types and HTTP error mapping
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use voxchat::{Config, Orchestrator};
//! use voxchat::providers::create_provider;
//! use voxchat::speech::create_synthesizer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let provider = create_provider(&config.provider)?;
//!     let synthesizer = create_synthesizer(&config.speech)?;
//!     let orchestrator = Orchestrator::new(&config, provider, synthesizer);
//!
//!     let greeting = orchestrator.initialize_session("doctor", "s1").await?;
//!     println!("{}", greeting.text);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod error;
pub mod persona;
pub mod providers;
pub mod server;
pub mod speech;

// Re-export commonly used types
pub use config::Config;
pub use conversation::{ChatReply, ChatRequest, Greeting, Orchestrator};
pub use error::{Result, VoxchatError};
pub use persona::{Persona, PersonaRegistry};

#[cfg(test)]
pub mod test_utils;
