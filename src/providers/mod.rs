//! Provider module for VoxChat
//!
//! This module contains the completion provider abstraction and the
//! OpenAI and Ollama implementations.

pub mod base;
pub mod ollama;
pub mod openai;

pub use base::{CompletionOptions, CompletionResponse, Message, Provider, Role, TokenUsage};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

use crate::config::ProviderConfig;
use crate::error::{Result, VoxchatError};
use std::sync::Arc;

/// Create a provider instance based on configuration
///
/// # Arguments
///
/// * `config` - Provider configuration; `provider_type` selects the backend
///
/// # Errors
///
/// Returns error if the provider type is unknown or initialization fails
/// (for example a missing OpenAI API key)
///
/// # Examples
///
/// ```
/// use voxchat::config::ProviderConfig;
/// use voxchat::providers::create_provider;
///
/// let mut config = ProviderConfig::default();
/// config.provider_type = "ollama".to_string();
/// let provider = create_provider(&config).unwrap();
/// assert_eq!(provider.name(), "ollama");
/// ```
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn Provider>> {
    match config.provider_type.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config.openai.clone())?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(config.ollama.clone())?)),
        other => Err(VoxchatError::Provider(format!("Unknown provider type: {}", other)).into()),
    }
}
