//! Configuration management for VoxChat
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//! The resulting [`Config`] is built once at startup and passed into the
//! orchestrator, the completion provider and the speech synthesizer.

use crate::error::{Result, VoxchatError};
use crate::persona::{Persona, PersonaRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for VoxChat
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Completion provider configuration (OpenAI, Ollama)
    #[serde(default)]
    pub provider: ProviderConfig,
    /// Conversation and history settings
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// Speech synthesis settings
    #[serde(default)]
    pub speech: SpeechConfig,
    /// Persona overrides applied on top of the built-in registry
    #[serde(default)]
    pub personas: Vec<Persona>,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Deployment environment: "development" or "production"
    ///
    /// Internal error details are only returned to clients outside
    /// production.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Directory of static assets served for unmatched GET requests
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    /// Enable permissive CORS headers
    #[serde(default = "default_cors")]
    pub cors: bool,

    /// Maximum accepted upload size for /transcribe (bytes)
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_cors() -> bool {
    true
}

fn default_max_upload_bytes() -> usize {
    5 * 1024 * 1024 // 5 MB
}

impl ServerConfig {
    /// Whether the server runs in the production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            static_dir: None,
            cors: default_cors(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// Provider configuration
///
/// Specifies which completion provider to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Type of provider to use
    #[serde(rename = "type", default = "default_provider_type")]
    pub provider_type: String,

    /// OpenAI-compatible provider configuration
    #[serde(default)]
    pub openai: OpenAiConfig,

    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
}

fn default_provider_type() -> String {
    "openai".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: default_provider_type(),
            openai: OpenAiConfig::default(),
            ollama: OllamaConfig::default(),
        }
    }
}

/// OpenAI chat-completions provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API base URL (useful for tests, proxies and compatible servers)
    #[serde(default = "default_openai_api_base")]
    pub api_base: String,

    /// API key; usually supplied through `OPENAI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model to use for completions
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Backoff suggested to clients when a 429 carries no Retry-After header
    #[serde(default = "default_rate_limit_retry_secs")]
    pub rate_limit_retry_secs: u64,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

fn default_openai_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_rate_limit_retry_secs() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_base: default_openai_api_base(),
            api_key: None,
            model: default_openai_model(),
            rate_limit_retry_secs: default_rate_limit_retry_secs(),
            timeout_seconds: default_request_timeout(),
        }
    }
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama server host
    #[serde(default = "default_ollama_host")]
    pub host: String,

    /// Model to use for Ollama
    #[serde(default = "default_ollama_model")]
    pub model: String,

    /// Request timeout (seconds); local models answer slower than hosted ones
    #[serde(default = "default_ollama_timeout")]
    pub timeout_seconds: u64,
}

fn default_ollama_host() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_timeout() -> u64 {
    120
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: default_ollama_host(),
            model: default_ollama_model(),
            timeout_seconds: default_ollama_timeout(),
        }
    }
}

/// Conversation management configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Maximum number of turns retained per session, oldest discarded first
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Persona used when a chat request names no role or an unknown one
    #[serde(default = "default_role")]
    pub default_role: String,

    /// Sampling temperature for completions
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens generated per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// User turn sent when a session is initialized
    #[serde(default = "default_greeting_prompt")]
    pub greeting_prompt: String,
}

fn default_history_cap() -> usize {
    10
}

fn default_role() -> String {
    "tutor".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    500
}

fn default_greeting_prompt() -> String {
    "Please introduce yourself by name in one or two sentences and ask how you can help me today."
        .to_string()
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            history_cap: default_history_cap(),
            default_role: default_role(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            greeting_prompt: default_greeting_prompt(),
        }
    }
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Enable voice output; when false greetings and replies are text-only
    #[serde(default = "default_speech_enabled")]
    pub enabled: bool,

    /// ElevenLabs API base URL
    #[serde(default = "default_speech_api_base")]
    pub api_base: String,

    /// API key; usually supplied through `ELEVENLABS_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    /// Synthesis model identifier
    #[serde(default = "default_speech_model")]
    pub model_id: String,

    /// Words per synthesis chunk
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,

    /// Default voice stability (0.0-1.0)
    #[serde(default = "default_stability")]
    pub stability: f64,

    /// Default voice similarity boost (0.0-1.0)
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f64,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

fn default_speech_enabled() -> bool {
    true
}

fn default_speech_api_base() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_speech_model() -> String {
    "eleven_monolingual_v1".to_string()
}

fn default_chunk_words() -> usize {
    50
}

fn default_stability() -> f64 {
    0.5
}

fn default_similarity_boost() -> f64 {
    0.75
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: default_speech_enabled(),
            api_base: default_speech_api_base(),
            api_key: None,
            model_id: default_speech_model(),
            chunk_words: default_chunk_words(),
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
            timeout_seconds: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| VoxchatError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| VoxchatError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        // Server overrides
        if let Ok(host) = std::env::var("VOXCHAT_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("VOXCHAT_PORT") {
            if let Ok(value) = port.parse() {
                self.server.port = value;
            } else {
                tracing::warn!("Invalid VOXCHAT_PORT: {}", port);
            }
        }

        if let Ok(environment) = std::env::var("VOXCHAT_ENVIRONMENT") {
            self.server.environment = environment;
        }

        if let Ok(static_dir) = std::env::var("VOXCHAT_STATIC_DIR") {
            self.server.static_dir = Some(PathBuf::from(static_dir));
        }

        // Provider overrides
        if let Ok(provider_type) = std::env::var("VOXCHAT_PROVIDER") {
            self.provider.provider_type = provider_type;
        }

        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if !api_key.trim().is_empty() {
                self.provider.openai.api_key = Some(api_key);
            }
        }

        if let Ok(model) = std::env::var("VOXCHAT_OPENAI_MODEL") {
            self.provider.openai.model = model;
        }

        if let Ok(api_base) = std::env::var("VOXCHAT_OPENAI_API_BASE") {
            self.provider.openai.api_base = api_base;
        }

        if let Ok(ollama_host) = std::env::var("VOXCHAT_OLLAMA_HOST") {
            self.provider.ollama.host = ollama_host;
        }

        if let Ok(ollama_model) = std::env::var("VOXCHAT_OLLAMA_MODEL") {
            self.provider.ollama.model = ollama_model;
        }

        // Conversation overrides
        if let Ok(cap) = std::env::var("VOXCHAT_HISTORY_CAP") {
            if let Ok(value) = cap.parse() {
                self.conversation.history_cap = value;
            } else {
                tracing::warn!("Invalid VOXCHAT_HISTORY_CAP: {}", cap);
            }
        }

        if let Ok(role) = std::env::var("VOXCHAT_DEFAULT_ROLE") {
            self.conversation.default_role = role;
        }

        // Speech overrides
        if let Ok(api_key) = std::env::var("ELEVENLABS_API_KEY") {
            if !api_key.trim().is_empty() {
                self.speech.api_key = Some(api_key);
            }
        }

        if let Ok(enabled) = std::env::var("VOXCHAT_TTS_ENABLED") {
            match enabled.parse::<bool>() {
                Ok(v) => {
                    self.speech.enabled = v;
                    tracing::debug!(enabled = v, "Env override: VOXCHAT_TTS_ENABLED");
                }
                Err(_) => {
                    tracing::warn!("Invalid value for VOXCHAT_TTS_ENABLED: {}", enabled);
                }
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if cli.verbose {
            tracing::debug!("Verbose mode enabled");
        }

        if let crate::cli::Commands::Serve { host, port } = &cli.command {
            if let Some(host) = host {
                self.server.host = host.clone();
            }
            if let Some(port) = port {
                self.server.port = *port;
            }
        }
    }

    /// Builds the persona registry: built-in personas plus configured overrides
    pub fn persona_registry(&self) -> PersonaRegistry {
        PersonaRegistry::builtin().with_overrides(self.personas.clone())
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let valid_providers = ["openai", "ollama"];
        if !valid_providers.contains(&self.provider.provider_type.as_str()) {
            return Err(VoxchatError::Config(format!(
                "Invalid provider type: {}. Must be one of: {}",
                self.provider.provider_type,
                valid_providers.join(", ")
            ))
            .into());
        }

        let valid_environments = ["development", "production"];
        if !valid_environments.contains(&self.server.environment.to_lowercase().as_str()) {
            return Err(VoxchatError::Config(format!(
                "Invalid environment: {}. Must be one of: {}",
                self.server.environment,
                valid_environments.join(", ")
            ))
            .into());
        }

        if self.server.max_upload_bytes == 0 {
            return Err(VoxchatError::Config(
                "server.max_upload_bytes must be greater than 0".to_string(),
            )
            .into());
        }

        validate_url("provider.openai.api_base", &self.provider.openai.api_base)?;
        validate_url("provider.ollama.host", &self.provider.ollama.host)?;
        validate_url("speech.api_base", &self.speech.api_base)?;

        let timeouts = [
            ("provider.openai.timeout_seconds", self.provider.openai.timeout_seconds),
            ("provider.ollama.timeout_seconds", self.provider.ollama.timeout_seconds),
            ("speech.timeout_seconds", self.speech.timeout_seconds),
        ];
        for (field, secs) in timeouts {
            if secs == 0 {
                return Err(VoxchatError::Config(format!("{} must be greater than 0", field)).into());
            }
        }

        // The init seed stores three turns, so the cap must hold them.
        if !(3..=100).contains(&self.conversation.history_cap) {
            return Err(VoxchatError::Config(
                "conversation.history_cap must be between 3 and 100".to_string(),
            )
            .into());
        }

        if !(0.0..=2.0).contains(&self.conversation.temperature) {
            return Err(VoxchatError::Config(
                "conversation.temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if self.conversation.max_tokens == 0 {
            return Err(VoxchatError::Config(
                "conversation.max_tokens must be greater than 0".to_string(),
            )
            .into());
        }

        if self.conversation.greeting_prompt.trim().is_empty() {
            return Err(VoxchatError::Config(
                "conversation.greeting_prompt cannot be empty".to_string(),
            )
            .into());
        }

        if self.speech.chunk_words == 0 {
            return Err(VoxchatError::Config(
                "speech.chunk_words must be greater than 0".to_string(),
            )
            .into());
        }

        if !(0.0..=1.0).contains(&self.speech.stability) {
            return Err(VoxchatError::Config(
                "speech.stability must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        if !(0.0..=1.0).contains(&self.speech.similarity_boost) {
            return Err(VoxchatError::Config(
                "speech.similarity_boost must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        for persona in &self.personas {
            if persona.key.trim().is_empty() || persona.system_prompt.trim().is_empty() {
                return Err(VoxchatError::Config(
                    "personas entries need a key and a system_prompt".to_string(),
                )
                .into());
            }
        }

        if !self
            .persona_registry()
            .contains(&self.conversation.default_role)
        {
            return Err(VoxchatError::Config(format!(
                "conversation.default_role '{}' is not a known persona",
                self.conversation.default_role
            ))
            .into());
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| VoxchatError::Config(format!("{} is not a valid URL: {}", field, e)).into())
}
