//! Error types for VoxChat
//!
//! This module defines all error types used throughout the server,
//! using `thiserror` for ergonomic error handling. The HTTP layer maps
//! these variants onto status codes.

use thiserror::Error;

/// Main error type for VoxChat operations
///
/// Covers client input problems, upstream completion and speech API
/// failures, and the ambient configuration and I/O errors.
#[derive(Error, Debug)]
pub enum VoxchatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Role key does not resolve in the persona registry
    #[error("Invalid role: {0}")]
    InvalidRole(String),

    /// Chat message was empty or missing
    #[error("Message is required")]
    MissingMessage,

    /// A numeric setting fell outside its allowed range
    #[error("{field} must be between 0 and 1, got {value}")]
    OutOfRange {
        /// Name of the offending field
        field: String,
        /// The rejected value
        value: f64,
    },

    /// Malformed or incomplete request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Uploaded payload exceeded the configured limit
    #[error("Payload too large: limit is {limit} bytes")]
    PayloadTooLarge {
        /// Maximum accepted size in bytes
        limit: usize,
    },

    /// Completion API signalled quota exhaustion or rate limiting
    #[error("Rate limited by completion API (retry after {retry_after_secs}s): {message}")]
    RateLimited {
        /// Suggested backoff interval in seconds
        retry_after_secs: u64,
        /// Upstream message
        message: String,
    },

    /// Completion provider errors (API calls, bad responses)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Speech synthesis errors
    #[error("Speech synthesis error: {0}")]
    Speech(String),

    /// Missing credentials for an upstream API
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl VoxchatError {
    /// Stable machine-readable code used in HTTP error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::InvalidRole(_) => "InvalidRole",
            Self::MissingMessage => "MissingMessage",
            Self::OutOfRange { .. } => "OutOfRange",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::PayloadTooLarge { .. } => "PayloadTooLarge",
            Self::RateLimited { .. } => "RateLimited",
            Self::Provider(_) => "UpstreamUnavailable",
            Self::Speech(_) => "SpeechUnavailable",
            Self::MissingCredentials(_) => "MissingCredentials",
            Self::Io(_) | Self::Serialization(_) | Self::Yaml(_) | Self::Http(_) => {
                "ProcessingError"
            }
        }
    }

    /// Whether the error was caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidRole(_)
                | Self::MissingMessage
                | Self::OutOfRange { .. }
                | Self::InvalidRequest(_)
                | Self::PayloadTooLarge { .. }
        )
    }
}

/// Result type alias for VoxChat operations
///
/// Uses `anyhow::Error` so callers can attach context; typed
/// `VoxchatError` values are recovered with `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
