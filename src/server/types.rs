//! Wire types for the HTTP API
//!
//! Field names are camelCase on the wire, except inside voice settings which
//! keep `stability` and `similarity_boost`.

use crate::speech::{AudioClip, VoiceSettings};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session used when a request omits `sessionId`
pub const DEFAULT_SESSION_ID: &str = "default";

/// Text returned by `/transcribe`
pub const TRANSCRIPTION_PLACEHOLDER: &str =
    "Speech transcription is not available yet. Please type your message instead.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitRequest {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    pub message: String,
    pub persona: String,
    pub audio_chunks: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub selected_role: Option<String>,
    #[serde(default)]
    pub tts_enabled: bool,
    #[serde(default)]
    pub voice_settings: Option<VoiceSettings>,
    #[serde(default)]
    pub voice_id: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub text: String,
    pub persona: String,
    pub audio_chunks: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct VoiceSettingsResponse {
    pub status: &'static str,
    pub settings: VoiceSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearHistoryRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub sessions: usize,
}

/// Session identifier from a request, falling back to [`DEFAULT_SESSION_ID`]
pub fn session_or_default(session_id: Option<String>) -> String {
    session_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION_ID.to_string())
}

/// Base64-encodes audio clips in chunk order
pub fn encode_audio(clips: &[AudioClip]) -> Vec<String> {
    clips.iter().map(|clip| STANDARD.encode(&clip.data)).collect()
}
