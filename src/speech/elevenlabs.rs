//! ElevenLabs text-to-speech client

use crate::config::SpeechConfig;
use crate::error::{Result, VoxchatError};
use crate::speech::{SpeechSynthesizer, VoiceSettings};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

/// Synthesizer backed by the ElevenLabs `text-to-speech` endpoint
pub struct ElevenLabsSynthesizer {
    client: Client,
    config: SpeechConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: &'a VoiceSettings,
}

impl ElevenLabsSynthesizer {
    /// Create a new synthesizer
    ///
    /// # Errors
    ///
    /// Returns error if no API key is configured or the HTTP client cannot
    /// be built
    pub fn new(config: SpeechConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| VoxchatError::MissingCredentials("elevenlabs".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("voxchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VoxchatError::Speech(format!("Failed to create HTTP client: {}", e)))?;

        tracing::info!(
            "Initialized ElevenLabs synthesizer: api_base={}, model={}",
            config.api_base,
            config.model_id
        );

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    fn endpoint(&self, voice_id: &str) -> String {
        format!(
            "{}/v1/text-to-speech/{}",
            self.config.api_base.trim_end_matches('/'),
            voice_id
        )
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
    ) -> Result<Bytes> {
        let request = SynthesisRequest {
            text,
            model_id: &self.config.model_id,
            voice_settings: settings,
        };

        let response = self
            .client
            .post(self.endpoint(voice_id))
            .header("xi-api-key", &self.api_key)
            .header(ACCEPT, self.content_type())
            .json(&request)
            .send()
            .await
            .map_err(|e| VoxchatError::Speech(format!("ElevenLabs request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VoxchatError::Speech(format!(
                "ElevenLabs returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| VoxchatError::Speech(format!("Failed to read audio body: {}", e)))?;

        tracing::debug!(bytes = audio.len(), voice_id, "Synthesized speech chunk");
        Ok(audio)
    }
}
