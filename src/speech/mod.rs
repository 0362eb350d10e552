//! Speech synthesis for VoxChat
//!
//! Replies are split into fixed-size word chunks and every chunk is sent to
//! the synthesizer concurrently. The resulting clips are returned in the
//! original chunk order; a chunk that fails is logged and left out so the
//! text reply is never lost to a voice failure.

pub mod elevenlabs;

pub use elevenlabs::ElevenLabsSynthesizer;

use crate::config::SpeechConfig;
use crate::error::{Result, VoxchatError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Voice tuning parameters, each in the closed range [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    /// Voice stability
    pub stability: f64,
    /// Similarity boost toward the original voice
    pub similarity_boost: f64,
}

impl VoiceSettings {
    /// Creates validated voice settings
    ///
    /// # Errors
    ///
    /// Returns [`VoxchatError::OutOfRange`] if either value is below 0 or
    /// above 1 (NaN is rejected too)
    ///
    /// # Examples
    ///
    /// ```
    /// use voxchat::speech::VoiceSettings;
    ///
    /// assert!(VoiceSettings::new(0.0, 1.0).is_ok());
    /// assert!(VoiceSettings::new(1.01, 0.5).is_err());
    /// ```
    pub fn new(stability: f64, similarity_boost: f64) -> Result<Self> {
        let settings = Self {
            stability,
            similarity_boost,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Checks both values lie in [0, 1]
    pub fn validate(&self) -> Result<()> {
        check_unit_range("stability", self.stability)?;
        check_unit_range("similarity_boost", self.similarity_boost)?;
        Ok(())
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

fn check_unit_range(field: &str, value: f64) -> Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(VoxchatError::OutOfRange {
            field: field.to_string(),
            value,
        }
        .into())
    }
}

/// One synthesized audio chunk
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Position of the chunk within the reply
    pub index: usize,
    /// Encoded audio
    pub data: Bytes,
    /// MIME type of `data`
    pub content_type: String,
}

/// Text-to-speech backend
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` with the given voice
    ///
    /// # Errors
    ///
    /// Returns [`VoxchatError::Speech`] if the API call fails
    async fn synthesize(&self, text: &str, voice_id: &str, settings: &VoiceSettings)
        -> Result<Bytes>;

    /// MIME type of the audio this backend produces
    fn content_type(&self) -> &str {
        "audio/mpeg"
    }
}

/// Splits text into chunks of at most `words_per_chunk` words
///
/// Words are separated by any whitespace and re-joined with single spaces.
/// Empty text yields no chunks.
///
/// # Examples
///
/// ```
/// use voxchat::speech::chunk_words;
///
/// let chunks = chunk_words("one two three four five", 2);
/// assert_eq!(chunks, vec!["one two", "three four", "five"]);
/// ```
pub fn chunk_words(text: &str, words_per_chunk: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(words_per_chunk.max(1))
        .map(|chunk| chunk.join(" "))
        .collect()
}

/// Synthesizes `text` chunk by chunk, all chunks in flight at once
///
/// Every chunk future is joined before returning. Failed chunks are logged
/// and omitted; the remaining clips keep their original order.
pub async fn synthesize_chunks(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    voice_id: &str,
    settings: &VoiceSettings,
    words_per_chunk: usize,
) -> Vec<AudioClip> {
    let chunks = chunk_words(text, words_per_chunk);
    let total = chunks.len();

    let results = join_all(chunks.iter().map(|chunk| async move {
        synthesizer.synthesize(chunk, voice_id, settings).await
    }))
    .await;

    let clips: Vec<AudioClip> = results
        .into_iter()
        .enumerate()
        .filter_map(|(index, result)| match result {
            Ok(data) => Some(AudioClip {
                index,
                data,
                content_type: synthesizer.content_type().to_string(),
            }),
            Err(e) => {
                tracing::warn!(chunk = index, total, "Speech synthesis failed: {:#}", e);
                None
            }
        })
        .collect();

    tracing::debug!(
        requested = total,
        synthesized = clips.len(),
        voice_id,
        "Speech synthesis finished"
    );

    clips
}

/// Create the speech synthesizer from configuration
///
/// Returns `Ok(None)` when no API key is configured, which disables voice
/// output for the deployment.
pub fn create_synthesizer(config: &SpeechConfig) -> Result<Option<Arc<dyn SpeechSynthesizer>>> {
    match config.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
        Some(_) => Ok(Some(Arc::new(ElevenLabsSynthesizer::new(config.clone())?))),
        None => {
            tracing::warn!("No speech API key configured; voice output disabled");
            Ok(None)
        }
    }
}
