//! Conversation orchestrator
//!
//! Sits between inbound chat requests and the two outbound APIs: picks the
//! persona, assembles the prompt from the session history, calls the
//! completion provider, cleans up the reply, updates the bounded history
//! and, when asked, has the reply spoken.

use crate::config::{Config, ConversationConfig, SpeechConfig};
use crate::conversation::history::{truncate_front, History, SessionStore};
use crate::conversation::text::{ensure_introduction, strip_emphasis};
use crate::error::{Result, VoxchatError};
use crate::persona::{Persona, PersonaRegistry};
use crate::providers::{CompletionOptions, Message, Provider, Role};
use crate::speech::{synthesize_chunks, AudioClip, SpeechSynthesizer, VoiceSettings};
use std::sync::Arc;

/// Voice overrides carried by a chat request
#[derive(Debug, Clone, Default)]
pub struct VoiceOptions {
    /// Voice to use instead of the persona's
    pub voice_id: Option<String>,
    /// Settings to use instead of the configured defaults
    pub settings: Option<VoiceSettings>,
}

/// One inbound chat turn
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// User text
    pub message: String,
    /// Opaque session identifier
    pub session_id: String,
    /// Requested persona; absent or unknown falls back to the default
    pub role: Option<String>,
    /// Synthesize audio for the reply
    pub tts_enabled: bool,
    /// Voice overrides
    pub voice: VoiceOptions,
    /// Completion model override
    pub model: Option<String>,
}

/// Result of a chat turn
#[derive(Debug, Clone)]
pub struct ChatReply {
    /// Cleaned reply text
    pub text: String,
    /// Synthesized audio chunks in reply order; empty when not requested
    pub audio: Vec<AudioClip>,
    /// Display name of the persona that answered
    pub persona_name: String,
}

/// Result of session initialization
#[derive(Debug, Clone)]
pub struct Greeting {
    /// Cleaned greeting text
    pub text: String,
    /// Synthesized greeting audio; empty when voice is unavailable
    pub audio: Vec<AudioClip>,
    /// Display name of the persona
    pub persona_name: String,
}

/// Owns the session store and drives both outbound APIs
pub struct Orchestrator {
    provider: Arc<dyn Provider>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    personas: PersonaRegistry,
    sessions: SessionStore,
    conversation: ConversationConfig,
    speech: SpeechConfig,
}

impl Orchestrator {
    /// Creates an orchestrator from validated configuration
    ///
    /// `synthesizer` is `None` when the deployment has no voice output.
    pub fn new(
        config: &Config,
        provider: Arc<dyn Provider>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> Self {
        tracing::info!(
            provider = provider.name(),
            model = %provider.model(),
            history_cap = config.conversation.history_cap,
            voice = synthesizer.is_some(),
            "Conversation orchestrator ready"
        );

        Self {
            provider,
            synthesizer,
            personas: config.persona_registry(),
            sessions: SessionStore::new(config.conversation.history_cap),
            conversation: config.conversation.clone(),
            speech: config.speech.clone(),
        }
    }

    /// Starts (or restarts) a session with a persona greeting
    ///
    /// Any existing history for the session is discarded first. On success
    /// the history holds exactly the system prompt, the greeting request and
    /// the greeting. On failure the emptied session is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`VoxchatError::InvalidRole`] for an unknown role key, or the
    /// provider's error if the completion fails
    pub async fn initialize_session(&self, role_key: &str, session_id: &str) -> Result<Greeting> {
        let persona = self
            .personas
            .lookup(role_key)
            .ok_or_else(|| VoxchatError::InvalidRole(role_key.to_string()))?;

        let mut history = self.sessions.lock(session_id).await;
        history.clear();

        let text = match self.greet(&mut history, persona).await {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(session_id, role = role_key, "Greeting completion failed: {:#}", e);
                self.sessions.release_if_empty(session_id, history).await;
                return Err(e);
            }
        };
        drop(history);

        tracing::info!(session_id, role = role_key, "Session initialized");

        let audio = if self.speech.enabled {
            self.speak(&text, &persona.voice_id, &self.default_voice_settings())
                .await
        } else {
            Vec::new()
        };

        Ok(Greeting {
            text,
            audio,
            persona_name: persona.name.clone(),
        })
    }

    /// Runs one chat turn for a session
    ///
    /// An unknown session starts from an empty history and only exists once
    /// a turn succeeds. The session is held exclusively from reading its
    /// history until the new turns are stored, so concurrent turns for one
    /// session are applied one after another.
    ///
    /// # Errors
    ///
    /// Returns [`VoxchatError::MissingMessage`] for empty input,
    /// [`VoxchatError::OutOfRange`] for invalid voice settings,
    /// [`VoxchatError::RateLimited`] when the completion API throttles, or
    /// the provider's error otherwise. Speech failures never fail the turn.
    pub async fn send_message(&self, request: ChatRequest) -> Result<ChatReply> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(VoxchatError::MissingMessage.into());
        }

        let voice_settings = match request.voice.settings {
            Some(settings) => {
                settings.validate()?;
                settings
            }
            None => self.default_voice_settings(),
        };

        let persona = self.resolve_persona(request.role.as_deref())?;
        let session_id = request.session_id.as_str();

        let mut history = self.sessions.lock(session_id).await;
        let text = match self
            .reply(&mut history, persona, message, request.model.clone())
            .await
        {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(session_id, "Chat completion failed: {:#}", e);
                self.sessions.release_if_empty(session_id, history).await;
                return Err(e);
            }
        };
        let stored = history.len();
        drop(history);

        tracing::info!(session_id, role = %persona.key, stored, "Chat turn completed");

        let audio = if request.tts_enabled {
            let voice_id = request.voice.voice_id.as_deref().unwrap_or(&persona.voice_id);
            self.speak(&text, voice_id, &voice_settings).await
        } else {
            Vec::new()
        };

        Ok(ChatReply {
            text,
            audio,
            persona_name: persona.name.clone(),
        })
    }

    /// Forgets a session's history; returns whether it existed
    pub async fn clear_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).await;
        tracing::info!(session_id, removed, "Session history cleared");
        removed
    }

    /// Validates voice settings without storing them
    ///
    /// # Errors
    ///
    /// Returns [`VoxchatError::OutOfRange`] if either value is outside [0, 1]
    pub fn update_voice_settings(&self, stability: f64, similarity_boost: f64) -> Result<VoiceSettings> {
        let settings = VoiceSettings::new(stability, similarity_boost)?;
        tracing::debug!(stability, similarity_boost, "Voice settings accepted");
        Ok(settings)
    }

    /// Copy of a session's stored history
    pub async fn history(&self, session_id: &str) -> Option<Vec<Message>> {
        self.sessions.snapshot(session_id).await
    }

    /// Number of live sessions
    pub async fn session_count(&self) -> usize {
        self.sessions.len().await
    }

    /// The persona registry in use
    pub fn personas(&self) -> &PersonaRegistry {
        &self.personas
    }

    /// Whether a speech synthesizer is configured
    pub fn voice_available(&self) -> bool {
        self.synthesizer.is_some()
    }

    /// Replaces `history` with the greeting seed and the persona's greeting
    async fn greet(&self, history: &mut History, persona: &Persona) -> Result<String> {
        let seed = vec![
            Message::system(&persona.system_prompt),
            Message::user(&self.conversation.greeting_prompt),
        ];

        let response = self
            .provider
            .complete(&seed, &self.completion_options(None))
            .await?;

        let text = strip_emphasis(response.text());
        if text.is_empty() {
            return Err(VoxchatError::Provider("Completion returned an empty greeting".to_string()).into());
        }

        history.extend(seed);
        history.push(Message::assistant(&text));
        truncate_front(history, self.sessions.history_cap());
        Ok(text)
    }

    /// Completes one user turn against `history` and stores the new pair
    ///
    /// `history` is left untouched on error.
    async fn reply(
        &self,
        history: &mut History,
        persona: &Persona,
        message: &str,
        model: Option<String>,
    ) -> Result<String> {
        let first_turn = !history.iter().any(|m| m.role == Role::Assistant);

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(Message::system(&persona.system_prompt));
        messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
        messages.push(Message::user(message));

        tracing::debug!(
            role = %persona.key,
            prior_turns = history.len(),
            "Requesting completion"
        );

        let response = self
            .provider
            .complete(&messages, &self.completion_options(model))
            .await?;

        let mut text = strip_emphasis(response.text());
        if text.is_empty() {
            return Err(VoxchatError::Provider("Completion returned an empty reply".to_string()).into());
        }
        if first_turn {
            text = ensure_introduction(text, persona);
        }

        history.push(Message::user(message));
        history.push(Message::assistant(&text));
        truncate_front(history, self.sessions.history_cap());
        Ok(text)
    }

    fn resolve_persona(&self, role: Option<&str>) -> Result<&Persona> {
        self.personas
            .resolve_or_default(role, &self.conversation.default_role)
            .ok_or_else(|| {
                VoxchatError::Config(format!(
                    "Default persona '{}' is not registered",
                    self.conversation.default_role
                ))
                .into()
            })
    }

    fn completion_options(&self, model: Option<String>) -> CompletionOptions {
        CompletionOptions {
            model,
            temperature: self.conversation.temperature,
            max_tokens: self.conversation.max_tokens,
        }
    }

    fn default_voice_settings(&self) -> VoiceSettings {
        VoiceSettings {
            stability: self.speech.stability,
            similarity_boost: self.speech.similarity_boost,
        }
    }

    async fn speak(&self, text: &str, voice_id: &str, settings: &VoiceSettings) -> Vec<AudioClip> {
        match &self.synthesizer {
            Some(synthesizer) => {
                synthesize_chunks(
                    synthesizer.as_ref(),
                    text,
                    voice_id,
                    settings,
                    self.speech.chunk_words,
                )
                .await
            }
            None => {
                tracing::debug!("Voice requested but no synthesizer is configured");
                Vec::new()
            }
        }
    }
}
