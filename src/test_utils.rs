//! Test utilities for VoxChat
//!
//! Scripted stand-ins for the completion provider and the speech
//! synthesizer so orchestrator and server logic can be tested without
//! network access.

use crate::error::{Result, VoxchatError};
use crate::providers::{CompletionOptions, CompletionResponse, Message, Provider};
use crate::speech::{SpeechSynthesizer, VoiceSettings};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One scripted provider outcome
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Successful completion with this text
    Text(String),
    /// Upstream rate limit with this backoff
    RateLimited(u64),
    /// Generic upstream failure
    Failure(String),
}

/// Completion provider returning scripted replies
///
/// Replies queued with [`FakeProvider::push`] are consumed first; once the
/// queue is empty the default reply is returned. Every request's messages
/// are recorded for inspection.
pub struct FakeProvider {
    default_reply: String,
    queue: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<(Vec<Message>, CompletionOptions)>>,
    delay: Option<Duration>,
}

impl FakeProvider {
    /// Creates a provider that always answers `default_reply`
    pub fn new(default_reply: impl Into<String>) -> Self {
        Self {
            default_reply: default_reply.into(),
            queue: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleeps before answering, to widen race windows in concurrency tests
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queues a scripted outcome
    pub fn push(&self, reply: ScriptedReply) {
        self.queue.lock().expect("queue lock").push_back(reply);
    }

    /// Messages and options of every request received so far
    pub fn requests(&self) -> Vec<(Vec<Message>, CompletionOptions)> {
        self.requests.lock().expect("requests lock").clone()
    }

    /// Number of completion calls received
    pub fn call_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<CompletionResponse> {
        self.requests
            .lock()
            .expect("requests lock")
            .push((messages.to_vec(), options.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.queue.lock().expect("queue lock").pop_front();
        match next.unwrap_or_else(|| ScriptedReply::Text(self.default_reply.clone())) {
            ScriptedReply::Text(text) => Ok(CompletionResponse::new(Message::assistant(text))),
            ScriptedReply::RateLimited(secs) => Err(VoxchatError::RateLimited {
                retry_after_secs: secs,
                message: "rate_limit_exceeded".to_string(),
            }
            .into()),
            ScriptedReply::Failure(msg) => Err(VoxchatError::Provider(msg).into()),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> String {
        "fake-model".to_string()
    }
}

/// Speech synthesizer that echoes the chunk text as audio bytes
pub struct FakeSynthesizer {
    calls: AtomicUsize,
    texts: Mutex<Vec<String>>,
    voices: Mutex<Vec<String>>,
    fail_on: Option<String>,
}

impl FakeSynthesizer {
    /// Creates a synthesizer that always succeeds
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            texts: Mutex::new(Vec::new()),
            voices: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    /// Creates a synthesizer failing on chunks that contain `needle`
    pub fn failing_on(needle: impl Into<String>) -> Self {
        Self {
            fail_on: Some(needle.into()),
            ..Self::new()
        }
    }

    /// Number of synthesis calls received
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Texts of every synthesis call, in call order
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().expect("texts lock").clone()
    }

    /// Voice identifiers of every synthesis call, in call order
    pub fn voices(&self) -> Vec<String> {
        self.voices.lock().expect("voices lock").clone()
    }
}

impl Default for FakeSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        _settings: &VoiceSettings,
    ) -> Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.texts.lock().expect("texts lock").push(text.to_string());
        self.voices
            .lock()
            .expect("voices lock")
            .push(voice_id.to_string());

        if let Some(needle) = &self.fail_on {
            if text.split_whitespace().any(|w| w == needle) {
                return Err(VoxchatError::Speech("scripted failure".to_string()).into());
            }
        }
        Ok(Bytes::from(text.to_string()))
    }
}

/// Builds a reply of `n` words: `w1 w2 ... wn`
pub fn words(n: usize) -> String {
    (1..=n)
        .map(|i| format!("w{}", i))
        .collect::<Vec<_>>()
        .join(" ")
}
