use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request};
use axum::Router;
use bytes::Bytes;
use tempfile::TempDir;

use voxchat::config::Config;
use voxchat::providers::{CompletionOptions, CompletionResponse, Message, Provider};
use voxchat::server::{router, AppState};
use voxchat::speech::{SpeechSynthesizer, VoiceSettings};
use voxchat::{Orchestrator, VoxchatError};

/// Provider answering with a fixed reply, or a rate limit when told to
#[allow(dead_code)]
pub struct StubProvider {
    pub reply: String,
    pub rate_limit_secs: Option<u64>,
    pub calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubProvider {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            rate_limit_secs: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn rate_limited(secs: u64) -> Self {
        Self {
            rate_limit_secs: Some(secs),
            ..Self::replying("")
        }
    }
}

#[async_trait]
impl Provider for StubProvider {
    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> anyhow::Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(secs) = self.rate_limit_secs {
            return Err(VoxchatError::RateLimited {
                retry_after_secs: secs,
                message: "rate_limit_exceeded: slow down".to_string(),
            }
            .into());
        }
        Ok(CompletionResponse::new(Message::assistant(&self.reply)))
    }

    fn name(&self) -> &str {
        "stub"
    }

    fn model(&self) -> String {
        "stub-model".to_string()
    }
}

/// Synthesizer returning the chunk text as audio bytes
#[allow(dead_code)]
#[derive(Default)]
pub struct EchoSynthesizer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SpeechSynthesizer for EchoSynthesizer {
    async fn synthesize(
        &self,
        text: &str,
        _voice_id: &str,
        _settings: &VoiceSettings,
    ) -> anyhow::Result<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::from(text.to_string()))
    }
}

/// Router wired to the given stubs, plus the orchestrator for inspection
#[allow(dead_code)]
pub fn test_app(
    config: &Config,
    provider: Arc<dyn Provider>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
) -> (Router, Arc<Orchestrator>) {
    let orchestrator = Arc::new(Orchestrator::new(config, provider, synthesizer));
    let state = AppState::new(orchestrator.clone(), &config.server);
    (router(state, &config.server), orchestrator)
}

#[allow(dead_code)]
pub fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("failed to build request")
}

#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read body");
    serde_json::from_slice(&bytes).expect("body is not JSON")
}

#[allow(dead_code)]
pub fn words(n: usize) -> String {
    (1..=n)
        .map(|i| format!("w{}", i))
        .collect::<Vec<_>>()
        .join(" ")
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
