mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use tower::ServiceExt;

use common::{body_json, json_request, test_app, words, EchoSynthesizer, StubProvider};
use voxchat::config::Config;
use voxchat::server::types::TRANSCRIPTION_PLACEHOLDER;

fn multipart_request(field: &str, filename: Option<&str>, data: &[u8]) -> Request<Body> {
    let boundary = "voxchat-test-boundary";
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"{}\"; filename=\"{}\"", field, name),
        None => format!("form-data; name=\"{}\"", field),
    };
    let mut body = format!(
        "--{b}\r\nContent-Disposition: {d}\r\nContent-Type: audio/webm\r\n\r\n",
        b = boundary,
        d = disposition
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/transcribe")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_init_doctor_creates_three_entry_session() {
    let config = Config::default();
    let synth = Arc::new(EchoSynthesizer::default());
    let (app, orchestrator) = test_app(
        &config,
        Arc::new(StubProvider::replying("**Hello**, I'm Dr. Sarah Chen.")),
        Some(synth.clone()),
    );

    let response = app
        .oneshot(json_request(
            "/init",
            json!({"role": "doctor", "sessionId": "s1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["persona"], "Dr. Sarah Chen");
    assert_eq!(body["message"], "Hello, I'm Dr. Sarah Chen.");
    assert_eq!(body["audioChunks"].as_array().unwrap().len(), 1);
    assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.history("s1").await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_init_unknown_role_is_rejected() {
    let config = Config::default();
    let (app, orchestrator) = test_app(&config, Arc::new(StubProvider::replying("Hi")), None);

    let response = app
        .oneshot(json_request(
            "/init",
            json!({"role": "astronaut", "sessionId": "s1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "InvalidRole");
    assert!(orchestrator.history("s1").await.is_none());
}

#[tokio::test]
async fn test_chat_empty_message_is_rejected() {
    let config = Config::default();
    let provider = Arc::new(StubProvider::replying("Hi"));
    let (app, _) = test_app(&config, provider.clone(), None);

    let response = app
        .oneshot(json_request("/chat", json!({"message": "", "sessionId": "s1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "MissingMessage");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_sequential_chats_append_two_entries_each() {
    let config = Config::default();
    let (app, orchestrator) = test_app(
        &config,
        Arc::new(StubProvider::replying("Dr. Sarah Chen here, go on.")),
        None,
    );

    app.clone()
        .oneshot(json_request("/init", json!({"role": "doctor", "sessionId": "s1"})))
        .await
        .unwrap();

    for expected in [5, 7] {
        let response = app
            .clone()
            .oneshot(json_request(
                "/chat",
                json!({"message": "I have a cough", "sessionId": "s1", "selectedRole": "doctor"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["text"], "Dr. Sarah Chen here, go on.");
        assert_eq!(body["audioChunks"], json!([]));
        assert_eq!(orchestrator.history("s1").await.unwrap().len(), expected);
    }
}

#[tokio::test]
async fn test_chat_history_stays_bounded() {
    let mut config = Config::default();
    config.conversation.history_cap = 4;
    let (app, orchestrator) = test_app(
        &config,
        Arc::new(StubProvider::replying("Emma Walsh: noted.")),
        None,
    );

    for i in 0..6 {
        app.clone()
            .oneshot(json_request(
                "/chat",
                json!({"message": format!("note {}", i), "sessionId": "s1"}),
            ))
            .await
            .unwrap();
    }

    let history = orchestrator.history("s1").await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2].content, "note 5");
}

#[tokio::test]
async fn test_chat_defaults_session_and_falls_back_to_default_persona() {
    let config = Config::default();
    let (app, orchestrator) = test_app(&config, Arc::new(StubProvider::replying("Sure.")), None);

    let response = app
        .oneshot(json_request(
            "/chat",
            json!({"message": "Hi", "selectedRole": "astronaut"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["persona"], "Emma Walsh");
    assert_eq!(body["text"], "Hello, I'm Emma Walsh, your personal tutor. Sure.");
    assert!(orchestrator.history("default").await.is_some());
}

#[tokio::test]
async fn test_chat_with_tts_returns_ordered_base64_chunks() {
    let config = Config::default();
    let synth = Arc::new(EchoSynthesizer::default());
    let (app, _) = test_app(
        &config,
        Arc::new(StubProvider::replying(&format!("Emma Walsh says {}", words(117)))),
        Some(synth.clone()),
    );

    let response = app
        .oneshot(json_request(
            "/chat",
            json!({
                "message": "Read me something",
                "sessionId": "s1",
                "ttsEnabled": true,
                "voiceSettings": {"stability": 0.2, "similarity_boost": 0.9}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let chunks: Vec<String> = body["audioChunks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| String::from_utf8(STANDARD.decode(c.as_str().unwrap()).unwrap()).unwrap())
        .collect();

    assert_eq!(synth.calls.load(Ordering::SeqCst), 3);
    let counts: Vec<usize> = chunks.iter().map(|c| c.split_whitespace().count()).collect();
    assert_eq!(counts, vec![50, 50, 20]);
    assert!(chunks[0].starts_with("Emma Walsh says w1"));
    assert!(chunks[2].ends_with("w117"));
}

#[tokio::test]
async fn test_chat_invalid_voice_settings_rejected() {
    let config = Config::default();
    let (app, _) = test_app(&config, Arc::new(StubProvider::replying("Hi")), None);

    let response = app
        .oneshot(json_request(
            "/chat",
            json!({
                "message": "Hi",
                "ttsEnabled": true,
                "voiceSettings": {"stability": 0.5, "similarity_boost": 1.5}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "OutOfRange");
}

#[tokio::test]
async fn test_chat_rate_limit_returns_429_with_retry_after() {
    let config = Config::default();
    let (app, _) = test_app(&config, Arc::new(StubProvider::rate_limited(30)), None);

    let response = app
        .oneshot(json_request("/chat", json!({"message": "Hi", "sessionId": "s1"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()[header::RETRY_AFTER], "30");
    let body = body_json(response).await;
    assert_eq!(body["code"], "RateLimited");
    assert_eq!(body["retryAfter"], 30);
}

#[tokio::test]
async fn test_upstream_failure_hides_details_in_production() {
    let mut config = Config::default();
    config.server.environment = "production".to_string();
    // An empty completion is reported as an upstream failure
    let (app, _) = test_app(&config, Arc::new(StubProvider::replying("***")), None);

    let response = app
        .oneshot(json_request("/chat", json!({"message": "Hi"})))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["code"], "UpstreamUnavailable");
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn test_upstream_failure_includes_details_in_development() {
    let config = Config::default();
    let (app, _) = test_app(&config, Arc::new(StubProvider::replying("***")), None);

    let response = app
        .oneshot(json_request("/chat", json!({"message": "Hi"})))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert!(body["details"].as_str().unwrap().contains("empty reply"));
}

#[tokio::test]
async fn test_malformed_json_is_invalid_request() {
    let config = Config::default();
    let (app, _) = test_app(&config, Arc::new(StubProvider::replying("Hi")), None);

    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "InvalidRequest");
}

#[tokio::test]
async fn test_voice_settings_endpoint() {
    let config = Config::default();
    let (app, _) = test_app(&config, Arc::new(StubProvider::replying("Hi")), None);

    let ok = app
        .clone()
        .oneshot(json_request(
            "/voice-settings",
            json!({"stability": 0.0, "similarity_boost": 1.0}),
        ))
        .await
        .unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let body = body_json(ok).await;
    assert_eq!(body["status"], "updated");
    assert_eq!(body["settings"]["similarity_boost"], 1.0);

    let bad = app
        .oneshot(json_request(
            "/voice-settings",
            json!({"stability": -0.1, "similarity_boost": 0.5}),
        ))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(bad).await["code"], "OutOfRange");
}

#[tokio::test]
async fn test_clear_history_always_succeeds() {
    let config = Config::default();
    let (app, orchestrator) = test_app(&config, Arc::new(StubProvider::replying("Hi")), None);

    let missing = app
        .clone()
        .oneshot(json_request("/clear-history", json!({"sessionId": "nobody"})))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::OK);
    assert_eq!(body_json(missing).await["status"], "cleared");
    assert!(orchestrator.history("nobody").await.is_none());

    app.clone()
        .oneshot(json_request("/init", json!({"role": "tax", "sessionId": "s1"})))
        .await
        .unwrap();
    assert!(orchestrator.history("s1").await.is_some());

    let cleared = app
        .oneshot(json_request("/clear-history", json!({"sessionId": "s1"})))
        .await
        .unwrap();
    assert_eq!(cleared.status(), StatusCode::OK);
    assert!(orchestrator.history("s1").await.is_none());
}

#[tokio::test]
async fn test_transcribe_returns_placeholder() {
    let config = Config::default();
    let (app, _) = test_app(&config, Arc::new(StubProvider::replying("Hi")), None);

    let response = app
        .oneshot(multipart_request("audio", Some("clip.webm"), b"fake audio"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["text"], TRANSCRIPTION_PLACEHOLDER);
}

#[tokio::test]
async fn test_transcribe_without_file_is_rejected() {
    let config = Config::default();
    let (app, _) = test_app(&config, Arc::new(StubProvider::replying("Hi")), None);

    let response = app
        .oneshot(multipart_request("note", None, b"just text"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_transcribe_rejects_oversized_upload() {
    let mut config = Config::default();
    config.server.max_upload_bytes = 16;
    let (app, _) = test_app(&config, Arc::new(StubProvider::replying("Hi")), None);

    let response = app
        .oneshot(multipart_request("audio", Some("clip.webm"), &[0u8; 64]))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["code"], "PayloadTooLarge");
}

#[tokio::test]
async fn test_health_reports_sessions() {
    let config = Config::default();
    let (app, _) = test_app(&config, Arc::new(StubProvider::replying("Hi")), None);

    app.clone()
        .oneshot(json_request("/init", json!({"role": "writer", "sessionId": "a"})))
        .await
        .unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"], 1);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_failed_chat_is_not_counted_as_session() {
    let config = Config::default();
    let (app, orchestrator) = test_app(&config, Arc::new(StubProvider::rate_limited(3)), None);

    let response = app
        .clone()
        .oneshot(json_request("/chat", json!({"message": "Hi", "sessionId": "ghost"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(orchestrator.history("ghost").await.is_none());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(response).await["sessions"], 0);
}

#[tokio::test]
async fn test_static_files_served_when_configured() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(dir.path().join("index.html"), "<h1>VoxChat</h1>").unwrap();

    let mut config = Config::default();
    config.server.static_dir = Some(dir.path().to_path_buf());
    let (app, _) = test_app(&config, Arc::new(StubProvider::replying("Hi")), None);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/index.html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<h1>VoxChat</h1>");
}
