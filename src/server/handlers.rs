//! Route handlers

use crate::conversation::{ChatRequest, VoiceOptions};
use crate::error::{Result, VoxchatError};
use crate::server::error::ApiError;
use crate::server::types::{
    encode_audio, session_or_default, ChatRequestBody, ChatResponse, ClearHistoryRequest,
    HealthResponse, InitRequest, InitResponse, StatusResponse, TranscribeResponse,
    VoiceSettingsResponse, TRANSCRIPTION_PLACEHOLDER,
};
use crate::server::AppState;
use crate::speech::VoiceSettings;

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Unwraps a JSON body, turning extractor rejections into `InvalidRequest`
fn parse_body<T>(payload: std::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| VoxchatError::InvalidRequest(rejection.body_text()).into())
}

/// `POST /init`: start a session with a persona greeting
pub async fn init(
    State(state): State<AppState>,
    payload: std::result::Result<Json<InitRequest>, JsonRejection>,
) -> ApiResult<InitResponse> {
    let body = parse_body(payload).map_err(|e| state.reject(e))?;
    let role = body
        .role
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| state.reject(VoxchatError::InvalidRequest("role is required".to_string())))?;
    let session_id = session_or_default(body.session_id);

    let greeting = state
        .orchestrator
        .initialize_session(&role, &session_id)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(InitResponse {
        message: greeting.text,
        persona: greeting.persona_name,
        audio_chunks: encode_audio(&greeting.audio),
    }))
}

/// `POST /chat`: run one conversation turn
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequestBody>, JsonRejection>,
) -> ApiResult<ChatResponse> {
    let body = parse_body(payload).map_err(|e| state.reject(e))?;

    let request = ChatRequest {
        message: body.message.unwrap_or_default(),
        session_id: session_or_default(body.session_id),
        role: body.selected_role,
        tts_enabled: body.tts_enabled,
        voice: VoiceOptions {
            voice_id: body.voice_id.filter(|v| !v.trim().is_empty()),
            settings: body.voice_settings,
        },
        model: body.model.filter(|m| !m.trim().is_empty()),
    };

    let reply = state
        .orchestrator
        .send_message(request)
        .await
        .map_err(|e| state.reject(e))?;

    Ok(Json(ChatResponse {
        text: reply.text,
        persona: reply.persona_name,
        audio_chunks: encode_audio(&reply.audio),
    }))
}

/// `POST /voice-settings`: validate and acknowledge voice settings
pub async fn voice_settings(
    State(state): State<AppState>,
    payload: std::result::Result<Json<VoiceSettings>, JsonRejection>,
) -> ApiResult<VoiceSettingsResponse> {
    let body = parse_body(payload).map_err(|e| state.reject(e))?;
    let settings = state
        .orchestrator
        .update_voice_settings(body.stability, body.similarity_boost)
        .map_err(|e| state.reject(e))?;

    Ok(Json(VoiceSettingsResponse {
        status: "updated",
        settings,
    }))
}

/// `POST /clear-history`: forget a session; always succeeds
pub async fn clear_history(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ClearHistoryRequest>, JsonRejection>,
) -> Json<StatusResponse> {
    let body = payload.map(|Json(body)| body).unwrap_or_default();
    state
        .orchestrator
        .clear_session(&session_or_default(body.session_id))
        .await;
    Json(StatusResponse { status: "cleared" })
}

/// `POST /transcribe`: accept an audio upload and return placeholder text
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> ApiResult<TranscribeResponse> {
    let mut multipart = multipart
        .map_err(|rejection| state.reject(VoxchatError::InvalidRequest(rejection.body_text())))?;

    let size = read_upload(&mut multipart, state.max_upload_bytes)
        .await
        .map_err(|e| state.reject(e))?;

    tracing::info!(bytes = size, "Audio upload received; transcription is not performed");

    Ok(Json(TranscribeResponse {
        text: TRANSCRIPTION_PLACEHOLDER,
    }))
}

/// Reads the first file field and returns its size
async fn read_upload(multipart: &mut Multipart, limit: usize) -> Result<usize> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.file_name().is_none() {
            continue;
        }
        let data = field.bytes().await.map_err(|e| multipart_error(e, limit))?;
        if data.len() > limit {
            return Err(VoxchatError::PayloadTooLarge { limit }.into());
        }
        return Ok(data.len());
    }

    Err(VoxchatError::InvalidRequest("No audio file uploaded".to_string()).into())
}

fn multipart_error(err: MultipartError, limit: usize) -> anyhow::Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        VoxchatError::PayloadTooLarge { limit }.into()
    } else {
        VoxchatError::InvalidRequest(err.body_text()).into()
    }
}

/// `GET /health`: liveness check
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: chrono::Utc::now(),
        sessions: state.orchestrator.session_count().await,
    })
}
