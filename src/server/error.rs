//! HTTP error responses
//!
//! Every failure leaving a handler goes through [`ApiError`], which maps the
//! underlying [`VoxchatError`] onto a status code and a JSON body of the form
//! `{ "error", "code", "retryAfter"?, "details"? }`.

use crate::error::VoxchatError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// JSON body returned for every failed request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Handler error carrying the cause and whether internals may be shown
#[derive(Debug)]
pub struct ApiError {
    error: anyhow::Error,
    expose_details: bool,
}

impl ApiError {
    pub fn new(error: anyhow::Error, expose_details: bool) -> Self {
        Self {
            error,
            expose_details,
        }
    }

    /// Status code, public message, code and backoff for the error
    fn classify(&self) -> (StatusCode, String, &'static str, Option<u64>) {
        match self.error.downcast_ref::<VoxchatError>() {
            Some(e @ VoxchatError::PayloadTooLarge { .. }) => {
                (StatusCode::PAYLOAD_TOO_LARGE, e.to_string(), e.code(), None)
            }
            Some(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string(), e.code(), None),
            Some(VoxchatError::RateLimited {
                retry_after_secs, ..
            }) => (
                StatusCode::TOO_MANY_REQUESTS,
                "The assistant is receiving too many requests, please retry later".to_string(),
                "RateLimited",
                Some(*retry_after_secs),
            ),
            Some(e @ VoxchatError::Provider(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "The assistant is temporarily unavailable".to_string(),
                e.code(),
                None,
            ),
            Some(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process request".to_string(),
                e.code(),
                None,
            ),
            None => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process request".to_string(),
                "ProcessingError",
                None,
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, code, retry_after) = self.classify();

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), code, "Request failed: {:#}", self.error);
        } else {
            tracing::warn!(status = status.as_u16(), code, "Request rejected: {}", self.error);
        }

        // Input errors already describe themselves
        let input_error = matches!(status, StatusCode::BAD_REQUEST | StatusCode::PAYLOAD_TOO_LARGE);
        let details = (self.expose_details && !input_error).then(|| format!("{:#}", self.error));

        let body = ErrorBody {
            error: message,
            code,
            retry_after,
            details,
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
