//! Rate-limited relay to the generative-language API.
//!
//! Flow Overview:
//! 1) Authenticate, validate the prompt and load the stored API key (412 if none).
//! 2) Count the call against the user's hourly quota (429 once exhausted).
//! 3) Decrypt the stored key and relay the prompt upstream.
//!
//! Every response past step 2 carries the `x-ratelimit-*` headers.

use super::{principal::require_auth, settings::codec_error_response};
use crate::{
    ai::AiError,
    api::AppState,
    rate_limit::RateLimitResult,
};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header::RETRY_AFTER},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};
use utoipa::ToSchema;

pub const MAX_PROMPT_CHARS: usize = 8_000;

pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct GenerateRequest {
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenerateResponse {
    pub text: String,
}

fn rate_limit_headers(result: &RateLimitResult) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(result.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(result.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(result.reset_time.timestamp()));
    headers
}

#[utoipa::path(
    post,
    path = "/v1/ai/generate",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Generated text.", body = GenerateResponse),
        (status = 400, description = "Empty or oversized prompt."),
        (status = 401, description = "Missing authenticated user."),
        (status = 409, description = "Stored API key can no longer be decrypted."),
        (status = 412, description = "No API key configured."),
        (status = 429, description = "Hourly quota exhausted."),
        (status = 502, description = "Upstream AI service failed."),
    ),
    tag = "ai"
)]
pub async fn generate(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Json(payload): Json<GenerateRequest>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let prompt = payload.prompt.trim();
    if prompt.is_empty() {
        return (StatusCode::BAD_REQUEST, "Prompt must not be empty.").into_response();
    }
    if prompt.chars().count() > MAX_PROMPT_CHARS {
        return (
            StatusCode::BAD_REQUEST,
            format!("Prompt must be at most {MAX_PROMPT_CHARS} characters."),
        )
            .into_response();
    }

    // Users without a key are turned away before they spend quota.
    let encrypted = match state.store().get(&principal.user_id).await {
        Ok(Some(encrypted)) => encrypted,
        Ok(None) => {
            return (StatusCode::PRECONDITION_FAILED, "No API key configured.").into_response();
        }
        Err(err) => {
            error!("Failed to load API key: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let quota = state
        .limiter()
        .check(&principal.user_id, state.ai_hourly_limit());
    let mut response_headers = rate_limit_headers(&quota);

    if !quota.allowed {
        debug!(user_id = %principal.user_id, "AI quota exhausted");
        response_headers.insert(
            RETRY_AFTER,
            HeaderValue::from(quota.retry_after_seconds(Utc::now())),
        );
        return (
            StatusCode::TOO_MANY_REQUESTS,
            response_headers,
            "Hourly AI request limit reached. Try again later.",
        )
            .into_response();
    }

    let api_key = match state.codec().decrypt(&encrypted) {
        Ok(api_key) => api_key,
        Err(err) => {
            return (response_headers, codec_error_response(&principal.user_id, &err))
                .into_response();
        }
    };

    match state.ai().generate(&api_key, prompt).await {
        Ok(text) => (StatusCode::OK, response_headers, Json(GenerateResponse { text })).into_response(),
        Err(err) => {
            match &err {
                AiError::Status(status) => warn!(status, "AI upstream rejected request"),
                AiError::Transport(_) | AiError::Empty => warn!("AI upstream failed: {err}"),
            }
            (
                StatusCode::BAD_GATEWAY,
                response_headers,
                "AI service request failed.",
            )
                .into_response()
        }
    }
}
