//! Per-user AI API key settings.
//!
//! Flow Overview:
//! 1) Authenticate via the forwarded identity headers.
//! 2) Encrypt the submitted key with the secret codec; only ciphertext is stored.
//! 3) Report a redacted preview on read; a stored key that no longer decrypts
//!    (tampered, or sealed under a rotated encryption key) is reported as 409 so
//!    the user enters it again.

use super::principal::require_auth;
use crate::{
    api::AppState,
    codec::{self, CodecError, MAX_SECRET_LEN},
};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ApiKeyRequest {
    pub api_key: String,
}

impl std::fmt::Debug for ApiKeyRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyRequest")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ApiKeyStatus {
    pub configured: bool,
    pub preview: Option<String>,
}

pub(crate) const UNUSABLE_KEY_MESSAGE: &str =
    "Stored API key can no longer be read. Please enter it again.";

#[utoipa::path(
    put,
    path = "/v1/settings/api-key",
    request_body = ApiKeyRequest,
    responses(
        (status = 204, description = "API key stored."),
        (status = 400, description = "Empty or oversized API key."),
        (status = 401, description = "Missing authenticated user."),
        (status = 500, description = "Encryption key misconfigured or storage failure."),
    ),
    tag = "settings"
)]
pub async fn put_api_key(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Json(payload): Json<ApiKeyRequest>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let api_key = payload.api_key.trim();
    if api_key.is_empty() {
        return (StatusCode::BAD_REQUEST, "API key must not be empty.").into_response();
    }
    if api_key.len() > MAX_SECRET_LEN {
        return (
            StatusCode::BAD_REQUEST,
            format!("API key must be at most {MAX_SECRET_LEN} bytes."),
        )
            .into_response();
    }

    let encrypted = match state.codec().encrypt(api_key) {
        Ok(encrypted) => encrypted,
        Err(err) => {
            error!("Failed to encrypt API key: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    if let Err(err) = state.store().put(&principal.user_id, &encrypted).await {
        error!("Failed to store API key: {err}");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    info!(user_id = %principal.user_id, "Stored encrypted API key");
    StatusCode::NO_CONTENT.into_response()
}

#[utoipa::path(
    get,
    path = "/v1/settings/api-key",
    responses(
        (status = 200, description = "Whether a key is stored, with a redacted preview.", body = ApiKeyStatus),
        (status = 401, description = "Missing authenticated user."),
        (status = 409, description = "Stored key can no longer be decrypted."),
        (status = 500, description = "Encryption key misconfigured or storage failure."),
    ),
    tag = "settings"
)]
pub async fn get_api_key(headers: HeaderMap, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let principal = match require_auth(&headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let encrypted = match state.store().get(&principal.user_id).await {
        Ok(Some(encrypted)) => encrypted,
        Ok(None) => {
            let status = ApiKeyStatus {
                configured: false,
                preview: None,
            };
            return (StatusCode::OK, Json(status)).into_response();
        }
        Err(err) => {
            error!("Failed to load API key: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match state.codec().decrypt(&encrypted) {
        Ok(api_key) => {
            let status = ApiKeyStatus {
                configured: true,
                preview: Some(codec::redact(api_key.expose_secret())),
            };
            (StatusCode::OK, Json(status)).into_response()
        }
        Err(err) => codec_error_response(&principal.user_id, &err),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/settings/api-key",
    responses(
        (status = 204, description = "API key removed (or none was stored)."),
        (status = 401, description = "Missing authenticated user."),
        (status = 500, description = "Storage failure."),
    ),
    tag = "settings"
)]
pub async fn delete_api_key(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match state.store().delete(&principal.user_id).await {
        Ok(removed) => {
            if removed {
                info!(user_id = %principal.user_id, "Deleted API key");
            }
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => {
            error!("Failed to delete API key: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Map a failed decrypt of a stored key to a response.
pub(crate) fn codec_error_response(user_id: &str, err: &CodecError) -> axum::response::Response {
    match err {
        CodecError::Decryption(_) => {
            warn!(user_id, "Stored API key is unusable: {err}");
            (StatusCode::CONFLICT, UNUSABLE_KEY_MESSAGE).into_response()
        }
        CodecError::Configuration(_) | CodecError::Encryption(_) => {
            error!("Failed to decrypt API key: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
