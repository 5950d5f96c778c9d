//! Health probe.
//!
//! Reports build metadata, the credential store backend and whether the
//! encryption key is currently usable. A missing or malformed key turns the
//! probe into a 503 so orchestrators surface the misconfiguration.

use crate::{GIT_COMMIT_HASH, api::AppState};
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    store: String,
    encryption_key: String,
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Service is healthy", body = Health),
        (status = 503, description = "Encryption key is missing or malformed", body = Health)
    ),
    tag = "health",
)]
/// Report service health.
pub async fn health(method: Method, state: Extension<Arc<AppState>>) -> impl IntoResponse {
    let key_status = state.codec().probe();
    if let Err(err) = &key_status {
        warn!("Encryption key unavailable: {err}");
    }

    let health = Health {
        commit: GIT_COMMIT_HASH.to_string(),
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: state.store().kind().to_string(),
        encryption_key: if key_status.is_ok() {
            "ok".to_string()
        } else {
            "error".to_string()
        },
    };

    let body = if method == Method::GET {
        Json(&health).into_response()
    } else {
        Body::empty().into_response()
    };

    let headers = x_app_value(&health)
        .parse::<HeaderValue>()
        .map(|x_app_header_value| {
            let mut headers = HeaderMap::new();
            headers.insert("X-App", x_app_header_value);
            headers
        })
        .map_err(|err| {
            debug!("Failed to parse X-App header: {}", err);
        })
        .unwrap_or_else(|()| HeaderMap::new());

    if key_status.is_ok() {
        (StatusCode::OK, headers, body)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, headers, body)
    }
}

/// `name:version:short-commit` for the `X-App` header.
fn x_app_value(health: &Health) -> String {
    format!(
        "{}:{}:{}",
        health.name,
        health.version,
        crate::short_commit(&health.commit)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn health_with_commit(commit: &str) -> Health {
        Health {
            commit: commit.to_string(),
            name: "taleem".to_string(),
            version: "0.1.0".to_string(),
            store: "memory".to_string(),
            encryption_key: "ok".to_string(),
        }
    }

    #[test]
    fn x_app_shortens_long_commit() {
        let health = health_with_commit("0123456789abcdef0123456789abcdef01234567");
        assert_eq!(x_app_value(&health), "taleem:0.1.0:0123456");
    }

    #[test]
    fn x_app_keeps_seven_char_commit() {
        assert_eq!(
            x_app_value(&health_with_commit("abcdef1")),
            "taleem:0.1.0:abcdef1"
        );
        assert_eq!(
            x_app_value(&health_with_commit("unknown")),
            "taleem:0.1.0:unknown"
        );
    }
}
