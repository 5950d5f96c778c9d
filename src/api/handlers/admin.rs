use super::principal::require_admin;
use crate::api::AppState;
use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;

#[utoipa::path(
    delete,
    path = "/v1/admin/rate-limits/{identity}",
    params(
        ("identity" = String, Path, description = "User id whose AI quota window is cleared.")
    ),
    responses(
        (status = 204, description = "Quota window cleared."),
        (status = 401, description = "Missing authenticated user."),
        (status = 403, description = "Caller is not an admin."),
    ),
    tag = "admin"
)]
/// Clear a user's AI quota window so their next call opens a fresh one.
pub async fn reset_rate_limit(
    headers: HeaderMap,
    state: Extension<Arc<AppState>>,
    Path(identity): Path<String>,
) -> impl IntoResponse {
    let admin = match require_admin(&headers) {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    state.limiter().reset(&identity);
    info!(admin = %admin.user_id, identity = %identity, "Reset AI rate limit");

    StatusCode::NO_CONTENT.into_response()
}
