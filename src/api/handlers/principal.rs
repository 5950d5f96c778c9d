//! Authenticated principal extraction.
//!
//! Flow Overview: the upstream auth gateway terminates the user session and
//! forwards the user id and role as headers. Requests that reach this service
//! without them are rejected.

use axum::http::{HeaderMap, StatusCode};

pub const USER_HEADER: &str = "x-authenticated-user";
pub const ROLE_HEADER: &str = "x-authenticated-role";
const ADMIN_ROLE: &str = "admin";
const MAX_USER_ID_LEN: usize = 255;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    pub user_id: String,
    pub is_admin: bool,
}

/// Resolve the forwarded identity, or return 401 when it is missing or malformed.
pub fn require_auth(headers: &HeaderMap) -> Result<Principal, StatusCode> {
    let user_id = headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty() && id.len() <= MAX_USER_ID_LEN)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let is_admin = headers
        .get(ROLE_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|role| {
            role.split(',')
                .any(|r| r.trim().eq_ignore_ascii_case(ADMIN_ROLE))
        });

    Ok(Principal {
        user_id: user_id.to_string(),
        is_admin,
    })
}

/// Like `require_auth`, but 403 for non-admin principals.
pub fn require_admin(headers: &HeaderMap) -> Result<Principal, StatusCode> {
    let principal = require_auth(headers)?;
    if principal.is_admin {
        Ok(principal)
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn missing_user_is_unauthorized() {
        assert_eq!(require_auth(&HeaderMap::new()), Err(StatusCode::UNAUTHORIZED));
        assert_eq!(
            require_auth(&headers(&[(USER_HEADER, "   ")])),
            Err(StatusCode::UNAUTHORIZED)
        );
    }

    #[test]
    fn user_is_trimmed() {
        let principal = require_auth(&headers(&[(USER_HEADER, " u-42 ")])).expect("principal");
        assert_eq!(principal.user_id, "u-42");
        assert!(!principal.is_admin);
    }

    #[test]
    fn admin_role_is_detected_in_list() {
        let principal = require_admin(&headers(&[
            (USER_HEADER, "ops"),
            (ROLE_HEADER, "editor, Admin"),
        ]))
        .expect("admin");
        assert!(principal.is_admin);

        assert_eq!(
            require_admin(&headers(&[(USER_HEADER, "u1"), (ROLE_HEADER, "editor")])),
            Err(StatusCode::FORBIDDEN)
        );
    }
}
