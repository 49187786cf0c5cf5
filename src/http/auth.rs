//! Request authentication
//!
//! Extracts the caller's session token (bearer header or `access-token`
//! cookie) and resolves it against the identity provider. Handlers receive
//! an `AuthedUser`; unauthenticated requests never reach them.

use crate::error::MatchingError;
use crate::http::server::{envelope, ApiState};
use crate::types::UserId;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::Response;
use tracing::debug;

/// An authenticated caller: resolved user id plus the raw session token,
/// which downstream room lookups forward verbatim.
#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub user_id: UserId,
    pub session_token: String,
}

/// Pull the session token out of the request headers
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(value) = parts.headers.get("authorization") {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    let cookies = parts.headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|cookie| {
        let (name, value) = cookie.trim().split_once('=')?;
        (name == "access-token").then(|| value.to_string())
    })
}

impl FromRequestParts<ApiState> for AuthedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = extract_token(parts) else {
            return Err(envelope(
                StatusCode::UNAUTHORIZED,
                "No access-token",
                None,
            ));
        };

        match state.identity.resolve(&token).await {
            Ok(user_id) => {
                debug!("Authenticated user {}", user_id);
                Ok(AuthedUser {
                    user_id,
                    session_token: token,
                })
            }
            Err(e) => {
                let status = e
                    .downcast_ref::<MatchingError>()
                    .map(MatchingError::http_status)
                    .unwrap_or(500);
                let status =
                    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                Err(envelope(status, "Unable to verify session token", None))
            }
        }
    }
}
