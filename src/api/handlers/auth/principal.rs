//! Authenticated principal extraction.
//!
//! Flow Overview: read the Clerk session token from the `Authorization`
//! header or the `__session` cookie, verify it with the identity provider and
//! return the caller's user and session ids.

use axum::http::{HeaderMap, header::AUTHORIZATION, header::COOKIE};

use super::state::AuthState;
use crate::api::error::ApiError;
use crate::identity::AuthenticatedSession;

/// Cookie Clerk sets on the app origin.
pub const SESSION_COOKIE_NAME: &str = "__session";

/// Bearer token first, then the session cookie.
#[must_use]
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = bearer_token(headers) {
        return Some(token);
    }
    let value = headers.get(COOKIE)?.to_str().ok()?;
    value.split(';').find_map(|pair| {
        let (key, val) = pair.trim().split_once('=')?;
        (key.trim() == SESSION_COOKIE_NAME && !val.trim().is_empty())
            .then(|| val.trim().to_string())
    })
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Resolve the caller, `None` when there is no valid session token.
///
/// # Errors
/// Returns `Unexpected` when the identity provider cannot be reached.
pub async fn authenticate(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<Option<AuthenticatedSession>, ApiError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    Ok(state.identity().authenticate(&token).await?)
}

/// Resolve the caller or fail with 401.
///
/// # Errors
/// `Unauthenticated` for missing or invalid tokens, `Unexpected` on provider failure.
pub async fn require_auth(
    headers: &HeaderMap,
    state: &AuthState,
) -> Result<AuthenticatedSession, ApiError> {
    authenticate(headers, state)
        .await?
        .ok_or(ApiError::Unauthenticated)
}
