//! Session introspection.

use axum::{Json, extract::Extension, http::HeaderMap};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::debug;

use super::principal::require_auth;
use super::state::AuthState;
use super::types::{SessionResponse, SessionUser};
use crate::api::error::{ApiError, ErrorBody};
use crate::identity::{AuthenticatedSession, Session, User};
use crate::sanitize::mask_email;

fn session_user(user: &User) -> SessionUser {
    SessionUser {
        id: user.id.clone(),
        email: user
            .primary_email()
            .map(|email| mask_email(&email.email_address)),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        is_email_verified: user.is_email_verified(),
        last_sign_in_at: user.last_sign_in_at,
    }
}

/// Shape the session snapshot for the wire.
#[must_use]
pub fn session_response(
    caller: &AuthenticatedSession,
    session: &Session,
    user: Option<&User>,
    now: DateTime<Utc>,
    warning: Duration,
) -> SessionResponse {
    SessionResponse {
        user_id: caller.user_id.clone(),
        session_id: caller.session_id.clone(),
        status: session.status.as_str().to_string(),
        is_active: session.is_active(now),
        expires_at: session.expire_at,
        last_active_at: session.last_active_at,
        time_until_expiry: session.time_until_expiry(now).num_minutes(),
        is_expiring: session.is_expiring(now, warning),
        user: user.map(session_user),
    }
}

/// Return status, timestamps and expiry hints for the caller's session,
/// plus a summary of the signed-in user.
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Current session", body = SessionResponse),
        (status = 401, description = "Missing, invalid or expired session", body = ErrorBody),
        (status = 404, description = "Session not found", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
) -> Result<Json<SessionResponse>, ApiError> {
    let caller = require_auth(&headers, &auth_state).await?;

    let session = auth_state
        .identity()
        .session(&caller.session_id)
        .await?
        .ok_or(ApiError::NotFound("Session not found"))?;

    let now = Utc::now();
    if session.user_id != caller.user_id || !session.is_active(now) {
        debug!(session_id = %session.id, "session is no longer active");
        return Err(ApiError::Unauthenticated);
    }

    let user = auth_state.identity().user(&caller.user_id).await?;

    Ok(Json(session_response(
        &caller,
        &session,
        user.as_ref(),
        now,
        auth_state.config().session_expiry_warning(),
    )))
}
