//! Email verification gate for sensitive features.

use axum::{Json, extract::Extension, http::HeaderMap};
use std::sync::Arc;

use super::principal::require_auth;
use super::state::AuthState;
use super::types::{VerificationMethod, VerificationStatusResponse};
use crate::api::error::{ApiError, ErrorBody};
use crate::identity::User;
use crate::preferences::PreferencesHandle;
use crate::sanitize::mask_email;

/// Access to every sensitive feature follows email verification alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensitiveAccess {
    pub has_access: bool,
    pub needs_verification: bool,
}

#[must_use]
pub const fn sensitive_access(is_email_verified: bool) -> SensitiveAccess {
    SensitiveAccess {
        has_access: is_email_verified,
        needs_verification: !is_email_verified,
    }
}

fn verification_response(
    user: &User,
    sensitive_features: &[String],
    verification_prompted: bool,
) -> VerificationStatusResponse {
    let is_email_verified = user.is_email_verified();
    let access = sensitive_access(is_email_verified);
    VerificationStatusResponse {
        user_id: user.id.clone(),
        email: user
            .primary_email()
            .map(|email| mask_email(&email.email_address)),
        is_email_verified,
        can_access_sensitive_features: access.has_access,
        needs_verification: access.needs_verification,
        sensitive_features: sensitive_features.to_vec(),
        verification_prompted,
        verification_sent_at: None,
        verification_methods: VerificationMethod::defaults(),
    }
}

/// Report whether the caller's primary email is verified and what it unlocks.
///
/// Read-only: `verificationPrompted` comes from stored preferences and is
/// `false` when the caller has none.
#[utoipa::path(
    get,
    path = "/api/auth/verification-status",
    responses(
        (status = 200, description = "Verification status", body = VerificationStatusResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 404, description = "User not found", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn verification_status(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<PreferencesHandle>,
) -> Result<Json<VerificationStatusResponse>, ApiError> {
    let caller = require_auth(&headers, &auth_state).await?;

    let user = auth_state
        .identity()
        .user(&caller.user_id)
        .await?
        .ok_or(ApiError::NotFound("User not found"))?;

    let verification_prompted = store
        .find(&user.id)
        .await?
        .is_some_and(|prefs| prefs.verification_prompted);

    Ok(Json(verification_response(
        &user,
        auth_state.config().sensitive_features(),
        verification_prompted,
    )))
}
