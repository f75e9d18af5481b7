//! Preferences endpoints.
//!
//! Flow Overview:
//! 1) Authenticate via the Clerk session token.
//! 2) Validate the body; bad enum values, wrong types and unknown fields are 400.
//! 3) Apply the store operation keyed by the caller's user id.

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use std::sync::Arc;

use super::principal::require_auth;
use super::state::AuthState;
use super::types::PreferencesRequest;
use crate::api::error::{ApiError, ErrorBody};
use crate::preferences::{PreferencesHandle, PreferencesPatch, UserPreferences};

fn patch_from(payload: Result<Json<PreferencesRequest>, JsonRejection>) -> Result<PreferencesPatch, ApiError> {
    let Json(request) = payload?;
    Ok(request.into())
}

#[utoipa::path(
    get,
    path = "/api/auth/preferences",
    responses(
        (status = 200, description = "Stored preferences", body = UserPreferences),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 404, description = "No preferences stored yet", body = ErrorBody),
    ),
    tag = "preferences"
)]
pub async fn get_preferences(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<PreferencesHandle>,
) -> Result<Json<UserPreferences>, ApiError> {
    let caller = require_auth(&headers, &auth_state).await?;
    store
        .find(&caller.user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Preferences not found"))
}

/// Create the caller's row; omitted fields take the defaults.
#[utoipa::path(
    post,
    path = "/api/auth/preferences",
    request_body = PreferencesRequest,
    responses(
        (status = 201, description = "Preferences created", body = UserPreferences),
        (status = 400, description = "Invalid field value", body = ErrorBody),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 409, description = "Preferences already exist", body = ErrorBody),
    ),
    tag = "preferences"
)]
pub async fn create_preferences(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<PreferencesHandle>,
    payload: Result<Json<PreferencesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = require_auth(&headers, &auth_state).await?;
    let patch = patch_from(payload)?;
    let prefs = store.create(&caller.user_id, &patch).await?;
    Ok((StatusCode::CREATED, Json(prefs)))
}

/// Create or merge in one step.
#[utoipa::path(
    put,
    path = "/api/auth/preferences",
    request_body = PreferencesRequest,
    responses(
        (status = 200, description = "Preferences stored", body = UserPreferences),
        (status = 400, description = "Invalid field value", body = ErrorBody),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
    ),
    tag = "preferences"
)]
pub async fn upsert_preferences(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<PreferencesHandle>,
    payload: Result<Json<PreferencesRequest>, JsonRejection>,
) -> Result<Json<UserPreferences>, ApiError> {
    let caller = require_auth(&headers, &auth_state).await?;
    let patch = patch_from(payload)?;
    Ok(Json(store.upsert(&caller.user_id, &patch).await?))
}

/// Partial update; fields not present are left unchanged.
#[utoipa::path(
    patch,
    path = "/api/auth/preferences",
    request_body = PreferencesRequest,
    responses(
        (status = 200, description = "Preferences updated", body = UserPreferences),
        (status = 400, description = "Invalid field value or empty update", body = ErrorBody),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 404, description = "No preferences stored yet", body = ErrorBody),
    ),
    tag = "preferences"
)]
pub async fn update_preferences(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<PreferencesHandle>,
    payload: Result<Json<PreferencesRequest>, JsonRejection>,
) -> Result<Json<UserPreferences>, ApiError> {
    let caller = require_auth(&headers, &auth_state).await?;
    let patch = patch_from(payload)?;
    if patch.is_empty() {
        return Err(ApiError::Validation("No updates provided".to_string()));
    }
    Ok(Json(store.update(&caller.user_id, &patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/auth/preferences",
    responses(
        (status = 204, description = "Preferences deleted"),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 404, description = "No preferences stored yet", body = ErrorBody),
    ),
    tag = "preferences"
)]
pub async fn delete_preferences(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<PreferencesHandle>,
) -> Result<StatusCode, ApiError> {
    let caller = require_auth(&headers, &auth_state).await?;
    store.delete(&caller.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/auth/preferences/verification-prompted",
    responses(
        (status = 200, description = "Prompt recorded", body = UserPreferences),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 404, description = "No preferences stored yet", body = ErrorBody),
    ),
    tag = "preferences"
)]
pub async fn mark_verification_prompted(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<PreferencesHandle>,
) -> Result<Json<UserPreferences>, ApiError> {
    let caller = require_auth(&headers, &auth_state).await?;
    Ok(Json(store.mark_verification_prompted(&caller.user_id).await?))
}

/// Stamp the login reminder with the current time.
#[utoipa::path(
    post,
    path = "/api/auth/preferences/login-reminder",
    responses(
        (status = 200, description = "Reminder recorded", body = UserPreferences),
        (status = 401, description = "Missing or invalid session", body = ErrorBody),
        (status = 404, description = "No preferences stored yet", body = ErrorBody),
    ),
    tag = "preferences"
)]
pub async fn record_login_reminder(
    headers: HeaderMap,
    Extension(auth_state): Extension<Arc<AuthState>>,
    Extension(store): Extension<PreferencesHandle>,
) -> Result<Json<UserPreferences>, ApiError> {
    let caller = require_auth(&headers, &auth_state).await?;
    Ok(Json(store.update_last_login_reminder(&caller.user_id).await?))
}
