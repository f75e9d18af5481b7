//! Password strength check for the sign-up form.

use axum::{Json, extract::rejection::JsonRejection};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ErrorBody};
use crate::password::{PasswordValidation, is_breached_password, validate_password};

#[derive(ToSchema, Deserialize, Debug)]
pub struct PasswordCheckRequest {
    pub password: String,
}

#[derive(ToSchema, Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCheckResponse {
    #[serde(flatten)]
    pub validation: PasswordValidation,
    pub is_breached: bool,
}

#[utoipa::path(
    post,
    path = "/api/auth/password-check",
    request_body = PasswordCheckRequest,
    responses(
        (status = 200, description = "Complexity and denylist result", body = PasswordCheckResponse),
        (status = 400, description = "Missing password", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn password_check(
    payload: Result<Json<PasswordCheckRequest>, JsonRejection>,
) -> Result<Json<PasswordCheckResponse>, ApiError> {
    let Json(request) = payload?;
    Ok(Json(PasswordCheckResponse {
        validation: validate_password(&request.password),
        is_breached: is_breached_password(&request.password),
    }))
}
