//! Contact form submission.

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;

use super::valid_email;
use crate::api::email::{EmailMessage, EmailSender};
use crate::api::error::{ApiError, ErrorBody};
use crate::sanitize::sanitize_user_input;

pub const DEFAULT_CONTACT_RECIPIENT: &str = "admin@shipsmind.com";

/// Where contact submissions go and how they are delivered.
#[derive(Clone)]
pub struct ContactConfig {
    recipient: String,
    sender: Arc<dyn EmailSender>,
}

impl ContactConfig {
    #[must_use]
    pub fn new(recipient: String, sender: Arc<dyn EmailSender>) -> Self {
        Self { recipient, sender }
    }

    #[must_use]
    pub fn recipient(&self) -> &str {
        &self.recipient
    }
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ContactRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub message: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ContactResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/api/contact",
    request_body = ContactRequest,
    responses(
        (status = 200, description = "Submission accepted", body = ContactResponse),
        (status = 400, description = "Missing or invalid fields", body = ErrorBody),
    ),
    tag = "contact"
)]
pub async fn contact(
    Extension(config): Extension<Arc<ContactConfig>>,
    payload: Result<Json<ContactRequest>, JsonRejection>,
) -> Result<Json<ContactResponse>, ApiError> {
    let Json(request) = payload?;

    let name = request.name.as_deref().map(sanitize_user_input).unwrap_or_default();
    let email = request.email.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() || email.is_empty() {
        return Err(ApiError::Validation(
            "Name and email are required".to_string(),
        ));
    }
    if !valid_email(email) {
        return Err(ApiError::Validation("Invalid email format".to_string()));
    }
    let email = sanitize_user_input(email);
    let message = request.message.as_deref().map(sanitize_user_input);

    let submitted_at = Utc::now();
    let outgoing = EmailMessage::contact_submission(
        config.recipient(),
        &name,
        &email,
        message.as_deref(),
        submitted_at,
    );
    config
        .sender
        .send(&outgoing)
        .map_err(|err| ApiError::Unexpected(format!("contact email delivery: {err:#}")))?;

    info!(recipient = %config.recipient(), "contact form submitted");
    Ok(Json(ContactResponse {
        message: "Contact form submitted successfully".to_string(),
    }))
}
