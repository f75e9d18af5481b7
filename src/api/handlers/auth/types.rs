//! Request/response types for auth endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::preferences::{PreferencesPatch, Theme};

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub user_id: String,
    pub session_id: String,
    /// Provider status string (`active`, `expired`, ...).
    pub status: String,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    /// Whole minutes left, floored and clamped at zero.
    pub time_until_expiry: i64,
    pub is_expiring: bool,
    /// Null when the provider no longer knows the user.
    pub user: Option<SessionUser>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    /// Primary address, masked for display.
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_email_verified: bool,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VerificationMethod {
    #[serde(rename = "type")]
    pub kind: String,
    pub available: bool,
    pub description: String,
}

impl VerificationMethod {
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                kind: "email_code".to_string(),
                available: true,
                description: "Send verification code to email".to_string(),
            },
            Self {
                kind: "email_link".to_string(),
                available: true,
                description: "Send verification link to email".to_string(),
            },
        ]
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatusResponse {
    pub user_id: String,
    /// Primary address, masked for display.
    pub email: Option<String>,
    pub is_email_verified: bool,
    pub can_access_sensitive_features: bool,
    pub needs_verification: bool,
    pub sensitive_features: Vec<String>,
    pub verification_prompted: bool,
    /// Clerk does not expose the send time, so this is always null.
    pub verification_sent_at: Option<DateTime<Utc>>,
    pub verification_methods: Vec<VerificationMethod>,
}

/// Body accepted by POST/PUT/PATCH `/api/auth/preferences`.
#[derive(ToSchema, Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PreferencesRequest {
    pub theme: Option<Theme>,
    pub notifications: Option<bool>,
    pub verification_prompted: Option<bool>,
    pub last_login_reminder: Option<DateTime<Utc>>,
}

impl From<PreferencesRequest> for PreferencesPatch {
    fn from(request: PreferencesRequest) -> Self {
        Self {
            theme: request.theme,
            notifications: request.notifications,
            last_login_reminder: request.last_login_reminder,
            verification_prompted: request.verification_prompted,
        }
    }
}
