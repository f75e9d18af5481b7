//! Per-user preferences: one row per Clerk user id.
//!
//! Rows are created lazily, merged field by field on update, and removed
//! explicitly. Storage is reached through [`PreferencesStore`] so handlers get
//! an explicitly constructed handle instead of a process-wide client.

pub mod memory;
pub mod postgres;

pub use memory::MemoryPreferencesStore;
pub use postgres::PgPreferencesStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, sync::Arc};
use thiserror::Error;
use utoipa::ToSchema;

pub const DEFAULT_NOTIFICATIONS: bool = true;
pub const DEFAULT_VERIFICATION_PROMPTED: bool = false;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "system" => Ok(Self::System),
            other => Err(format!("invalid theme: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub clerk_user_id: String,
    pub theme: Theme,
    pub notifications: bool,
    pub last_login_reminder: Option<DateTime<Utc>>,
    pub verification_prompted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserPreferences {
    /// Build a fresh row, filling omitted fields with the defaults.
    #[must_use]
    pub fn new(clerk_user_id: &str, patch: &PreferencesPatch, now: DateTime<Utc>) -> Self {
        Self {
            clerk_user_id: clerk_user_id.to_string(),
            theme: patch.theme.unwrap_or_default(),
            notifications: patch.notifications.unwrap_or(DEFAULT_NOTIFICATIONS),
            last_login_reminder: patch.last_login_reminder,
            verification_prompted: patch
                .verification_prompted
                .unwrap_or(DEFAULT_VERIFICATION_PROMPTED),
            created_at: now,
            updated_at: now,
        }
    }

    /// Merge the present fields of `patch`; returns true when anything changed.
    /// `updated_at` only moves when a value actually changes.
    pub fn apply(&mut self, patch: &PreferencesPatch, now: DateTime<Utc>) -> bool {
        let before = (
            self.theme,
            self.notifications,
            self.last_login_reminder,
            self.verification_prompted,
        );

        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(notifications) = patch.notifications {
            self.notifications = notifications;
        }
        if let Some(reminder) = patch.last_login_reminder {
            self.last_login_reminder = Some(reminder);
        }
        if let Some(prompted) = patch.verification_prompted {
            self.verification_prompted = prompted;
        }

        let changed = before
            != (
                self.theme,
                self.notifications,
                self.last_login_reminder,
                self.verification_prompted,
            );
        if changed {
            self.updated_at = now;
        }
        changed
    }
}

/// Partial set of preference fields; `None` means "leave unchanged" on update
/// and "use the default" on create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    pub notifications: Option<bool>,
    pub last_login_reminder: Option<DateTime<Utc>>,
    pub verification_prompted: Option<bool>,
}

impl PreferencesPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.notifications.is_none()
            && self.last_login_reminder.is_none()
            && self.verification_prompted.is_none()
    }

    #[must_use]
    pub fn verification_prompted() -> Self {
        Self {
            verification_prompted: Some(true),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn login_reminder(at: DateTime<Utc>) -> Self {
        Self {
            last_login_reminder: Some(at),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user preferences not found")]
    NotFound,

    #[error("user preferences already exist")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for [`UserPreferences`], keyed by Clerk user id.
#[async_trait]
pub trait PreferencesStore: Send + Sync {
    /// Return the row, or `None` when the user has no preferences yet.
    async fn find(&self, clerk_user_id: &str) -> StoreResult<Option<UserPreferences>>;

    /// Insert a new row with defaults for omitted fields; `Conflict` if one exists.
    async fn create(
        &self,
        clerk_user_id: &str,
        patch: &PreferencesPatch,
    ) -> StoreResult<UserPreferences>;

    /// Merge `patch` into the existing row; `NotFound` if there is none.
    async fn update(
        &self,
        clerk_user_id: &str,
        patch: &PreferencesPatch,
    ) -> StoreResult<UserPreferences>;

    /// Create with defaults or merge, in one atomic step.
    async fn upsert(
        &self,
        clerk_user_id: &str,
        patch: &PreferencesPatch,
    ) -> StoreResult<UserPreferences>;

    /// Remove the row; `NotFound` if there is none.
    async fn delete(&self, clerk_user_id: &str) -> StoreResult<()>;

    /// Liveness check for `/health`.
    async fn ping(&self) -> StoreResult<()>;

    async fn mark_verification_prompted(&self, clerk_user_id: &str) -> StoreResult<UserPreferences> {
        self.update(clerk_user_id, &PreferencesPatch::verification_prompted())
            .await
    }

    async fn update_last_login_reminder(&self, clerk_user_id: &str) -> StoreResult<UserPreferences> {
        self.update(clerk_user_id, &PreferencesPatch::login_reminder(Utc::now()))
            .await
    }
}

/// Shared handle passed to handlers.
pub type PreferencesHandle = Arc<dyn PreferencesStore>;
