//! Read-only view of the identity provider (Clerk).
//!
//! Sessions and users are owned by the provider; this crate only reads a
//! snapshot per request through [`IdentityProvider`].

pub mod clerk;
pub mod memory;

pub use clerk::ClerkClient;
pub use memory::StaticIdentityProvider;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Verification status string the provider uses for confirmed addresses.
pub const VERIFIED: &str = "verified";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Pending,
    Ended,
    Expired,
    Removed,
    Replaced,
    Revoked,
    Abandoned,
    #[serde(other)]
    Unknown,
}

impl SessionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Ended => "ended",
            Self::Expired => "expired",
            Self::Removed => "removed",
            Self::Replaced => "replaced",
            Self::Revoked => "revoked",
            Self::Abandoned => "abandoned",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub status: SessionStatus,
    pub last_active_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
}

impl Session {
    /// Active status and an expiry still in the future.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SessionStatus::Active && self.expire_at > now
    }

    /// Remaining lifetime, clamped at zero.
    #[must_use]
    pub fn time_until_expiry(&self, now: DateTime<Utc>) -> Duration {
        (self.expire_at - now).max(Duration::zero())
    }

    /// True once the remaining lifetime is at or below `warning`.
    #[must_use]
    pub fn is_expiring(&self, now: DateTime<Utc>, warning: Duration) -> bool {
        self.time_until_expiry(now) <= warning
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub id: String,
    pub email_address: String,
    pub verification_status: Option<String>,
}

impl EmailAddress {
    #[must_use]
    pub fn is_verified(&self) -> bool {
        self.verification_status.as_deref() == Some(VERIFIED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub primary_email_address_id: Option<String>,
    pub email_addresses: Vec<EmailAddress>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl User {
    #[must_use]
    pub fn primary_email(&self) -> Option<&EmailAddress> {
        let primary_id = self.primary_email_address_id.as_deref()?;
        self.email_addresses
            .iter()
            .find(|email| email.id == primary_id)
    }

    /// Verification of the primary address only; other addresses do not count.
    #[must_use]
    pub fn is_email_verified(&self) -> bool {
        self.primary_email().is_some_and(EmailAddress::is_verified)
    }
}

/// Identity resolved from a valid session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedSession {
    pub user_id: String,
    pub session_id: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("identity provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("identity provider returned {status} for {resource}")]
    Status {
        status: reqwest::StatusCode,
        resource: String,
    },

    #[error("identity provider key set unavailable: {0}")]
    Jwks(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a session token. Invalid, expired or unknown tokens are `Ok(None)`.
    async fn authenticate(&self, token: &str) -> Result<Option<AuthenticatedSession>, ProviderError>;

    async fn session(&self, session_id: &str) -> Result<Option<Session>, ProviderError>;

    async fn user(&self, user_id: &str) -> Result<Option<User>, ProviderError>;
}

pub type IdentityHandle = Arc<dyn IdentityProvider>;
