//! Clerk Backend API client.
//!
//! Session tokens are RS256 JWTs signed with the instance key set. The key
//! set is cached in memory with a TTL and refreshed once when a token
//! carries an unknown `kid`, throttled by a cooldown.

use super::{
    AuthenticatedSession, EmailAddress, IdentityProvider, ProviderError, Session, SessionStatus,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header, jwk::JwkSet};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant, SystemTime},
};
use tokio::sync::RwLock;
use tracing::{Instrument, debug, info, info_span, warn};

pub const DEFAULT_API_URL: &str = "https://api.clerk.com";
const JWKS_CACHE_TTL_SECONDS: u64 = 300;
const JWKS_REFRESH_COOLDOWN_SECONDS: u64 = 30;
const REQUEST_TIMEOUT_SECONDS: u64 = 10;

struct JwksCache {
    keys: Arc<JwkSet>,
    fetched_at: Option<Instant>,
}

impl JwksCache {
    fn is_fresh(&self) -> bool {
        self.fetched_at
            .is_some_and(|at| at.elapsed() < Duration::from_secs(JWKS_CACHE_TTL_SECONDS))
    }
}

/// Claims read from a Clerk session token.
#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    sid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClerkSession {
    id: String,
    user_id: String,
    status: SessionStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    last_active_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    expire_at: DateTime<Utc>,
}

impl From<ClerkSession> for Session {
    fn from(session: ClerkSession) -> Self {
        Self {
            id: session.id,
            user_id: session.user_id,
            status: session.status,
            last_active_at: session.last_active_at,
            expire_at: session.expire_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ClerkVerification {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ClerkEmailAddress {
    id: String,
    email_address: String,
    verification: Option<ClerkVerification>,
}

#[derive(Debug, Deserialize)]
struct ClerkUser {
    id: String,
    first_name: Option<String>,
    last_name: Option<String>,
    primary_email_address_id: Option<String>,
    #[serde(default)]
    email_addresses: Vec<ClerkEmailAddress>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    last_sign_in_at: Option<DateTime<Utc>>,
}

impl From<ClerkUser> for User {
    fn from(user: ClerkUser) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            primary_email_address_id: user.primary_email_address_id,
            email_addresses: user
                .email_addresses
                .into_iter()
                .map(|email| EmailAddress {
                    id: email.id,
                    email_address: email.email_address,
                    verification_status: email.verification.and_then(|v| v.status),
                })
                .collect(),
            last_sign_in_at: user.last_sign_in_at,
        }
    }
}

pub struct ClerkClient {
    client: Client,
    api_url: String,
    jwks_url: String,
    secret_key: SecretString,
    issuer: Option<String>,
    jwks_cache: RwLock<JwksCache>,
    /// Timestamp to throttle refresh attempts on unknown kid.
    last_refresh_unix: AtomicU64,
}

impl ClerkClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(api_url: &str, secret_key: SecretString) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;
        let api_url = api_url.trim_end_matches('/').to_string();
        Ok(Self {
            client,
            jwks_url: format!("{api_url}/v1/jwks"),
            api_url,
            secret_key,
            issuer: None,
            jwks_cache: RwLock::new(JwksCache {
                keys: Arc::new(JwkSet { keys: Vec::new() }),
                fetched_at: None,
            }),
            last_refresh_unix: AtomicU64::new(0),
        })
    }

    /// Fetch keys from a frontend API JWKS URL instead of the Backend API.
    #[must_use]
    pub fn with_jwks_url(mut self, jwks_url: impl Into<String>) -> Self {
        self.jwks_url = jwks_url.into();
        self
    }

    /// Require the `iss` claim to match.
    #[must_use]
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        validation
    }

    /// Return the cached key set; refresh if stale, keep cache if refresh fails.
    async fn jwks_snapshot(&self) -> Result<Arc<JwkSet>, ProviderError> {
        let (cached, fresh) = {
            let cache = self.jwks_cache.read().await;
            (cache.keys.clone(), cache.is_fresh())
        };

        if fresh {
            return Ok(cached);
        }

        if let Err(err) = self.refresh_jwks().await {
            if cached.keys.is_empty() {
                return Err(err);
            }
            warn!(
                error = %err,
                url = %self.jwks_url,
                "failed to refresh clerk jwks cache"
            );
            return Ok(cached);
        }

        Ok(self.jwks_cache.read().await.keys.clone())
    }

    async fn refresh_jwks(&self) -> Result<(), ProviderError> {
        self.last_refresh_unix
            .store(now_unix_seconds(), Ordering::Relaxed);
        let keys: JwkSet = self
            .get_json(&self.jwks_url, "jwks")
            .await?
            .ok_or_else(|| ProviderError::Jwks("key set not found".to_string()))?;

        let mut cache = self.jwks_cache.write().await;
        cache.keys = Arc::new(keys);
        cache.fetched_at = Some(Instant::now());
        info!(jwks_keys = cache.keys.keys.len(), "clerk jwks cache refreshed");
        Ok(())
    }

    /// Refresh if a token `kid` is unknown, with cooldown.
    async fn refresh_on_unknown_kid(&self) -> Result<bool, ProviderError> {
        let now = now_unix_seconds();
        let last = self.last_refresh_unix.load(Ordering::Relaxed);
        if now.saturating_sub(last) < JWKS_REFRESH_COOLDOWN_SECONDS {
            return Ok(false);
        }
        self.refresh_jwks().await?;
        Ok(true)
    }

    /// The secret key is only sent to the Backend API; frontend JWKS URLs are public.
    fn is_backend_url(&self, url: &str) -> bool {
        url.strip_prefix(self.api_url.as_str())
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    /// GET a Clerk resource; 404 maps to `None`.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        resource: &str,
    ) -> Result<Option<T>, ProviderError> {
        let span = info_span!(
            "clerk.request",
            http.method = "GET",
            resource = %resource
        );
        async {
            let mut request = self.client.get(url);
            if self.is_backend_url(url) {
                request = request.bearer_auth(self.secret_key.expose_secret());
            }
            let response = request.send().await?;
            let status = response.status();
            if status == StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(ProviderError::Status {
                    status,
                    resource: resource.to_string(),
                });
            }
            Ok(Some(response.json::<T>().await?))
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn authenticate(&self, token: &str) -> Result<Option<AuthenticatedSession>, ProviderError> {
        let Ok(header) = decode_header(token) else {
            debug!("session token header is malformed");
            return Ok(None);
        };
        let Some(kid) = header.kid else {
            debug!("session token has no kid");
            return Ok(None);
        };

        let mut keys = self.jwks_snapshot().await?;
        if keys.find(&kid).is_none() {
            if !self.refresh_on_unknown_kid().await? {
                return Ok(None);
            }
            keys = self.jwks_cache.read().await.keys.clone();
        }
        let Some(jwk) = keys.find(&kid) else {
            debug!(kid = %kid, "session token signed with unknown key");
            return Ok(None);
        };

        let key = match DecodingKey::from_jwk(jwk) {
            Ok(key) => key,
            Err(err) => {
                warn!(kid = %kid, error = %err, "unusable jwk in clerk key set");
                return Ok(None);
            }
        };

        match decode::<SessionClaims>(token, &key, &self.validation()) {
            Ok(data) => Ok(data.claims.sid.map(|session_id| AuthenticatedSession {
                user_id: data.claims.sub,
                session_id,
            })),
            Err(err) => {
                debug!(error = %err, "session token rejected");
                Ok(None)
            }
        }
    }

    async fn session(&self, session_id: &str) -> Result<Option<Session>, ProviderError> {
        let url = format!("{}/v1/sessions/{session_id}", self.api_url);
        let session: Option<ClerkSession> = self.get_json(&url, "session").await?;
        Ok(session.map(Session::from))
    }

    async fn user(&self, user_id: &str) -> Result<Option<User>, ProviderError> {
        let url = format!("{}/v1/users/{user_id}", self.api_url);
        let user: Option<ClerkUser> = self.get_json(&url, "user").await?;
        Ok(user.map(User::from))
    }
}

fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
