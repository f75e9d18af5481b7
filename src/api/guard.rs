//! Route guard applied in front of every route.
//!
//! Paths are classified against the configured lists (sensitive first, then
//! protected, then public). The decision itself is a pure function of the
//! classification, the visitor and the request target; the middleware only
//! resolves the visitor from the session token.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::debug;
use url::{Url, form_urlencoded};

use super::error::ApiError;
use super::handlers::auth::{AuthState, principal};
use crate::sanitize::{DEFAULT_REDIRECT, restrict_redirect};

pub const SIGN_IN_PATH: &str = "/sign-in";
pub const SIGN_UP_PATH: &str = "/sign-up";
pub const VERIFY_EMAIL_PATH: &str = "/verify-email";

pub const DEFAULT_PUBLIC_PATHS: &[&str] = &[
    "/",
    "/solutions",
    "/case-studies",
    "/blog",
    "/contact",
    "/privacy",
    "/terms",
    "/api/webhooks",
    "/api/contact",
    "/sign-in",
    "/sign-up",
];

pub const DEFAULT_PROTECTED_PATHS: &[&str] = &[
    "/dashboard",
    "/admin",
    "/profile",
    "/settings",
    "/api/auth/preferences",
    "/api/auth/session",
    "/api/auth/verification-status",
];

pub const DEFAULT_SENSITIVE_PATHS: &[&str] = &["/admin", "/export", "/payment", "/billing"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    Public,
    Protected,
    Sensitive,
    Unlisted,
}

impl PathClass {
    #[must_use]
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::Protected | Self::Sensitive)
    }
}

/// Immutable path lists handed to the guard at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRules {
    public: Vec<String>,
    protected: Vec<String>,
    sensitive: Vec<String>,
}

impl Default for RouteRules {
    fn default() -> Self {
        Self::new(
            owned(DEFAULT_PUBLIC_PATHS),
            owned(DEFAULT_PROTECTED_PATHS),
            owned(DEFAULT_SENSITIVE_PATHS),
        )
    }
}

impl RouteRules {
    #[must_use]
    pub fn new(public: Vec<String>, protected: Vec<String>, sensitive: Vec<String>) -> Self {
        Self {
            public,
            protected,
            sensitive,
        }
    }

    #[must_use]
    pub fn classify(&self, path: &str) -> PathClass {
        if matches_any(&self.sensitive, path) {
            PathClass::Sensitive
        } else if matches_any(&self.protected, path) {
            PathClass::Protected
        } else if matches_any(&self.public, path) {
            PathClass::Public
        } else {
            PathClass::Unlisted
        }
    }
}

fn owned(paths: &[&str]) -> Vec<String> {
    paths.iter().map(ToString::to_string).collect()
}

/// `/` only matches the root; every other entry is a prefix.
fn matches_any(entries: &[String], path: &str) -> bool {
    entries.iter().any(|entry| {
        if entry == "/" {
            path == "/"
        } else {
            path.starts_with(entry.as_str())
        }
    })
}

/// Who is asking, as far as the guard needs to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visitor {
    Anonymous,
    /// `email_verified` is only resolved for sensitive paths.
    Authenticated { email_verified: Option<bool> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Continue,
    Unauthorized,
    Redirect(String),
}

fn is_auth_page(path: &str) -> bool {
    path.starts_with(SIGN_IN_PATH) || path.starts_with(SIGN_UP_PATH)
}

fn is_api(path: &str) -> bool {
    path == "/api" || path.starts_with("/api/")
}

fn return_url(query: Option<&str>) -> Option<String> {
    let query = query?;
    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    ["redirect_url", "return_url"].iter().find_map(|key| {
        pairs
            .iter()
            .find(|(name, value)| name == key && !value.is_empty())
            .map(|(_, value)| value.clone())
    })
}

fn sign_in_redirect(path: &str, query: Option<&str>) -> String {
    let target = match query {
        Some(query) if !query.is_empty() => format!("{path}?{query}"),
        _ => path.to_string(),
    };
    let encoded: String = form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{SIGN_IN_PATH}?redirect_url={encoded}")
}

/// Decide what to do with a request. Stateless across requests.
#[must_use]
pub fn decide(
    class: PathClass,
    visitor: Visitor,
    path: &str,
    query: Option<&str>,
    app_base_url: &Url,
) -> GuardDecision {
    match visitor {
        Visitor::Anonymous if class.requires_auth() => {
            if is_api(path) {
                GuardDecision::Unauthorized
            } else {
                GuardDecision::Redirect(sign_in_redirect(path, query))
            }
        }
        Visitor::Anonymous => GuardDecision::Continue,
        Visitor::Authenticated { email_verified } => {
            if is_auth_page(path) {
                let target = return_url(query).map_or_else(
                    || DEFAULT_REDIRECT.to_string(),
                    |candidate| restrict_redirect(&candidate, app_base_url),
                );
                GuardDecision::Redirect(target)
            } else if path == "/" {
                GuardDecision::Redirect(DEFAULT_REDIRECT.to_string())
            } else if class == PathClass::Sensitive && email_verified == Some(false) {
                GuardDecision::Redirect(VERIFY_EMAIL_PATH.to_string())
            } else {
                GuardDecision::Continue
            }
        }
    }
}

/// Only these requests need the session resolved.
fn needs_visitor(class: PathClass, path: &str) -> bool {
    class.requires_auth() || is_auth_page(path) || path == "/"
}

async fn resolve_visitor(
    state: &AuthState,
    headers: &HeaderMap,
    class: PathClass,
) -> Result<Visitor, ApiError> {
    let Some(session) = principal::authenticate(headers, state).await? else {
        return Ok(Visitor::Anonymous);
    };
    if class != PathClass::Sensitive {
        return Ok(Visitor::Authenticated {
            email_verified: None,
        });
    }
    match state.identity().user(&session.user_id).await? {
        Some(user) => Ok(Visitor::Authenticated {
            email_verified: Some(user.is_email_verified()),
        }),
        // A token for a user that no longer exists is as good as none.
        None => Ok(Visitor::Anonymous),
    }
}

/// axum middleware; install with `from_fn_with_state`.
pub async fn route_guard(
    State(state): State<Arc<AuthState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let class = state.rules().classify(&path);

    let visitor = if needs_visitor(class, &path) {
        match resolve_visitor(&state, request.headers(), class).await {
            Ok(visitor) => visitor,
            Err(err) => return err.into_response(),
        }
    } else {
        Visitor::Anonymous
    };

    match decide(
        class,
        visitor,
        &path,
        query.as_deref(),
        state.config().app_base_url(),
    ) {
        GuardDecision::Continue => next.run(request).await,
        GuardDecision::Unauthorized => {
            debug!(path = %path, "guard rejected unauthenticated api request");
            ApiError::Unauthenticated.into_response()
        }
        GuardDecision::Redirect(location) => {
            debug!(path = %path, location = %location, "guard redirect");
            Redirect::temporary(&location).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://localhost:3000").unwrap()
    }

    const SIGNED_IN: Visitor = Visitor::Authenticated {
        email_verified: None,
    };

    #[test]
    fn classification_order() {
        let rules = RouteRules::default();
        assert_eq!(rules.classify("/admin/users"), PathClass::Sensitive);
        assert_eq!(rules.classify("/dashboard"), PathClass::Protected);
        assert_eq!(rules.classify("/api/auth/session"), PathClass::Protected);
        assert_eq!(rules.classify("/blog/post-1"), PathClass::Public);
        assert_eq!(rules.classify("/"), PathClass::Public);
        // The root entry is not a prefix for everything.
        assert_eq!(rules.classify("/unknown"), PathClass::Unlisted);
    }

    #[test]
    fn anonymous_page_redirects_to_sign_in() {
        let decision = decide(
            PathClass::Protected,
            Visitor::Anonymous,
            "/dashboard/reports",
            Some("tab=1"),
            &base(),
        );
        assert_eq!(
            decision,
            GuardDecision::Redirect("/sign-in?redirect_url=%2Fdashboard%2Freports%3Ftab%3D1".into())
        );
    }

    #[test]
    fn anonymous_api_is_unauthorized() {
        let decision = decide(
            PathClass::Protected,
            Visitor::Anonymous,
            "/api/auth/preferences",
            None,
            &base(),
        );
        assert_eq!(decision, GuardDecision::Unauthorized);
    }

    #[test]
    fn anonymous_public_and_unlisted_pass() {
        for class in [PathClass::Public, PathClass::Unlisted] {
            assert_eq!(
                decide(class, Visitor::Anonymous, "/blog", None, &base()),
                GuardDecision::Continue
            );
        }
    }

    #[test]
    fn signed_in_leaves_auth_pages() {
        let decision = decide(
            PathClass::Public,
            SIGNED_IN,
            "/sign-in",
            Some("redirect_url=%2Fprofile%3Fx%3D1"),
            &base(),
        );
        assert_eq!(decision, GuardDecision::Redirect("/profile?x=1".into()));

        let decision = decide(
            PathClass::Public,
            SIGNED_IN,
            "/sign-up/continue",
            Some("redirect_url=http://evil.com/x"),
            &base(),
        );
        assert_eq!(decision, GuardDecision::Redirect("/dashboard".into()));

        let decision = decide(PathClass::Public, SIGNED_IN, "/sign-in", None, &base());
        assert_eq!(decision, GuardDecision::Redirect("/dashboard".into()));
    }

    #[test]
    fn signed_in_root_goes_to_dashboard() {
        assert_eq!(
            decide(PathClass::Public, SIGNED_IN, "/", None, &base()),
            GuardDecision::Redirect("/dashboard".into())
        );
    }

    #[test]
    fn sensitive_requires_verified_email() {
        let unverified = Visitor::Authenticated {
            email_verified: Some(false),
        };
        let verified = Visitor::Authenticated {
            email_verified: Some(true),
        };
        assert_eq!(
            decide(PathClass::Sensitive, unverified, "/billing", None, &base()),
            GuardDecision::Redirect("/verify-email".into())
        );
        assert_eq!(
            decide(PathClass::Sensitive, verified, "/billing", None, &base()),
            GuardDecision::Continue
        );
        assert_eq!(
            decide(PathClass::Sensitive, Visitor::Anonymous, "/billing", None, &base()),
            GuardDecision::Redirect("/sign-in?redirect_url=%2Fbilling".into())
        );
    }

    #[test]
    fn signed_in_protected_passes() {
        assert_eq!(
            decide(PathClass::Protected, SIGNED_IN, "/dashboard", None, &base()),
            GuardDecision::Continue
        );
    }
}
