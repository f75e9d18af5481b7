//! End-to-end tests for the HTTP surface.
//!
//! The full router (route guard included) is driven in-process with
//! `tower::ServiceExt::oneshot`, backed by the in-memory identity provider and
//! preferences store. No network or database is needed.

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{
        Method, Request, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION},
    },
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shipsmind::{
    api::{
        self, AppContext,
        email::{EmailMessage, EmailSender},
        guard::RouteRules,
        handlers::{
            auth::{AuthConfig, AuthState},
            contact::ContactConfig,
        },
    },
    identity::{EmailAddress, Session, SessionStatus, StaticIdentityProvider, User, VERIFIED},
    preferences::MemoryPreferencesStore,
};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use url::Url;

const VERIFIED_TOKEN: &str = "tok_verified";
const UNVERIFIED_TOKEN: &str = "tok_unverified";
const EXPIRED_TOKEN: &str = "tok_expired";
const ORPHAN_TOKEN: &str = "tok_orphan";

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<EmailMessage>>,
}

impl EmailSender for RecordingSender {
    fn send(&self, message: &EmailMessage) -> anyhow::Result<()> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}

fn session(id: &str, user_id: &str, status: SessionStatus, expires_in: Duration) -> Session {
    let now = Utc::now();
    Session {
        id: id.to_string(),
        user_id: user_id.to_string(),
        status,
        last_active_at: now - Duration::minutes(1),
        expire_at: now + expires_in,
    }
}

fn user(id: &str, email: &str, status: &str) -> User {
    User {
        id: id.to_string(),
        first_name: Some("Ada".to_string()),
        last_name: None,
        primary_email_address_id: Some(format!("idn_{id}")),
        email_addresses: vec![EmailAddress {
            id: format!("idn_{id}"),
            email_address: email.to_string(),
            verification_status: Some(status.to_string()),
        }],
        last_sign_in_at: None,
    }
}

struct TestApp {
    router: Router,
    mailbox: Arc<RecordingSender>,
}

fn test_app() -> Result<TestApp> {
    let verified = session("sess_v", "user_v", SessionStatus::Active, Duration::hours(1));
    let unverified = session("sess_u", "user_u", SessionStatus::Active, Duration::minutes(3));
    let expired = session("sess_x", "user_v", SessionStatus::Expired, Duration::minutes(-5));
    // Token is valid but the provider no longer knows the session.
    let orphan = session("sess_gone", "user_v", SessionStatus::Active, Duration::hours(1));

    let identity = StaticIdentityProvider::new()
        .with_token(VERIFIED_TOKEN, &verified)
        .with_token(UNVERIFIED_TOKEN, &unverified)
        .with_token(EXPIRED_TOKEN, &expired)
        .with_token(ORPHAN_TOKEN, &orphan)
        .with_session(verified)
        .with_session(unverified)
        .with_session(expired)
        .with_user(user("user_v", "ada@example.com", VERIFIED))
        .with_user(user("user_u", "bob@example.com", "unverified"));

    let config = AuthConfig::new(Url::parse("http://localhost:3000")?);
    let auth = Arc::new(AuthState::new(
        config,
        Arc::new(identity),
        RouteRules::default(),
    ));
    let mailbox = Arc::new(RecordingSender::default());

    let router = api::app(AppContext {
        auth,
        preferences: Arc::new(MemoryPreferencesStore::new()),
        contact: Arc::new(ContactConfig::new(
            "admin@shipsmind.com".to_string(),
            mailbox.clone(),
        )),
        static_dir: None,
    });

    Ok(TestApp { router, mailbox })
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(serde_json::to_vec(&value)?)
        }
        None => Body::empty(),
    };
    Ok(builder.body(body)?)
}

async fn send(router: &Router, req: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = router.clone().oneshot(req).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)?
    };
    Ok((status, value))
}

#[tokio::test]
async fn protected_endpoints_reject_anonymous_callers() -> Result<()> {
    let app = test_app()?;
    for uri in [
        "/api/auth/session",
        "/api/auth/verification-status",
        "/api/auth/preferences",
    ] {
        let (status, body) = send(&app.router, request(Method::GET, uri, None, None)?).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body, json!({"error": "Unauthorized"}));
    }

    let (status, _) = send(
        &app.router,
        request(Method::GET, "/api/auth/session", Some("tok_bogus"), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn session_cookie_is_accepted() -> Result<()> {
    let app = test_app()?;
    let req = Request::builder()
        .uri("/api/auth/session")
        .header(COOKIE, format!("theme=dark; __session={VERIFIED_TOKEN}"))
        .body(Body::empty())?;
    let (status, body) = send(&app.router, req).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], "user_v");
    Ok(())
}

#[tokio::test]
async fn session_details() -> Result<()> {
    let app = test_app()?;

    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/auth/session", Some(VERIFIED_TOKEN), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], "sess_v");
    assert_eq!(body["status"], "active");
    assert_eq!(body["isActive"], true);
    assert_eq!(body["isExpiring"], false);
    let minutes = body["timeUntilExpiry"].as_i64().unwrap_or_default();
    assert!((58..=60).contains(&minutes), "got {minutes}");
    assert_eq!(body["user"]["id"], "user_v");
    assert_eq!(body["user"]["email"], "a*a@example.com");
    assert_eq!(body["user"]["firstName"], "Ada");
    assert_eq!(body["user"]["lastName"], Value::Null);
    assert_eq!(body["user"]["isEmailVerified"], true);
    assert_eq!(body["user"]["lastSignInAt"], Value::Null);

    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/auth/session", Some(UNVERIFIED_TOKEN), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isExpiring"], true);
    assert_eq!(body["user"]["isEmailVerified"], false);
    Ok(())
}

#[tokio::test]
async fn session_errors() -> Result<()> {
    let app = test_app()?;

    let (status, _) = send(
        &app.router,
        request(Method::GET, "/api/auth/session", Some(EXPIRED_TOKEN), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app.router,
        request(Method::GET, "/api/auth/session", Some(ORPHAN_TOKEN), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Session not found"}));
    Ok(())
}

#[tokio::test]
async fn verification_status_for_verified_user() -> Result<()> {
    let app = test_app()?;
    let (status, body) = send(
        &app.router,
        request(
            Method::GET,
            "/api/auth/verification-status",
            Some(VERIFIED_TOKEN),
            None,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isEmailVerified"], true);
    assert_eq!(body["canAccessSensitiveFeatures"], true);
    assert_eq!(body["needsVerification"], false);
    assert_eq!(body["verificationPrompted"], false);
    assert_eq!(body["email"], "a*a@example.com");
    assert_eq!(body["verificationSentAt"], Value::Null);

    // A verified caller never gets a preferences row as a side effect.
    let (status, _) = send(
        &app.router,
        request(Method::GET, "/api/auth/preferences", Some(VERIFIED_TOKEN), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn verification_status_is_read_only() -> Result<()> {
    let app = test_app()?;
    let status_uri = "/api/auth/verification-status";
    let (status, body) = send(
        &app.router,
        request(Method::GET, status_uri, Some(UNVERIFIED_TOKEN), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isEmailVerified"], false);
    assert_eq!(body["needsVerification"], true);
    assert_eq!(body["canAccessSensitiveFeatures"], false);
    assert_eq!(body["verificationPrompted"], false);
    assert_eq!(
        body["sensitiveFeatures"],
        json!(["Data export", "Payment processing", "Administrative functions"])
    );
    assert_eq!(body["verificationMethods"][0]["type"], "email_code");

    let (status, _) = send(
        &app.router,
        request(Method::GET, "/api/auth/preferences", Some(UNVERIFIED_TOKEN), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Checking the status first must not block the user's own create.
    let (status, created) = send(
        &app.router,
        request(
            Method::POST,
            "/api/auth/preferences",
            Some(UNVERIFIED_TOKEN),
            Some(json!({"theme": "dark"})),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["verificationPrompted"], false);

    let (status, _) = send(
        &app.router,
        request(
            Method::POST,
            "/api/auth/preferences/verification-prompted",
            Some(UNVERIFIED_TOKEN),
            None,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(
        &app.router,
        request(Method::GET, status_uri, Some(UNVERIFIED_TOKEN), None)?,
    )
    .await?;
    assert_eq!(body["verificationPrompted"], true);
    Ok(())
}

#[tokio::test]
async fn preferences_lifecycle() -> Result<()> {
    let app = test_app()?;
    let uri = "/api/auth/preferences";

    let (status, created) = send(
        &app.router,
        request(Method::POST, uri, Some(VERIFIED_TOKEN), Some(json!({"theme": "dark"})))?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["clerkUserId"], "user_v");
    assert_eq!(created["theme"], "dark");
    assert_eq!(created["notifications"], true);

    let (status, body) = send(
        &app.router,
        request(Method::POST, uri, Some(VERIFIED_TOKEN), Some(json!({})))?,
    )
    .await?;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body, json!({"error": "Preferences already exist"}));

    let (status, patched) = send(
        &app.router,
        request(Method::PATCH, uri, Some(VERIFIED_TOKEN), Some(json!({"theme": "light"})))?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["theme"], "light");
    assert_eq!(patched["notifications"], true);
    assert_eq!(patched["createdAt"], created["createdAt"]);

    let (status, body) = send(
        &app.router,
        request(Method::PATCH, uri, Some(VERIFIED_TOKEN), Some(json!({})))?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No updates provided"}));

    let (status, _) = send(
        &app.router,
        request(Method::PATCH, uri, Some(VERIFIED_TOKEN), Some(json!({"theme": "neon"})))?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        request(
            Method::PATCH,
            uri,
            Some(VERIFIED_TOKEN),
            Some(json!({"notifications": "yes"})),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        request(Method::DELETE, uri, Some(VERIFIED_TOKEN), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app.router,
        request(Method::DELETE, uri, Some(VERIFIED_TOKEN), None)?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"error": "Preferences not found"}));

    let (status, _) = send(
        &app.router,
        request(Method::PATCH, uri, Some(VERIFIED_TOKEN), Some(json!({"theme": "dark"})))?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn put_preferences_is_idempotent() -> Result<()> {
    let app = test_app()?;
    let uri = "/api/auth/preferences";
    let payload = json!({"theme": "dark", "notifications": false});

    let (status, first) = send(
        &app.router,
        request(Method::PUT, uri, Some(VERIFIED_TOKEN), Some(payload.clone()))?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, second) = send(
        &app.router,
        request(Method::PUT, uri, Some(VERIFIED_TOKEN), Some(payload))?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(second["notifications"], false);
    Ok(())
}

#[tokio::test]
async fn preference_shortcuts() -> Result<()> {
    let app = test_app()?;

    let (status, _) = send(
        &app.router,
        request(
            Method::POST,
            "/api/auth/preferences/login-reminder",
            Some(VERIFIED_TOKEN),
            None,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        request(
            Method::POST,
            "/api/auth/preferences",
            Some(VERIFIED_TOKEN),
            Some(json!({})),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/api/auth/preferences/verification-prompted",
            Some(VERIFIED_TOKEN),
            None,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["verificationPrompted"], true);

    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/api/auth/preferences/login-reminder",
            Some(VERIFIED_TOKEN),
            None,
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["lastLoginReminder"].is_string());
    assert_eq!(body["verificationPrompted"], true);
    Ok(())
}

#[tokio::test]
async fn guard_redirects_pages() -> Result<()> {
    let app = test_app()?;

    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/dashboard?tab=1", None, None)?)
        .await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).map(|v| v.as_bytes()),
        Some("/sign-in?redirect_url=%2Fdashboard%3Ftab%3D1".as_bytes())
    );

    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/", Some(VERIFIED_TOKEN), None)?)
        .await?;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(LOCATION).map(|v| v.as_bytes()),
        Some("/dashboard".as_bytes())
    );

    let response = app
        .router
        .clone()
        .oneshot(request(
            Method::GET,
            "/sign-in?redirect_url=https://evil.example/steal",
            Some(VERIFIED_TOKEN),
            None,
        )?)
        .await?;
    assert_eq!(
        response.headers().get(LOCATION).map(|v| v.as_bytes()),
        Some("/dashboard".as_bytes())
    );

    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/admin", Some(UNVERIFIED_TOKEN), None)?)
        .await?;
    assert_eq!(
        response.headers().get(LOCATION).map(|v| v.as_bytes()),
        Some("/verify-email".as_bytes())
    );
    Ok(())
}

#[tokio::test]
async fn contact_form() -> Result<()> {
    let app = test_app()?;

    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/api/contact",
            None,
            Some(json!({"name": "<b>Ada</b>", "email": "ada@example.com"})),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Contact form submitted successfully");

    let sent = app
        .mailbox
        .sent
        .lock()
        .map(|sent| sent.clone())
        .unwrap_or_default();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to_email, "admin@shipsmind.com");
    assert_eq!(sent[0].reply_to.as_deref(), Some("ada@example.com"));
    assert!(sent[0].html_body.contains("No message provided"));
    assert!(!sent[0].html_body.contains("<b>"));

    let (status, body) = send(
        &app.router,
        request(Method::POST, "/api/contact", None, Some(json!({"name": "Ada"})))?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Name and email are required"}));

    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/api/contact",
            None,
            Some(json!({"name": "Ada", "email": "not-an-email"})),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid email format"}));
    Ok(())
}

#[tokio::test]
async fn password_check() -> Result<()> {
    let app = test_app()?;
    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/api/auth/password-check",
            None,
            Some(json!({"password": "PASSWORD123"})),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], false);
    assert_eq!(body["requirements"]["lowercase"], false);
    assert_eq!(body["isBreached"], true);

    let (status, body) = send(
        &app.router,
        request(
            Method::POST,
            "/api/auth/password-check",
            None,
            Some(json!({"password": "Str0ng!Harbor"})),
        )?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["isValid"], true);
    assert_eq!(body["message"], "");
    assert_eq!(body["isBreached"], false);
    Ok(())
}

#[tokio::test]
async fn health_reports_store() -> Result<()> {
    let app = test_app()?;
    let (status, body) = send(&app.router, request(Method::GET, "/health", None, None)?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "ok");
    assert_eq!(body["name"], "shipsmind");
    Ok(())
}
