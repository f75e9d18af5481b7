use crate::api::handlers::{
    auth::AuthState,
    contact::ContactConfig,
    health,
};
use crate::preferences::{PgPreferencesStore, PreferencesHandle};
use anyhow::{Context, Result, anyhow};
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{
        HeaderName, HeaderValue, Method, Request,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::options,
};
use sqlx::postgres::PgPoolOptions;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::PropagateRequestIdLayer,
    services::ServeDir,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{Span, error, info, info_span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;

pub mod email;
pub mod error;
pub mod guard;
pub mod handlers;
// OpenAPI router wiring and route registration live in openapi.rs.
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Shared state the routes need, built once at startup.
#[derive(Clone)]
pub struct AppContext {
    pub auth: Arc<AuthState>,
    pub preferences: PreferencesHandle,
    pub contact: Arc<ContactConfig>,
    pub static_dir: Option<PathBuf>,
}

/// Routes behind the route guard, with state attached.
///
/// Transport layers (tracing, request ids, CORS) are added by [`new`].
#[must_use]
pub fn app(context: AppContext) -> Router {
    let (router, _openapi) = router().split_for_parts();
    let mut router = router.route("/health", options(health::health));
    if let Some(dir) = &context.static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(middleware::from_fn_with_state(
            context.auth.clone(),
            guard::route_guard,
        ))
        .layer(Extension(context.auth))
        .layer(Extension(context.preferences))
        .layer(Extension(context.contact))
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    dsn: &str,
    auth_state: Arc<AuthState>,
    contact: ContactConfig,
    static_dir: Option<PathBuf>,
) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    let preferences: PreferencesHandle = Arc::new(PgPreferencesStore::new(pool));

    let app_origin = app_origin(auth_state.config().app_base_url())?;
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_origin(AllowOrigin::exact(app_origin))
        .allow_credentials(true);

    let app = app(AppContext {
        auth: auth_state,
        preferences,
        contact: Arc::new(contact),
        static_dir,
    })
    .layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(cors),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn app_origin(app_base_url: &Url) -> Result<HeaderValue> {
    let host = app_base_url
        .host_str()
        .ok_or_else(|| anyhow!("App base URL must include a valid host: {app_base_url}"))?;
    let port = app_base_url
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    let origin = format!("{}://{}{}", app_base_url.scheme(), host, port);
    HeaderValue::from_str(&origin).context("Failed to build app origin header")
}
