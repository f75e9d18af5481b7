use crate::GIT_COMMIT_HASH;
use crate::preferences::PreferencesHandle;
use axum::{
    body::Body,
    extract::Extension,
    http::{HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

const X_APP: HeaderName = HeaderName::from_static("x-app");

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Health {
    commit: String,
    name: String,
    version: String,
    database: String,
}

impl Health {
    fn current(database_ok: bool) -> Self {
        Self {
            commit: GIT_COMMIT_HASH.to_string(),
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database: if database_ok { "ok" } else { "error" }.to_string(),
        }
    }

    /// `name:version:short-commit`; the commit part is empty when unknown.
    fn x_app(&self) -> Option<HeaderValue> {
        let short_hash = self.commit.get(..7).filter(|_| self.commit.len() > 7).unwrap_or("");
        match HeaderValue::from_str(&format!("{}:{}:{short_hash}", self.name, self.version)) {
            Ok(value) => Some(value),
            Err(err) => {
                error!("Failed to build X-App header: {err}");
                None
            }
        }
    }
}

#[utoipa::path(
    get,
    path= "/health",
    responses (
        (status = 200, description = "Database is healthy", body = [Health]),
        (status = 503, description = "Database is unhealthy", body = [Health])
    ),
    tag= "health"
)]
// axum handler for health
pub async fn health(method: Method, Extension(store): Extension<PreferencesHandle>) -> Response {
    let database_ok = match store.ping().await {
        Ok(()) => true,
        Err(err) => {
            error!("Failed to ping database: {err}");
            false
        }
    };
    debug!(database_ok, "health check");

    let health = Health::current(database_ok);
    let status = if database_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let mut response = if method == Method::GET {
        (status, Json(&health)).into_response()
    } else {
        (status, Body::empty()).into_response()
    };
    if let Some(value) = health.x_app() {
        response.headers_mut().insert(X_APP, value);
    }
    response
}
