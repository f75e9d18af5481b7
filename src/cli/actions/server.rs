use crate::api::{
    self,
    email::LogEmailSender,
    guard::RouteRules,
    handlers::{
        auth::{AuthConfig, AuthState},
        contact::ContactConfig,
    },
};
use crate::identity::ClerkClient;
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, sync::Arc};
use tracing::{debug, info};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub app_base_url: Url,
    pub static_dir: Option<PathBuf>,
    pub clerk_secret_key: SecretString,
    pub clerk_api_url: String,
    pub clerk_jwks_url: Option<String>,
    pub clerk_issuer: Option<String>,
    pub session_expiry_warning_seconds: i64,
    pub sensitive_features: Vec<String>,
    pub public_paths: Vec<String>,
    pub protected_paths: Vec<String>,
    pub sensitive_paths: Vec<String>,
    pub contact_recipient: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the Clerk client cannot be built, the database is
/// unreachable or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let mut clerk = ClerkClient::new(&args.clerk_api_url, args.clerk_secret_key)
        .context("Failed to build Clerk client")?
        .with_issuer(args.clerk_issuer);
    if let Some(jwks_url) = args.clerk_jwks_url {
        clerk = clerk.with_jwks_url(jwks_url);
    }
    info!(
        clerk_api_url = %clerk.api_url(),
        jwks_url = %clerk.jwks_url(),
        "clerk identity provider configured"
    );

    let auth_config = AuthConfig::new(args.app_base_url)
        .with_session_expiry_warning_seconds(args.session_expiry_warning_seconds)
        .with_sensitive_features(args.sensitive_features);

    let rules = RouteRules::new(args.public_paths, args.protected_paths, args.sensitive_paths);
    debug!("Route rules: {:?}", rules);

    let auth_state = Arc::new(AuthState::new(auth_config, Arc::new(clerk), rules));
    let contact = ContactConfig::new(args.contact_recipient, Arc::new(LogEmailSender));

    api::new(args.port, &args.dsn, auth_state, contact, args.static_dir).await
}
