//! Command-line argument dispatch.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{clerk, site};
use anyhow::{Context, Result};
use url::Url;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .filter(|dsn| !dsn.trim().is_empty())
        .context("missing required argument: --dsn")?;
    Url::parse(&dsn).context("invalid SHIPSMIND_DSN")?;

    let clerk_opts = clerk::Options::parse(matches)?;
    let site_opts = site::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        app_base_url: site_opts.app_base_url,
        static_dir: site_opts.static_dir,
        clerk_secret_key: clerk_opts.secret_key,
        clerk_api_url: clerk_opts.api_url,
        clerk_jwks_url: clerk_opts.jwks_url,
        clerk_issuer: clerk_opts.issuer,
        session_expiry_warning_seconds: site_opts.session_expiry_warning_seconds,
        sensitive_features: site_opts.sensitive_features,
        public_paths: site_opts.public_paths,
        protected_paths: site_opts.protected_paths,
        sensitive_paths: site_opts.sensitive_paths,
        contact_recipient: site_opts.contact_recipient,
    }))
}
