//! Site arguments: app origin, static assets, route lists and contact delivery.

use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use std::path::PathBuf;
use url::Url;

use crate::api::guard::{DEFAULT_PROTECTED_PATHS, DEFAULT_PUBLIC_PATHS, DEFAULT_SENSITIVE_PATHS};
use crate::api::handlers::auth::state::{
    DEFAULT_SENSITIVE_FEATURES, MAX_SESSION_EXPIRY_WARNING_SECONDS,
};
use crate::api::handlers::contact::DEFAULT_CONTACT_RECIPIENT;

pub const ARG_APP_BASE_URL: &str = "app-base-url";
pub const ARG_STATIC_DIR: &str = "static-dir";
pub const ARG_SESSION_EXPIRY_WARNING_SECONDS: &str = "session-expiry-warning-seconds";
pub const ARG_SENSITIVE_FEATURES: &str = "sensitive-features";
pub const ARG_PUBLIC_PATHS: &str = "public-paths";
pub const ARG_PROTECTED_PATHS: &str = "protected-paths";
pub const ARG_SENSITIVE_PATHS: &str = "sensitive-paths";
pub const ARG_CONTACT_RECIPIENT: &str = "contact-recipient";

#[derive(Debug)]
pub struct Options {
    pub app_base_url: Url,
    pub static_dir: Option<PathBuf>,
    pub session_expiry_warning_seconds: i64,
    pub sensitive_features: Vec<String>,
    pub public_paths: Vec<String>,
    pub protected_paths: Vec<String>,
    pub sensitive_paths: Vec<String>,
    pub contact_recipient: String,
}

impl Options {
    /// Parse site arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the app base URL is not a valid absolute URL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let app_base_url = matches
            .get_one::<String>(ARG_APP_BASE_URL)
            .map_or("http://localhost:3000", String::as_str);
        let app_base_url = Url::parse(app_base_url)
            .with_context(|| format!("invalid --{ARG_APP_BASE_URL}: {app_base_url}"))?;

        let list = |id: &str| -> Vec<String> {
            matches
                .get_many::<String>(id)
                .map(|values| {
                    values
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                        .collect()
                })
                .unwrap_or_default()
        };

        Ok(Self {
            app_base_url,
            static_dir: matches
                .get_one::<String>(ARG_STATIC_DIR)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            session_expiry_warning_seconds: matches
                .get_one::<i64>(ARG_SESSION_EXPIRY_WARNING_SECONDS)
                .copied()
                .unwrap_or(300),
            sensitive_features: list(ARG_SENSITIVE_FEATURES),
            public_paths: list(ARG_PUBLIC_PATHS),
            protected_paths: list(ARG_PROTECTED_PATHS),
            sensitive_paths: list(ARG_SENSITIVE_PATHS),
            contact_recipient: matches
                .get_one::<String>(ARG_CONTACT_RECIPIENT)
                .cloned()
                .unwrap_or_else(|| DEFAULT_CONTACT_RECIPIENT.to_string()),
        })
    }
}

fn list_arg(
    id: &'static str,
    env: &'static str,
    help: &'static str,
    defaults: &'static [&'static str],
) -> Arg {
    Arg::new(id)
        .long(id)
        .help(help)
        .env(env)
        .value_delimiter(',')
        .num_args(1..)
        .default_values(defaults.iter().copied())
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_APP_BASE_URL)
                .long(ARG_APP_BASE_URL)
                .help("Public base URL of the site; redirects and CORS are limited to its origin")
                .env("SHIPSMIND_APP_BASE_URL")
                .default_value("http://localhost:3000"),
        )
        .arg(
            Arg::new(ARG_STATIC_DIR)
                .long(ARG_STATIC_DIR)
                .help("Directory with the built site, served for unmatched paths")
                .env("SHIPSMIND_STATIC_DIR"),
        )
        .arg(
            Arg::new(ARG_SESSION_EXPIRY_WARNING_SECONDS)
                .long(ARG_SESSION_EXPIRY_WARNING_SECONDS)
                .help("Remaining session lifetime at which a session counts as expiring (0 to 86400)")
                .env("SHIPSMIND_SESSION_EXPIRY_WARNING_SECONDS")
                .default_value("300")
                .value_parser(
                    clap::value_parser!(i64).range(0..=MAX_SESSION_EXPIRY_WARNING_SECONDS),
                ),
        )
        .arg(list_arg(
            ARG_SENSITIVE_FEATURES,
            "SHIPSMIND_SENSITIVE_FEATURES",
            "Features gated behind email verification (comma separated)",
            DEFAULT_SENSITIVE_FEATURES,
        ))
        .arg(list_arg(
            ARG_PUBLIC_PATHS,
            "SHIPSMIND_PUBLIC_PATHS",
            "Path prefixes open to everyone (comma separated, `/` matches only the root)",
            DEFAULT_PUBLIC_PATHS,
        ))
        .arg(list_arg(
            ARG_PROTECTED_PATHS,
            "SHIPSMIND_PROTECTED_PATHS",
            "Path prefixes that require a session (comma separated)",
            DEFAULT_PROTECTED_PATHS,
        ))
        .arg(list_arg(
            ARG_SENSITIVE_PATHS,
            "SHIPSMIND_SENSITIVE_PATHS",
            "Path prefixes that require a session and a verified email (comma separated)",
            DEFAULT_SENSITIVE_PATHS,
        ))
        .arg(
            Arg::new(ARG_CONTACT_RECIPIENT)
                .long(ARG_CONTACT_RECIPIENT)
                .help("Address that receives contact form submissions")
                .env("SHIPSMIND_CONTACT_RECIPIENT")
                .default_value(DEFAULT_CONTACT_RECIPIENT),
        )
}
