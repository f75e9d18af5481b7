//! Clerk identity provider arguments.

use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::identity::clerk::DEFAULT_API_URL;

pub const ARG_CLERK_SECRET_KEY: &str = "clerk-secret-key";
pub const ARG_CLERK_API_URL: &str = "clerk-api-url";
pub const ARG_CLERK_JWKS_URL: &str = "clerk-jwks-url";
pub const ARG_CLERK_ISSUER: &str = "clerk-issuer";

#[derive(Debug)]
pub struct Options {
    pub secret_key: SecretString,
    pub api_url: String,
    pub jwks_url: Option<String>,
    pub issuer: Option<String>,
}

impl Options {
    /// Parse Clerk arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the secret key is missing or blank.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // clap passes empty env values through, so blank counts as absent.
        let get_non_empty = |id: &str| {
            matches
                .get_one::<String>(id)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let Some(secret_key) = get_non_empty(ARG_CLERK_SECRET_KEY) else {
            anyhow::bail!("missing required argument: --{ARG_CLERK_SECRET_KEY}");
        };

        Ok(Self {
            secret_key: SecretString::from(secret_key),
            api_url: get_non_empty(ARG_CLERK_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            jwks_url: get_non_empty(ARG_CLERK_JWKS_URL),
            issuer: get_non_empty(ARG_CLERK_ISSUER),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_CLERK_SECRET_KEY)
                .long(ARG_CLERK_SECRET_KEY)
                .help("Clerk secret key used for Backend API calls")
                .env("SHIPSMIND_CLERK_SECRET_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_CLERK_API_URL)
                .long(ARG_CLERK_API_URL)
                .help("Clerk Backend API base URL")
                .env("SHIPSMIND_CLERK_API_URL")
                .default_value(DEFAULT_API_URL),
        )
        .arg(
            Arg::new(ARG_CLERK_JWKS_URL)
                .long(ARG_CLERK_JWKS_URL)
                .help("JWKS URL for session token verification (default: <clerk-api-url>/v1/jwks)")
                .env("SHIPSMIND_CLERK_JWKS_URL"),
        )
        .arg(
            Arg::new(ARG_CLERK_ISSUER)
                .long(ARG_CLERK_ISSUER)
                .help("Expected `iss` claim of session tokens (Clerk frontend API URL)")
                .env("SHIPSMIND_CLERK_ISSUER"),
        )
}
