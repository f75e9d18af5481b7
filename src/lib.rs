//! # ShipsMind site API
//!
//! `shipsmind` is the thin authenticated layer behind the ShipsMind marketing
//! site. Identity, session issuance and password handling belong to Clerk; this
//! crate only reads session snapshots, gates sensitive features on email
//! verification and stores one preferences row per user in Postgres.
//!
//! ## Request flow
//!
//! 1. The route guard classifies the path (public, protected, sensitive) and
//!    either passes the request through or redirects/rejects it.
//! 2. Handlers resolve the caller from the Clerk session token
//!    (`Authorization: Bearer` or the `__session` cookie).
//! 3. Session, user and preferences lookups go through the injected
//!    [`identity::IdentityProvider`] and [`preferences::PreferencesStore`].
//! 4. Pure helpers in [`sanitize`] and [`password`] shape the JSON reply.
//!
//! Every error reaches the client as `{"error": "..."}` with the matching
//! status code; internal detail is only logged.

pub mod api;
pub mod cli;
pub mod identity;
pub mod password;
pub mod preferences;
pub mod sanitize;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
