//! Authenticated endpoints backed by Clerk sessions.

pub mod preferences;
pub mod principal;
pub mod session;
pub mod state;
pub mod types;
pub mod verification;

pub use state::{AuthConfig, AuthState};
