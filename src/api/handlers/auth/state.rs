//! Auth state and configuration shared by the guard and the auth handlers.

use chrono::Duration;
use url::Url;

use crate::api::guard::RouteRules;
use crate::identity::IdentityHandle;

pub const DEFAULT_SESSION_EXPIRY_WARNING_SECONDS: i64 = 5 * 60;

/// Upper bound for the warning threshold: one day.
pub const MAX_SESSION_EXPIRY_WARNING_SECONDS: i64 = 24 * 60 * 60;

pub const DEFAULT_SENSITIVE_FEATURES: &[&str] = &[
    "Data export",
    "Payment processing",
    "Administrative functions",
];

#[derive(Clone, Debug)]
pub struct AuthConfig {
    app_base_url: Url,
    session_expiry_warning_seconds: i64,
    sensitive_features: Vec<String>,
}

impl AuthConfig {
    #[must_use]
    pub fn new(app_base_url: Url) -> Self {
        Self {
            app_base_url,
            session_expiry_warning_seconds: DEFAULT_SESSION_EXPIRY_WARNING_SECONDS,
            sensitive_features: DEFAULT_SENSITIVE_FEATURES
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }

    /// Clamped to `0..=MAX_SESSION_EXPIRY_WARNING_SECONDS`.
    #[must_use]
    pub fn with_session_expiry_warning_seconds(mut self, seconds: i64) -> Self {
        self.session_expiry_warning_seconds =
            seconds.clamp(0, MAX_SESSION_EXPIRY_WARNING_SECONDS);
        self
    }

    #[must_use]
    pub fn with_sensitive_features(mut self, features: Vec<String>) -> Self {
        self.sensitive_features = features;
        self
    }

    #[must_use]
    pub fn app_base_url(&self) -> &Url {
        &self.app_base_url
    }

    #[must_use]
    pub fn session_expiry_warning(&self) -> Duration {
        Duration::try_seconds(self.session_expiry_warning_seconds).unwrap_or_else(Duration::zero)
    }

    #[must_use]
    pub fn sensitive_features(&self) -> &[String] {
        &self.sensitive_features
    }
}

pub struct AuthState {
    config: AuthConfig,
    identity: IdentityHandle,
    rules: RouteRules,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, identity: IdentityHandle, rules: RouteRules) -> Self {
        Self {
            config,
            identity,
            rules,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn identity(&self) -> &IdentityHandle {
        &self.identity
    }

    #[must_use]
    pub fn rules(&self) -> &RouteRules {
        &self.rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AuthConfig::new(Url::parse("http://localhost:3000").unwrap());
        assert_eq!(config.session_expiry_warning(), Duration::minutes(5));
        assert_eq!(config.sensitive_features().len(), 3);
        assert_eq!(config.sensitive_features()[0], "Data export");
    }

    #[test]
    fn builder_overrides() {
        let config = AuthConfig::new(Url::parse("https://shipsmind.com").unwrap())
            .with_session_expiry_warning_seconds(60)
            .with_sensitive_features(vec!["Exports".to_string()]);
        assert_eq!(config.session_expiry_warning(), Duration::seconds(60));
        assert_eq!(config.sensitive_features(), ["Exports".to_string()]);
        assert_eq!(config.app_base_url().as_str(), "https://shipsmind.com/");
    }

    #[test]
    fn expiry_warning_is_clamped() {
        let base = Url::parse("http://localhost:3000").unwrap();
        let config = AuthConfig::new(base.clone())
            .with_session_expiry_warning_seconds(10_000_000_000_000_000);
        assert_eq!(
            config.session_expiry_warning(),
            Duration::seconds(MAX_SESSION_EXPIRY_WARNING_SECONDS)
        );

        let config = AuthConfig::new(base).with_session_expiry_warning_seconds(-1);
        assert_eq!(config.session_expiry_warning(), Duration::zero());
    }
}
