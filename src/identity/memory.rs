use super::{AuthenticatedSession, IdentityProvider, ProviderError, Session, User};
use async_trait::async_trait;
use std::collections::HashMap;

/// Fixed tokens, sessions and users held in memory.
///
/// Used by the integration tests and for local development without a
/// Clerk instance.
#[derive(Debug, Default, Clone)]
pub struct StaticIdentityProvider {
    tokens: HashMap<String, AuthenticatedSession>,
    sessions: HashMap<String, Session>,
    users: HashMap<String, User>,
}

impl StaticIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as a valid session token for `session`.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, session: &Session) -> Self {
        self.tokens.insert(
            token.into(),
            AuthenticatedSession {
                user_id: session.user_id.clone(),
                session_id: session.id.clone(),
            },
        );
        self
    }

    #[must_use]
    pub fn with_session(mut self, session: Session) -> Self {
        self.sessions.insert(session.id.clone(), session);
        self
    }

    #[must_use]
    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id.clone(), user);
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<Option<AuthenticatedSession>, ProviderError> {
        Ok(self.tokens.get(token).cloned())
    }

    async fn session(&self, session_id: &str) -> Result<Option<Session>, ProviderError> {
        Ok(self.sessions.get(session_id).cloned())
    }

    async fn user(&self, user_id: &str) -> Result<Option<User>, ProviderError> {
        Ok(self.users.get(user_id).cloned())
    }
}
