use std::sync::{Arc, PoisonError, RwLock};

use crate::auth::{AuthSession, User};

/// Source of the bearer token, read at the moment each request is sent.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;

    /// Called after a request sent with `rejected` came back 401 and the
    /// client is configured to drop the session. A token issued since then
    /// must survive.
    fn invalidate(&self, _rejected: &str) {}
}

/// Explicit holder for the signed-in user and their token.
///
/// Clones share state, so a logout through one handle is seen by every
/// request layer holding another.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<AuthSession>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_auth(&self, session: AuthSession) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(session);
    }

    pub fn clear_auth(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl TokenProvider for SessionStore {
    fn token(&self) -> Option<String> {
        SessionStore::token(self)
    }

    fn invalidate(&self, rejected: &str) {
        let mut current = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if current
            .as_ref()
            .is_some_and(|session| session.token == rejected)
        {
            *current = None;
        }
    }
}

/// Adapter turning a closure into a [`TokenProvider`].
pub struct FnTokenProvider<F>(F);

impl<F> TokenProvider for FnTokenProvider<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        (self.0)()
    }
}

pub fn token_fn<F>(provider: F) -> FnTokenProvider<F>
where
    F: Fn() -> Option<String> + Send + Sync,
{
    FnTokenProvider(provider)
}
