use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::domain::{normalize_email, AuthSession, Credentials, Registration, User, UserId};
use super::repository::{UserRecord, UserRepository};
use crate::error::{ApiError, RepositoryError};

pub const MIN_PASSWORD_LENGTH: usize = 8;

static USER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_user_id() -> UserId {
    let id = USER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    UserId(format!("usr-{id:06}"))
}

/// Issues and verifies bearer tokens for registered accounts.
///
/// Tokens live in memory only; restarting the service signs everyone out.
/// They carry no expiry: an entry is removed only by `logout`, so the map
/// grows with every login that is never followed by one.
pub struct AuthService<U> {
    users: Arc<U>,
    tokens: RwLock<HashMap<String, UserId>>,
}

impl<U> AuthService<U>
where
    U: UserRepository + 'static,
{
    pub fn new(users: Arc<U>) -> Self {
        Self {
            users,
            tokens: RwLock::new(HashMap::new()),
        }
    }

    pub fn register(&self, registration: Registration) -> Result<AuthSession, AuthError> {
        let name = registration.name.trim().to_string();
        let email = normalize_email(&registration.email);

        if name.is_empty() {
            return Err(AuthError::InvalidRegistration("name is required".to_string()));
        }
        if !is_plausible_email(&email) {
            return Err(AuthError::InvalidRegistration(
                "a valid email address is required".to_string(),
            ));
        }
        if registration.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::InvalidRegistration(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let salt = generate_salt();
        let record = UserRecord {
            user: User {
                id: next_user_id(),
                name,
                email,
            },
            password_hash: hash_password(&salt, &registration.password),
            salt,
        };

        let stored = self.users.insert(record).map_err(|err| match err {
            RepositoryError::Conflict => AuthError::EmailTaken,
            other => AuthError::Repository(other),
        })?;

        info!(user_id = %stored.user.id.0, "account registered");
        Ok(self.open_session(stored.user))
    }

    pub fn login(&self, credentials: Credentials) -> Result<AuthSession, AuthError> {
        let email = normalize_email(&credentials.email);
        let record = self
            .users
            .find_by_email(&email)?
            .ok_or(AuthError::InvalidCredentials)?;

        if hash_password(&record.salt, &credentials.password) != record.password_hash {
            debug!(user_id = %record.user.id.0, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(self.open_session(record.user))
    }

    /// Resolves a bearer token to the account that owns it.
    pub fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let user_id = self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(token)
            .cloned()
            .ok_or(AuthError::InvalidToken)?;

        let record = self
            .users
            .fetch(&user_id)?
            .ok_or(AuthError::InvalidToken)?;
        Ok(record.user)
    }

    /// Revokes a token. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) {
        let removed = self
            .tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(token);
        if let Some(user_id) = removed {
            debug!(user_id = %user_id.0, "token revoked");
        }
    }

    fn open_session(&self, user: User) -> AuthSession {
        let token = uuid::Uuid::new_v4().simple().to_string();
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token.clone(), user.id.clone());
        AuthSession { user, token }
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

fn generate_salt() -> String {
    let bytes: [u8; 16] = rand::random();
    hex::encode(bytes)
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Error raised by the auth service.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid registration: {0}")]
    InvalidRegistration(String),
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("missing or invalid bearer token")]
    InvalidToken,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<AuthError> for ApiError {
    fn from(value: AuthError) -> Self {
        match value {
            AuthError::InvalidRegistration(_) => {
                ApiError::validation("invalid_registration", value.to_string())
            }
            AuthError::EmailTaken => ApiError::conflict("email_taken", value.to_string()),
            AuthError::InvalidCredentials | AuthError::InvalidToken => {
                ApiError::unauthorized(value.to_string())
            }
            AuthError::Repository(err) => err.into(),
        }
    }
}
