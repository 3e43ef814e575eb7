use serde::{Deserialize, Serialize};

use super::domain::{User, UserId};
use crate::error::RepositoryError;

/// Stored account: public identity plus the salted password digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
    pub salt: String,
}

/// Storage abstraction for accounts. `insert` must reject a duplicate email
/// with [`RepositoryError::Conflict`].
pub trait UserRepository: Send + Sync {
    fn insert(&self, record: UserRecord) -> Result<UserRecord, RepositoryError>;
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;
    fn fetch(&self, id: &UserId) -> Result<Option<UserRecord>, RepositoryError>;
}
