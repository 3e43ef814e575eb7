//! Account registration, login, and bearer-token authentication for the API.

pub mod domain;
pub mod repository;
pub mod router;
pub mod service;

pub use domain::{AuthSession, Credentials, Registration, User, UserId};
pub use repository::{UserRecord, UserRepository};
pub use router::{auth_router, bearer_token};
pub use service::{AuthError, AuthService, MIN_PASSWORD_LENGTH};
