//! Driving port for account registration and lookup.

use async_trait::async_trait;

use crate::domain::error::Error;
use crate::domain::user::{Role, User, UserId};

/// Request to register a new account.
///
/// The credential arrives already derived; hashing belongs to the
/// (external) authentication layer.
#[derive(Debug, Clone)]
pub struct RegisterUserRequest {
    /// Requested unique handle.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Opaque derived credential.
    pub password_hash: String,
    /// Role granted at registration.
    pub role: Role,
}

/// Driving port for account registration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRegistry: Send + Sync {
    /// Register a new account. Fails with `Conflict` when the username
    /// or email is already taken.
    async fn register(&self, request: RegisterUserRequest) -> Result<User, Error>;

    /// Fetch an account by identifier.
    async fn get_user(&self, user_id: &UserId) -> Result<User, Error>;
}
