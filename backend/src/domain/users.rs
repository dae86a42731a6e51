//! Account registration and lookup service.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::debug;

use crate::domain::error::Error;
use crate::domain::ports::{
    RegisterUserRequest, UserRegistry, UserRepository, UserRepositoryError,
};
use crate::domain::user::{Email, User, UserId, Username};

/// User registry service backed by a [`UserRepository`].
#[derive(Clone)]
pub struct UserRegistryService<U> {
    users: Arc<U>,
    clock: Arc<dyn Clock>,
}

impl<U> UserRegistryService<U> {
    /// Create a new service over the given repository and clock.
    pub fn new(users: Arc<U>, clock: Arc<dyn Clock>) -> Self {
        Self { users, clock }
    }
}

fn map_repo_error(error: UserRepositoryError) -> Error {
    match error {
        UserRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserRepositoryError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserRepositoryError::DuplicateUsername => Error::conflict("username already taken"),
        UserRepositoryError::DuplicateEmail => Error::conflict("email already registered"),
        UserRepositoryError::NotFound => Error::not_found("user not found"),
    }
}

#[async_trait]
impl<U> UserRegistry for UserRegistryService<U>
where
    U: UserRepository,
{
    async fn register(&self, request: RegisterUserRequest) -> Result<User, Error> {
        let username = Username::new(request.username).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": "username" }))
        })?;
        let email = Email::new(request.email).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": "email" }))
        })?;
        if request.password_hash.is_empty() {
            return Err(Error::invalid_request("password credential must not be empty")
                .with_details(json!({ "field": "passwordHash" })));
        }

        let now = self.clock.utc();
        let user = User {
            id: UserId::random(),
            username,
            email,
            password_hash: request.password_hash,
            role: request.role,
            created_at: now,
            updated_at: now,
        };

        self.users.insert(&user).await.map_err(map_repo_error)?;
        debug!(user_id = %user.id, "user registered");
        Ok(user)
    }

    async fn get_user(&self, user_id: &UserId) -> Result<User, Error> {
        self.users
            .find_by_id(user_id)
            .await
            .map_err(map_repo_error)?
            .ok_or_else(|| Error::not_found("user not found"))
    }
}
