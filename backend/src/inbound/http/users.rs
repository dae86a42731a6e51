//! Account registration HTTP handlers.
//!
//! ```text
//! POST /api/v1/users
//! ```
//!
//! Registration is the one unauthenticated write: it creates the
//! account a bearer token will later identify. The credential arrives
//! already derived; hashing and session issuance belong to the
//! external authentication layer.

use actix_web::{HttpResponse, post, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::User;
use crate::domain::ports::RegisterUserRequest;
use crate::domain::user::Role;
use crate::inbound::http::error::{ApiError, ApiResult};
use crate::inbound::http::issues::missing_field_error;
use crate::inbound::http::state::HttpState;

/// Request payload for registering an account.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserBody {
    /// Requested unique handle.
    pub username: Option<String>,
    /// Contact address.
    pub email: Option<String>,
    /// Opaque derived credential.
    pub password_hash: Option<String>,
}

/// Account payload returned after registration. Never carries the
/// credential.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// Account identifier.
    pub id: Uuid,
    /// Unique handle.
    pub username: String,
    /// Contact address.
    pub email: String,
    /// Authorisation role.
    pub role: Role,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: *user.id.as_uuid(),
            username: user.username.into(),
            email: user.email.into(),
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Register a new citizen account.
///
/// Administrator accounts are provisioned out of band.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = RegisterUserBody,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 409, description = "Username or email taken", body = ApiError)
    ),
    tags = ["users"],
    operation_id = "registerUser"
)]
#[post("/users")]
pub async fn register_user(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterUserBody>,
) -> ApiResult<HttpResponse> {
    let body = payload.into_inner();
    let username = body
        .username
        .ok_or_else(|| missing_field_error("username"))?;
    let email = body.email.ok_or_else(|| missing_field_error("email"))?;
    let password_hash = body
        .password_hash
        .ok_or_else(|| missing_field_error("passwordHash"))?;

    let user = state
        .users
        .register(RegisterUserRequest {
            username,
            email,
            password_hash,
            role: Role::User,
        })
        .await?;
    Ok(HttpResponse::Created().json(UserResponse::from(user)))
}
