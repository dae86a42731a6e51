//! Abuse flag HTTP handlers.
//!
//! ```text
//! POST /api/v1/issues/{id}/flags
//! GET  /api/v1/issues/{id}/flags
//! PUT  /api/v1/flags/{id}/resolve
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Flag;
use crate::domain::flag::FlagId;
use crate::domain::issue::IssueId;
use crate::domain::ports::FlagIssueRequest;
use crate::inbound::http::auth::require_principal;
use crate::inbound::http::error::{ApiError, ApiResult};
use crate::inbound::http::issues::missing_field_error;
use crate::inbound::http::state::HttpState;

/// Request payload for flagging an issue.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlagIssueBody {
    /// Why the issue is being flagged.
    pub reason: Option<String>,
}

/// Flag payload returned to moderators and flaggers.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlagResponse {
    /// Flag identifier.
    pub id: Uuid,
    /// Flagged issue.
    pub issue_id: Uuid,
    /// Account that raised the flag.
    pub flagger_id: Uuid,
    /// Why the issue was flagged.
    pub reason: String,
    /// Whether a moderator has handled the flag.
    pub resolved: bool,
    /// When the flag was handled.
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the flag was raised.
    pub created_at: DateTime<Utc>,
}

impl From<Flag> for FlagResponse {
    fn from(flag: Flag) -> Self {
        Self {
            id: *flag.id.as_uuid(),
            issue_id: *flag.issue_id.as_uuid(),
            flagger_id: *flag.flagger_id.as_uuid(),
            reason: flag.reason,
            resolved: flag.resolved,
            resolved_at: flag.resolved_at,
            created_at: flag.created_at,
        }
    }
}

/// Flag an issue for moderator attention.
#[utoipa::path(
    post,
    path = "/api/v1/issues/{id}/flags",
    params(("id" = Uuid, Path, description = "Issue identifier")),
    request_body = FlagIssueBody,
    responses(
        (status = 201, description = "Flag created", body = FlagResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorised", body = ApiError),
        (status = 404, description = "Issue not found", body = ApiError),
        (status = 409, description = "Already flagged", body = ApiError)
    ),
    tags = ["flags"],
    operation_id = "flagIssue"
)]
#[post("/issues/{id}/flags")]
pub async fn flag_issue(
    state: web::Data<HttpState>,
    request: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<FlagIssueBody>,
) -> ApiResult<HttpResponse> {
    let principal = require_principal(state.verifier.as_ref(), &request).await?;
    let issue_id = IssueId::from_uuid(path.into_inner());
    let reason = payload
        .into_inner()
        .reason
        .ok_or_else(|| missing_field_error("reason"))?;

    let flag = state
        .moderation
        .flag_issue(FlagIssueRequest {
            issue_id,
            principal,
            reason,
        })
        .await?;
    Ok(HttpResponse::Created().json(FlagResponse::from(flag)))
}

/// Unresolved flags for an issue, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/issues/{id}/flags",
    params(("id" = Uuid, Path, description = "Issue identifier")),
    responses(
        (status = 200, description = "Unresolved flags", body = [FlagResponse]),
        (status = 401, description = "Unauthorised", body = ApiError)
    ),
    tags = ["flags"],
    operation_id = "listUnresolvedFlags"
)]
#[get("/issues/{id}/flags")]
pub async fn list_unresolved_flags(
    state: web::Data<HttpState>,
    request: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<Vec<FlagResponse>>> {
    require_principal(state.verifier.as_ref(), &request).await?;
    let issue_id = IssueId::from_uuid(path.into_inner());

    let flags = state.moderation.unresolved_flags(&issue_id).await?;
    Ok(web::Json(
        flags.into_iter().map(FlagResponse::from).collect(),
    ))
}

/// Mark a flag handled. Administrator-only.
#[utoipa::path(
    put,
    path = "/api/v1/flags/{id}/resolve",
    params(("id" = Uuid, Path, description = "Flag identifier")),
    responses(
        (status = 200, description = "Resolved flag", body = FlagResponse),
        (status = 401, description = "Unauthorised", body = ApiError),
        (status = 403, description = "Forbidden", body = ApiError),
        (status = 404, description = "Flag not found", body = ApiError)
    ),
    tags = ["flags"],
    operation_id = "resolveFlag"
)]
#[put("/flags/{id}/resolve")]
pub async fn resolve_flag(
    state: web::Data<HttpState>,
    request: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<FlagResponse>> {
    let principal = require_principal(state.verifier.as_ref(), &request).await?;
    let flag_id = FlagId::from_uuid(path.into_inner());

    let flag = state.moderation.resolve_flag(&flag_id, &principal).await?;
    Ok(web::Json(FlagResponse::from(flag)))
}
