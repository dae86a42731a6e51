//! Status change request HTTP handlers.
//!
//! ```text
//! POST /api/v1/issues/{id}/status-requests
//! GET  /api/v1/status-requests
//! PUT  /api/v1/status-requests/{id}
//! ```

use actix_web::{HttpRequest, HttpResponse, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::issue::IssueId;
use crate::domain::ports::{
    PendingRequestFilter, RequestChangeRequest, ReviewRequest, StatusRequestListing,
};
use crate::domain::status_request::{
    ReviewAction, ReviewState, StatusRequest, StatusRequestId,
};
use crate::domain::{Error, IssueStatus};
use crate::inbound::http::auth::require_principal;
use crate::inbound::http::error::{ApiError, ApiResult};
use crate::inbound::http::issues::{missing_field_error, parse_status};
use crate::inbound::http::state::HttpState;

/// Request payload for proposing a status change.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestChangeBody {
    /// Status string the requester wants applied.
    pub requested_status: Option<String>,
    /// Optional justification.
    pub reason: Option<String>,
}

/// Request payload for reviewing a proposal.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewBody {
    /// `approve` or `reject`.
    pub action: Option<String>,
    /// Optional note shown to the requester.
    pub comment: Option<String>,
}

/// Query parameters for the moderation list view.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListRequestsParams {
    /// Substring matched against requester username and issue title.
    pub search: Option<String>,
    /// Review state to list; defaults to pending.
    pub state: Option<String>,
}

/// Status request payload.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequestResponse {
    /// Request identifier.
    pub id: Uuid,
    /// Targeted issue.
    pub issue_id: Uuid,
    /// Proposing account.
    pub requester_id: Uuid,
    /// Issue status snapshotted at request time.
    pub current_status: IssueStatus,
    /// Requested status.
    pub requested_status: IssueStatus,
    /// Optional justification.
    pub reason: Option<String>,
    /// Review state.
    pub state: ReviewState,
    /// Reviewing administrator.
    pub reviewer_id: Option<Uuid>,
    /// Reviewer note.
    pub review_comment: Option<String>,
    /// When the review happened.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<StatusRequest> for StatusRequestResponse {
    fn from(request: StatusRequest) -> Self {
        Self {
            id: *request.id.as_uuid(),
            issue_id: *request.issue_id.as_uuid(),
            requester_id: *request.requester_id.as_uuid(),
            current_status: request.current_status,
            requested_status: request.requested_status,
            reason: request.reason,
            state: request.state,
            reviewer_id: request.reviewer_id.map(|id| *id.as_uuid()),
            review_comment: request.review_comment,
            reviewed_at: request.reviewed_at,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

/// Status request payload with moderation display columns.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequestListingResponse {
    /// The request itself.
    #[serde(flatten)]
    pub request: StatusRequestResponse,
    /// Title of the targeted issue.
    pub issue_title: String,
    /// Username of the requester.
    pub requester_username: String,
}

impl From<StatusRequestListing> for StatusRequestListingResponse {
    fn from(listing: StatusRequestListing) -> Self {
        Self {
            request: StatusRequestResponse::from(listing.request),
            issue_title: listing.issue_title,
            requester_username: listing.requester_username,
        }
    }
}

fn parse_action(value: &str) -> Result<ReviewAction, Error> {
    match value {
        "approve" => Ok(ReviewAction::Approve),
        "reject" => Ok(ReviewAction::Reject),
        other => Err(Error::invalid_request("action must be approve or reject")
            .with_details(json!({ "field": "action", "value": other }))),
    }
}

fn parse_review_state(value: &str) -> Result<ReviewState, Error> {
    value.parse().map_err(|_| {
        Error::invalid_request("state must be pending, approved, or rejected")
            .with_details(json!({ "field": "state", "value": value }))
    })
}

/// Propose a status change for an issue.
#[utoipa::path(
    post,
    path = "/api/v1/issues/{id}/status-requests",
    params(("id" = Uuid, Path, description = "Issue identifier")),
    request_body = RequestChangeBody,
    responses(
        (status = 201, description = "Proposal filed", body = StatusRequestResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorised", body = ApiError),
        (status = 404, description = "Issue not found", body = ApiError)
    ),
    tags = ["status-requests"],
    operation_id = "requestStatusChange"
)]
#[post("/issues/{id}/status-requests")]
pub async fn request_status_change(
    state: web::Data<HttpState>,
    request: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<RequestChangeBody>,
) -> ApiResult<HttpResponse> {
    let principal = require_principal(state.verifier.as_ref(), &request).await?;
    let issue_id = IssueId::from_uuid(path.into_inner());
    let body = payload.into_inner();
    let requested_status = body
        .requested_status
        .as_deref()
        .ok_or_else(|| missing_field_error("requestedStatus"))
        .and_then(parse_status)?;

    let proposal = state
        .status_requests
        .request_change(RequestChangeRequest {
            issue_id,
            principal,
            requested_status,
            reason: body.reason,
        })
        .await?;
    Ok(HttpResponse::Created().json(StatusRequestResponse::from(proposal)))
}

/// Review a pending proposal. Administrator-only.
#[utoipa::path(
    put,
    path = "/api/v1/status-requests/{id}",
    params(("id" = Uuid, Path, description = "Status request identifier")),
    request_body = ReviewBody,
    responses(
        (status = 200, description = "Reviewed proposal", body = StatusRequestResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorised", body = ApiError),
        (status = 403, description = "Forbidden", body = ApiError),
        (status = 404, description = "Request not found", body = ApiError),
        (status = 409, description = "Already reviewed", body = ApiError)
    ),
    tags = ["status-requests"],
    operation_id = "reviewStatusRequest"
)]
#[put("/status-requests/{id}")]
pub async fn review_status_request(
    state: web::Data<HttpState>,
    request: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<ReviewBody>,
) -> ApiResult<web::Json<StatusRequestResponse>> {
    let principal = require_principal(state.verifier.as_ref(), &request).await?;
    let request_id = StatusRequestId::from_uuid(path.into_inner());
    let body = payload.into_inner();
    let action = body
        .action
        .as_deref()
        .ok_or_else(|| missing_field_error("action"))
        .and_then(parse_action)?;

    let reviewed = state
        .status_requests
        .review(ReviewRequest {
            request_id,
            principal,
            action,
            comment: body.comment,
        })
        .await?;
    Ok(web::Json(StatusRequestResponse::from(reviewed)))
}

/// List proposals for the moderation view, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/status-requests",
    params(ListRequestsParams),
    responses(
        (status = 200, description = "Proposals", body = [StatusRequestListingResponse]),
        (status = 401, description = "Unauthorised", body = ApiError),
        (status = 403, description = "Forbidden", body = ApiError)
    ),
    tags = ["status-requests"],
    operation_id = "listStatusRequests"
)]
#[get("/status-requests")]
pub async fn list_status_requests(
    state: web::Data<HttpState>,
    request: HttpRequest,
    params: web::Query<ListRequestsParams>,
) -> ApiResult<web::Json<Vec<StatusRequestListingResponse>>> {
    let principal = require_principal(state.verifier.as_ref(), &request).await?;
    if !principal.is_admin() {
        return Err(ApiError::from(Error::forbidden(
            "only administrators may list status requests",
        )));
    }
    let params = params.into_inner();
    let filter = PendingRequestFilter {
        search: params.search,
        state: params
            .state
            .as_deref()
            .map(parse_review_state)
            .transpose()?,
    };

    let listings = state.status_requests.list_requests(&filter).await?;
    Ok(web::Json(
        listings
            .into_iter()
            .map(StatusRequestListingResponse::from)
            .collect(),
    ))
}
