//! Issue HTTP handlers.
//!
//! ```text
//! POST   /api/v1/issues
//! GET    /api/v1/issues/nearby
//! GET    /api/v1/issues/{id}
//! PUT    /api/v1/issues/{id}
//! DELETE /api/v1/issues/{id}
//! ```

use std::str::FromStr;

use actix_web::{HttpRequest, HttpResponse, delete, get, post, put, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::issue::{IssueCategory, IssueId, IssuePatch, IssueStatus};
use crate::domain::ports::{
    CreateIssueRequest, IssueDetail, NearbyQuery, UpdateIssueRequest,
};
use crate::domain::{Error, Issue, StatusLog};
use crate::inbound::http::auth::require_principal;
use crate::inbound::http::error::ApiResult;
use crate::inbound::http::state::HttpState;

/// Request payload for reporting an issue.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueBody {
    /// Short summary of the problem.
    pub title: Option<String>,
    /// Full description of the problem.
    pub description: Option<String>,
    /// Category string (road, water, electricity, waste, safety, other).
    pub category: Option<String>,
    /// Degrees north.
    pub latitude: Option<f64>,
    /// Degrees east.
    pub longitude: Option<f64>,
    /// Optional human-readable address.
    pub address: Option<String>,
    /// Opaque photo references.
    pub photos: Option<Vec<String>>,
}

/// Request payload for updating an issue.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateIssueBody {
    /// Replacement title.
    pub title: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement category string.
    pub category: Option<String>,
    /// Replacement latitude (requires `longitude`).
    pub latitude: Option<f64>,
    /// Replacement longitude (requires `latitude`).
    pub longitude: Option<f64>,
    /// Replacement address.
    pub address: Option<String>,
    /// Photo references appended to the existing list.
    pub photos: Option<Vec<String>>,
    /// Target status string; equal-to-current is accepted and ignored.
    pub status: Option<String>,
    /// Note attached to the status transition, if one happens.
    pub comment: Option<String>,
}

/// Query parameters for the nearby search.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct NearbyParams {
    /// Degrees north of the search centre.
    pub latitude: Option<f64>,
    /// Degrees east of the search centre.
    pub longitude: Option<f64>,
    /// Search radius in kilometres.
    pub radius: Option<f64>,
}

/// Location payload returned with an issue.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    /// Location identifier.
    pub id: Uuid,
    /// Degrees north.
    pub latitude: f64,
    /// Degrees east.
    pub longitude: f64,
    /// Optional human-readable address.
    pub address: Option<String>,
}

/// Issue payload returned by list endpoints.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    /// Issue identifier.
    pub id: IssueId,
    /// Short summary.
    pub title: String,
    /// Full description.
    pub description: String,
    /// Category.
    pub category: IssueCategory,
    /// Current lifecycle status.
    pub status: IssueStatus,
    /// Opaque photo references.
    pub photos: Vec<String>,
    /// Reporting account.
    pub reporter_id: Uuid,
    /// Owned location.
    pub location: LocationResponse,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<Issue> for IssueResponse {
    fn from(issue: Issue) -> Self {
        Self {
            id: issue.id,
            title: issue.title,
            description: issue.description,
            category: issue.category,
            status: issue.status,
            photos: issue.photos,
            reporter_id: *issue.reporter_id.as_uuid(),
            location: LocationResponse {
                id: *issue.location.id.as_uuid(),
                latitude: issue.location.coordinates.latitude,
                longitude: issue.location.coordinates.longitude,
                address: issue.location.address,
            },
            created_at: issue.created_at,
            updated_at: issue.updated_at,
        }
    }
}

/// Audit entry payload returned with an issue.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusLogResponse {
    /// Entry identifier.
    pub id: Uuid,
    /// Account that performed the transition.
    pub actor_id: Uuid,
    /// Status before the transition; absent on the creation entry.
    pub old_status: Option<IssueStatus>,
    /// Status after the transition.
    pub new_status: IssueStatus,
    /// Free-text note.
    pub comment: Option<String>,
    /// When the transition happened.
    pub created_at: DateTime<Utc>,
}

impl From<StatusLog> for StatusLogResponse {
    fn from(log: StatusLog) -> Self {
        Self {
            id: *log.id.as_uuid(),
            actor_id: *log.actor_id.as_uuid(),
            old_status: log.old_status,
            new_status: log.new_status,
            comment: log.comment,
            created_at: log.created_at,
        }
    }
}

/// Issue payload with its audit trail, newest entry first.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueDetailResponse {
    /// The issue itself.
    #[serde(flatten)]
    pub issue: IssueResponse,
    /// Audit trail, newest first.
    pub logs: Vec<StatusLogResponse>,
}

impl From<IssueDetail> for IssueDetailResponse {
    fn from(detail: IssueDetail) -> Self {
        Self {
            issue: IssueResponse::from(detail.issue),
            logs: detail
                .logs
                .into_iter()
                .map(StatusLogResponse::from)
                .collect(),
        }
    }
}

pub(crate) fn missing_field_error(field: &str) -> Error {
    Error::invalid_request(format!("{field} is required"))
        .with_details(json!({ "field": field }))
}

pub(crate) fn parse_category(value: &str) -> Result<IssueCategory, Error> {
    IssueCategory::from_str(value).map_err(|_| {
        Error::invalid_request("category must be road, water, electricity, waste, safety, or other")
            .with_details(json!({ "field": "category", "value": value }))
    })
}

pub(crate) fn parse_status(value: &str) -> Result<IssueStatus, Error> {
    IssueStatus::from_str(value).map_err(|_| {
        Error::invalid_request(
            "status must be reported, under_review, in_progress, resolved, or closed",
        )
        .with_details(json!({ "field": "status", "value": value }))
    })
}

fn parse_create_body(
    body: CreateIssueBody,
) -> Result<(String, String, IssueCategory, f64, f64, Option<String>, Vec<String>), Error> {
    let title = body.title.ok_or_else(|| missing_field_error("title"))?;
    let description = body
        .description
        .ok_or_else(|| missing_field_error("description"))?;
    let category = body
        .category
        .ok_or_else(|| missing_field_error("category"))?;
    let latitude = body.latitude.ok_or_else(|| missing_field_error("latitude"))?;
    let longitude = body
        .longitude
        .ok_or_else(|| missing_field_error("longitude"))?;

    Ok((
        title,
        description,
        parse_category(&category)?,
        latitude,
        longitude,
        body.address,
        body.photos.unwrap_or_default(),
    ))
}

fn parse_update_body(body: UpdateIssueBody) -> Result<(IssuePatch, Option<IssueStatus>, Option<String>), Error> {
    let coordinates = match (body.latitude, body.longitude) {
        (Some(latitude), Some(longitude)) => {
            // Range validation happens in the domain service.
            Some(crate::domain::Coordinates {
                latitude,
                longitude,
            })
        }
        (None, None) => None,
        _ => {
            return Err(Error::invalid_request(
                "latitude and longitude must be supplied together",
            )
            .with_details(json!({ "field": "latitude/longitude" })));
        }
    };

    let patch = IssuePatch {
        title: body.title,
        description: body.description,
        category: body.category.as_deref().map(parse_category).transpose()?,
        coordinates,
        address: body.address,
        appended_photos: body.photos.unwrap_or_default(),
    };
    let new_status = body.status.as_deref().map(parse_status).transpose()?;
    Ok((patch, new_status, body.comment))
}

/// Report a new issue.
#[utoipa::path(
    post,
    path = "/api/v1/issues",
    request_body = CreateIssueBody,
    responses(
        (status = 201, description = "Issue created", body = IssueDetailResponse),
        (status = 400, description = "Invalid request", body = crate::inbound::http::error::ApiError),
        (status = 401, description = "Unauthorised", body = crate::inbound::http::error::ApiError)
    ),
    tags = ["issues"],
    operation_id = "createIssue"
)]
#[post("/issues")]
pub async fn create_issue(
    state: web::Data<HttpState>,
    request: HttpRequest,
    payload: web::Json<CreateIssueBody>,
) -> ApiResult<HttpResponse> {
    let principal = require_principal(state.verifier.as_ref(), &request).await?;
    let (title, description, category, latitude, longitude, address, photos) =
        parse_create_body(payload.into_inner())?;

    let detail = state
        .lifecycle
        .create_issue(CreateIssueRequest {
            principal,
            title,
            description,
            category,
            latitude,
            longitude,
            address,
            photos,
        })
        .await?;
    Ok(HttpResponse::Created().json(IssueDetailResponse::from(detail)))
}

/// Fetch an issue with its audit trail.
#[utoipa::path(
    get,
    path = "/api/v1/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue identifier")),
    responses(
        (status = 200, description = "Issue with audit trail", body = IssueDetailResponse),
        (status = 404, description = "Not found", body = crate::inbound::http::error::ApiError)
    ),
    tags = ["issues"],
    operation_id = "getIssue"
)]
#[get("/issues/{id}")]
pub async fn get_issue(
    state: web::Data<HttpState>,
    path: web::Path<Uuid>,
) -> ApiResult<web::Json<IssueDetailResponse>> {
    let issue_id = IssueId::from_uuid(path.into_inner());
    let detail = state.lifecycle.get_issue(&issue_id).await?;
    Ok(web::Json(IssueDetailResponse::from(detail)))
}

/// Update an issue's fields and, optionally, its status.
#[utoipa::path(
    put,
    path = "/api/v1/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue identifier")),
    request_body = UpdateIssueBody,
    responses(
        (status = 200, description = "Updated issue", body = IssueDetailResponse),
        (status = 400, description = "Invalid request", body = crate::inbound::http::error::ApiError),
        (status = 401, description = "Unauthorised", body = crate::inbound::http::error::ApiError),
        (status = 403, description = "Forbidden", body = crate::inbound::http::error::ApiError),
        (status = 404, description = "Not found", body = crate::inbound::http::error::ApiError),
        (status = 409, description = "Concurrent status change", body = crate::inbound::http::error::ApiError)
    ),
    tags = ["issues"],
    operation_id = "updateIssue"
)]
#[put("/issues/{id}")]
pub async fn update_issue(
    state: web::Data<HttpState>,
    request: HttpRequest,
    path: web::Path<Uuid>,
    payload: web::Json<UpdateIssueBody>,
) -> ApiResult<web::Json<IssueDetailResponse>> {
    let principal = require_principal(state.verifier.as_ref(), &request).await?;
    let issue_id = IssueId::from_uuid(path.into_inner());
    let (patch, new_status, status_comment) = parse_update_body(payload.into_inner())?;

    let detail = state
        .lifecycle
        .update_issue(UpdateIssueRequest {
            issue_id,
            principal,
            patch,
            new_status,
            status_comment,
        })
        .await?;
    Ok(web::Json(IssueDetailResponse::from(detail)))
}

/// Delete an issue and everything it owns.
#[utoipa::path(
    delete,
    path = "/api/v1/issues/{id}",
    params(("id" = Uuid, Path, description = "Issue identifier")),
    responses(
        (status = 204, description = "Issue deleted"),
        (status = 401, description = "Unauthorised", body = crate::inbound::http::error::ApiError),
        (status = 403, description = "Forbidden", body = crate::inbound::http::error::ApiError),
        (status = 404, description = "Not found", body = crate::inbound::http::error::ApiError)
    ),
    tags = ["issues"],
    operation_id = "deleteIssue"
)]
#[delete("/issues/{id}")]
pub async fn delete_issue(
    state: web::Data<HttpState>,
    request: HttpRequest,
    path: web::Path<Uuid>,
) -> ApiResult<HttpResponse> {
    let principal = require_principal(state.verifier.as_ref(), &request).await?;
    let issue_id = IssueId::from_uuid(path.into_inner());

    state.lifecycle.delete_issue(&issue_id, &principal).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Issues within a radius of a point, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/issues/nearby",
    params(NearbyParams),
    responses(
        (status = 200, description = "Issues inside the radius", body = [IssueResponse]),
        (status = 400, description = "Invalid request", body = crate::inbound::http::error::ApiError)
    ),
    tags = ["issues"],
    operation_id = "findNearbyIssues"
)]
#[get("/issues/nearby")]
pub async fn nearby_issues(
    state: web::Data<HttpState>,
    params: web::Query<NearbyParams>,
) -> ApiResult<web::Json<Vec<IssueResponse>>> {
    let params = params.into_inner();
    let latitude = params
        .latitude
        .ok_or_else(|| missing_field_error("latitude"))?;
    let longitude = params
        .longitude
        .ok_or_else(|| missing_field_error("longitude"))?;
    let radius_km = params.radius.ok_or_else(|| missing_field_error("radius"))?;

    let issues = state
        .nearby
        .find_near(NearbyQuery {
            latitude,
            longitude,
            radius_km,
        })
        .await?;
    Ok(web::Json(
        issues.into_iter().map(IssueResponse::from).collect(),
    ))
}
