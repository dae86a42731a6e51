//! OpenAPI document aggregating handler paths and schemas.

use utoipa::OpenApi;

use crate::domain::{ErrorCode, IssueCategory, IssueId, IssueStatus, ReviewState, Role};
use crate::inbound::http::{error, flags, issues, status_requests, users};

/// Public OpenAPI surface used by Swagger UI and tooling.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Civic Issue Reporting API",
        description = "Citizens report civic issues; moderators manage their lifecycle."
    ),
    paths(
        issues::create_issue,
        issues::get_issue,
        issues::update_issue,
        issues::delete_issue,
        issues::nearby_issues,
        flags::flag_issue,
        flags::list_unresolved_flags,
        flags::resolve_flag,
        status_requests::request_status_change,
        status_requests::review_status_request,
        status_requests::list_status_requests,
        users::register_user,
    ),
    components(schemas(
        ErrorCode,
        IssueCategory,
        IssueId,
        IssueStatus,
        ReviewState,
        Role,
        error::ApiError,
        issues::CreateIssueBody,
        issues::UpdateIssueBody,
        issues::IssueResponse,
        issues::IssueDetailResponse,
        issues::LocationResponse,
        issues::StatusLogResponse,
        flags::FlagIssueBody,
        flags::FlagResponse,
        status_requests::RequestChangeBody,
        status_requests::ReviewBody,
        status_requests::StatusRequestResponse,
        status_requests::StatusRequestListingResponse,
        users::RegisterUserBody,
        users::UserResponse,
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use utoipa::OpenApi;

    use super::*;

    #[test]
    fn document_contains_every_endpoint() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/issues"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/issues/nearby"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/issues/{id}"));
        assert!(paths.iter().any(|p| p.as_str() == "/api/v1/status-requests"));
    }
}
