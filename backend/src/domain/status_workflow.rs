//! Citizen-proposed, administrator-reviewed status change workflow.
//!
//! A proposal snapshots the issue's status when filed and is reviewed at
//! most once. Approval hands the actual status change to the repository
//! so the review state and the issue transition commit together.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::debug;

use crate::domain::error::Error;
use crate::domain::ports::{
    IssueRepository, IssueRepositoryError, PendingRequestFilter, RequestChangeRequest,
    ReviewRecord, ReviewRequest, StatusRequestListing, StatusRequestRepository,
    StatusRequestRepositoryError, StatusRequestWorkflow,
};
use crate::domain::status_log::StatusLogId;
use crate::domain::status_request::{ReviewAction, ReviewState, StatusRequest, StatusRequestId};

/// Status request workflow service backed by request and issue
/// repositories.
#[derive(Clone)]
pub struct StatusRequestService<S, R> {
    requests: Arc<S>,
    issues: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<S, R> StatusRequestService<S, R> {
    /// Create a new service over the given repositories and clock.
    pub fn new(requests: Arc<S>, issues: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            requests,
            issues,
            clock,
        }
    }
}

fn map_request_repo_error(error: StatusRequestRepositoryError) -> Error {
    match error {
        StatusRequestRepositoryError::Connection { message } => Error::service_unavailable(
            format!("status request repository unavailable: {message}"),
        ),
        StatusRequestRepositoryError::Query { message } => {
            Error::internal(format!("status request repository error: {message}"))
        }
        StatusRequestRepositoryError::NotFound => Error::not_found("status request not found"),
        StatusRequestRepositoryError::IssueNotFound => Error::not_found("issue not found"),
        StatusRequestRepositoryError::AlreadyReviewed { state } => {
            Error::conflict(format!("status request already {state}"))
        }
    }
}

fn map_issue_repo_error(error: IssueRepositoryError) -> Error {
    match error {
        IssueRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("issue repository unavailable: {message}"))
        }
        IssueRepositoryError::NotFound => Error::not_found("issue not found"),
        other => Error::internal(format!("issue repository error: {other}")),
    }
}

#[async_trait]
impl<S, R> StatusRequestWorkflow for StatusRequestService<S, R>
where
    S: StatusRequestRepository,
    R: IssueRepository,
{
    async fn request_change(
        &self,
        request: RequestChangeRequest,
    ) -> Result<StatusRequest, Error> {
        let issue = self
            .issues
            .find_by_id(&request.issue_id)
            .await
            .map_err(map_issue_repo_error)?
            .ok_or_else(|| Error::not_found("issue not found"))?;

        let now = self.clock.utc();
        let proposal = StatusRequest {
            id: StatusRequestId::random(),
            issue_id: request.issue_id,
            requester_id: request.principal.user_id,
            current_status: issue.status,
            requested_status: request.requested_status,
            reason: request.reason,
            state: ReviewState::Pending,
            reviewer_id: None,
            review_comment: None,
            reviewed_at: None,
            created_at: now,
            updated_at: now,
        };

        self.requests
            .insert(&proposal)
            .await
            .map_err(map_request_repo_error)?;
        debug!(
            request_id = %proposal.id,
            issue_id = %proposal.issue_id,
            requested = %proposal.requested_status,
            "status change requested"
        );
        Ok(proposal)
    }

    async fn review(&self, request: ReviewRequest) -> Result<StatusRequest, Error> {
        if !request.principal.is_admin() {
            return Err(Error::forbidden(
                "only administrators may review status requests",
            ));
        }

        let proposal = self
            .requests
            .find_by_id(&request.request_id)
            .await
            .map_err(map_request_repo_error)?
            .ok_or_else(|| Error::not_found("status request not found"))?;
        if !proposal.is_pending() {
            return Err(Error::conflict(format!(
                "status request already {}",
                proposal.state
            )));
        }

        let review = ReviewRecord {
            reviewer_id: request.principal.user_id,
            comment: request.comment,
            reviewed_at: self.clock.utc(),
            log_id: StatusLogId::random(),
        };

        // The repository re-checks the pending state under lock; the
        // check above only gives callers a friendlier fast path.
        let reviewed = match request.action {
            ReviewAction::Approve => self.requests.approve(&request.request_id, &review).await,
            ReviewAction::Reject => self.requests.reject(&request.request_id, &review).await,
        }
        .map_err(map_request_repo_error)?;

        debug!(
            request_id = %reviewed.id,
            state = %reviewed.state,
            "status request reviewed"
        );
        Ok(reviewed)
    }

    async fn list_requests(
        &self,
        filter: &PendingRequestFilter,
    ) -> Result<Vec<StatusRequestListing>, Error> {
        self.requests
            .list(filter)
            .await
            .map_err(map_request_repo_error)
    }
}
