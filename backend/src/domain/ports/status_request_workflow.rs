//! Driving port for the citizen-proposed, administrator-reviewed status
//! change workflow.

use async_trait::async_trait;

use crate::domain::access::Principal;
use crate::domain::error::Error;
use crate::domain::issue::{IssueId, IssueStatus};
use crate::domain::status_request::{ReviewAction, StatusRequest, StatusRequestId};

pub use super::status_request_repository::{PendingRequestFilter, StatusRequestListing};

/// Request to propose a status change.
#[derive(Debug, Clone)]
pub struct RequestChangeRequest {
    /// Issue the proposal targets.
    pub issue_id: IssueId,
    /// The authenticated requester. Any user may propose, the reporter
    /// included.
    pub principal: Principal,
    /// Status the requester wants applied.
    pub requested_status: IssueStatus,
    /// Optional justification.
    pub reason: Option<String>,
}

/// Request to review a pending proposal.
#[derive(Debug, Clone)]
pub struct ReviewRequest {
    /// Proposal being reviewed.
    pub request_id: StatusRequestId,
    /// The authenticated reviewer; must be an administrator.
    pub principal: Principal,
    /// Approve or reject.
    pub action: ReviewAction,
    /// Optional note shown to the requester.
    pub comment: Option<String>,
}

/// Driving port for status request workflow operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusRequestWorkflow: Send + Sync {
    /// File a pending status change proposal, snapshotting the issue's
    /// current status.
    async fn request_change(&self, request: RequestChangeRequest)
    -> Result<StatusRequest, Error>;

    /// Review a pending proposal exactly once. Approval applies the
    /// requested status to the issue in the same transaction; rejection
    /// leaves the issue untouched.
    async fn review(&self, request: ReviewRequest) -> Result<StatusRequest, Error>;

    /// List proposals for the moderation view, newest first.
    async fn list_requests(
        &self,
        filter: &PendingRequestFilter,
    ) -> Result<Vec<StatusRequestListing>, Error>;
}
