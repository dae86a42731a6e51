//! Driving port for the issue lifecycle: create, read, patch,
//! transition, and delete.

use async_trait::async_trait;

use crate::domain::access::Principal;
use crate::domain::error::Error;
use crate::domain::issue::{Issue, IssueCategory, IssueId, IssuePatch, IssueStatus};
use crate::domain::status_log::StatusLog;

/// Request to report a new issue.
#[derive(Debug, Clone)]
pub struct CreateIssueRequest {
    /// The authenticated reporter.
    pub principal: Principal,
    /// Short summary of the problem.
    pub title: String,
    /// Full description of the problem.
    pub description: String,
    /// Kind of problem.
    pub category: IssueCategory,
    /// Degrees north, validated by the service.
    pub latitude: f64,
    /// Degrees east, validated by the service.
    pub longitude: f64,
    /// Optional human-readable address.
    pub address: Option<String>,
    /// Opaque references to uploaded photos.
    pub photos: Vec<String>,
}

/// Request to patch an issue's descriptive fields and, optionally,
/// transition its status in the same transaction.
#[derive(Debug, Clone)]
pub struct UpdateIssueRequest {
    /// Issue to update.
    pub issue_id: IssueId,
    /// The authenticated caller.
    pub principal: Principal,
    /// Descriptive field changes.
    pub patch: IssuePatch,
    /// Target status; `None` leaves the status alone, and a value equal
    /// to the current status is a no-op that writes no log.
    pub new_status: Option<IssueStatus>,
    /// Note attached to the status transition, if one happens.
    pub status_comment: Option<String>,
}

/// Request to transition an issue's status.
#[derive(Debug, Clone)]
pub struct ChangeStatusRequest {
    /// Issue to transition.
    pub issue_id: IssueId,
    /// The authenticated caller.
    pub principal: Principal,
    /// Target status.
    pub new_status: IssueStatus,
    /// Note attached to the transition.
    pub comment: Option<String>,
}

/// An issue together with its audit trail, newest entry first.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueDetail {
    /// The issue aggregate.
    pub issue: Issue,
    /// Audit trail, newest first.
    pub logs: Vec<StatusLog>,
}

/// Driving port for issue lifecycle operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueLifecycle: Send + Sync {
    /// Report a new issue. Writes the location, the issue, and the
    /// creation audit entry in one transaction.
    async fn create_issue(&self, request: CreateIssueRequest) -> Result<IssueDetail, Error>;

    /// Fetch an issue with its audit trail.
    async fn get_issue(&self, issue_id: &IssueId) -> Result<IssueDetail, Error>;

    /// Patch descriptive fields and optionally transition the status in
    /// the same transaction.
    async fn update_issue(&self, request: UpdateIssueRequest) -> Result<IssueDetail, Error>;

    /// Transition an issue's status, pairing the change with an audit
    /// entry. A same-value request succeeds without writing a log.
    async fn change_status(&self, request: ChangeStatusRequest) -> Result<IssueDetail, Error>;

    /// Delete an issue and everything it owns.
    async fn delete_issue(&self, issue_id: &IssueId, principal: &Principal)
    -> Result<(), Error>;
}
