//! Driving port for the abuse flag intake and moderation queue.

use async_trait::async_trait;

use crate::domain::access::Principal;
use crate::domain::error::Error;
use crate::domain::flag::{Flag, FlagId};
use crate::domain::issue::IssueId;

/// Request to flag an issue.
#[derive(Debug, Clone)]
pub struct FlagIssueRequest {
    /// Issue being flagged.
    pub issue_id: IssueId,
    /// The authenticated flagger.
    pub principal: Principal,
    /// Why the issue is being flagged.
    pub reason: String,
}

/// Driving port for moderation queue operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModerationQueue: Send + Sync {
    /// Raise an abuse flag against an issue. At most one flag per
    /// (issue, flagger) pair.
    async fn flag_issue(&self, request: FlagIssueRequest) -> Result<Flag, Error>;

    /// Mark a flag handled. Administrator-only; never touches the
    /// issue's status.
    async fn resolve_flag(&self, flag_id: &FlagId, principal: &Principal)
    -> Result<Flag, Error>;

    /// Unresolved flags for an issue in insertion order.
    async fn unresolved_flags(&self, issue_id: &IssueId) -> Result<Vec<Flag>, Error>;
}
