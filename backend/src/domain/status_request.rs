//! Citizen-proposed status changes awaiting administrator review.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::issue::{IssueId, IssueStatus};
use super::user::UserId;

/// Audit comment written when an approval carries no reviewer note.
pub const APPROVAL_COMMENT: &str = "Status change request approved";

/// Stable status request identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct StatusRequestId(Uuid);

impl StatusRequestId {
    /// Generate a new random [`StatusRequestId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for StatusRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Review state of a status request.
///
/// `Pending` is the only non-terminal state: a request is reviewed at
/// most once, and `Approved`/`Rejected` never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    /// Awaiting administrator review.
    Pending,
    /// Approved; the requested status was applied to the issue.
    Approved,
    /// Rejected; the issue was left untouched.
    Rejected,
}

impl ReviewState {
    /// Stable string form used by the persistence layer.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Error returned when parsing an unknown review state string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown review state")]
pub struct UnknownReviewState;

impl FromStr for ReviewState {
    type Err = UnknownReviewState;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownReviewState),
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Administrator decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    /// Apply the requested status to the issue.
    Approve,
    /// Decline without touching the issue.
    Reject,
}

/// A proposed status change awaiting administrator review.
///
/// ## Invariants
/// - `state` transitions only `Pending -> Approved` or
///   `Pending -> Rejected`, exactly once.
/// - `reviewer_id`, `review_comment`, and `reviewed_at` are `None` until
///   the request is reviewed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    /// Stable identifier.
    pub id: StatusRequestId,
    /// Issue the request targets.
    pub issue_id: IssueId,
    /// Account that proposed the change.
    pub requester_id: UserId,
    /// Issue status snapshotted when the request was filed.
    pub current_status: IssueStatus,
    /// Status the requester wants applied.
    pub requested_status: IssueStatus,
    /// Optional justification from the requester.
    pub reason: Option<String>,
    /// Review state.
    pub state: ReviewState,
    /// Administrator that reviewed the request.
    pub reviewer_id: Option<UserId>,
    /// Note left by the reviewer.
    pub review_comment: Option<String>,
    /// When the review happened.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Record creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl StatusRequest {
    /// Whether the request is still awaiting review.
    pub fn is_pending(&self) -> bool {
        self.state == ReviewState::Pending
    }
}
