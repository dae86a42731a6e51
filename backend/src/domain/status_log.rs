//! Immutable audit records of issue status transitions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::issue::{IssueId, IssueStatus};
use super::user::UserId;

/// Comment written on the creation entry of every issue.
pub const CREATION_COMMENT: &str = "Issue reported";

/// Stable status log identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct StatusLogId(Uuid);

impl StatusLogId {
    /// Generate a new random [`StatusLogId`].
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

impl fmt::Display for StatusLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One immutable audit entry recording a single status transition.
///
/// ## Invariants
/// - Append-only; entries are never updated or deleted (except when the
///   owning issue is deleted).
/// - `old_status` is `None` only on the creation entry.
/// - Replaying an issue's entries in creation order reconstructs every
///   historical status value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusLog {
    /// Stable identifier.
    pub id: StatusLogId,
    /// Issue the entry belongs to.
    pub issue_id: IssueId,
    /// Account that performed the transition.
    pub actor_id: UserId,
    /// Status before the transition; `None` on the creation entry.
    pub old_status: Option<IssueStatus>,
    /// Status after the transition.
    pub new_status: IssueStatus,
    /// Free-text note attached to the transition.
    pub comment: Option<String>,
    /// When the transition happened.
    pub created_at: DateTime<Utc>,
}

impl StatusLog {
    /// Build the creation entry written alongside a new issue.
    pub fn creation_entry(
        issue_id: IssueId,
        actor_id: UserId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: StatusLogId::random(),
            issue_id,
            actor_id,
            old_status: None,
            new_status: IssueStatus::INITIAL,
            comment: Some(CREATION_COMMENT.to_owned()),
            created_at,
        }
    }
}

/// Whether `logs`, in creation order, form a complete audit trail ending
/// at `current`.
///
/// Checks the chain property: the first entry has no `old_status`, each
/// later entry's `old_status` equals the previous entry's `new_status`,
/// and the final `new_status` equals the issue's current status.
pub fn replays_to(logs: &[StatusLog], current: IssueStatus) -> bool {
    let mut previous: Option<IssueStatus> = None;
    for (position, log) in logs.iter().enumerate() {
        if position == 0 {
            if log.old_status.is_some() {
                return false;
            }
        } else if log.old_status != previous {
            return false;
        }
        previous = Some(log.new_status);
    }
    previous == Some(current)
}
