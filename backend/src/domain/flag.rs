//! Abuse flags raised against issues, queued for moderator review.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::issue::IssueId;
use super::user::UserId;

/// Validation errors for flag fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlagValidationError {
    /// Reason was blank once trimmed.
    #[error("flag reason must not be empty")]
    EmptyReason,
}

/// Stable flag identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct FlagId(Uuid);

impl FlagId {
    /// Generate a new random [`FlagId`].
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

impl fmt::Display for FlagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A user-submitted abuse/inaccuracy report against an issue.
///
/// ## Invariants
/// - At most one flag per (issue, flagger) pair; the store enforces a
///   unique constraint and the service pre-checks before insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Flag {
    /// Stable identifier.
    pub id: FlagId,
    /// Issue being flagged.
    pub issue_id: IssueId,
    /// Account that raised the flag.
    pub flagger_id: UserId,
    /// Why the issue was flagged.
    pub reason: String,
    /// Whether a moderator has handled the flag.
    pub resolved: bool,
    /// When the flag was handled; `None` while unresolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// When the flag was raised.
    pub created_at: DateTime<Utc>,
}

/// Validate a flag reason.
pub fn validate_reason(reason: &str) -> Result<(), FlagValidationError> {
    if reason.trim().is_empty() {
        return Err(FlagValidationError::EmptyReason);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_reasons_are_rejected(#[case] reason: &str) {
        assert_eq!(
            validate_reason(reason).expect_err("blank rejected"),
            FlagValidationError::EmptyReason
        );
    }

    #[rstest]
    fn non_blank_reason_is_accepted() {
        assert!(validate_reason("duplicate of another report").is_ok());
    }
}
