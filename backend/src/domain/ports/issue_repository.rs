//! Port for issue, location, and status log persistence.
//!
//! The multi-row invariants live behind this port: creating an issue
//! writes the location, the issue, and the creation log atomically;
//! updating an issue applies the field patch and any status transition
//! (with its log entry) in one transaction under an issue row lock;
//! deleting an issue cascades over its dependents in one transaction.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::geo::BoundingBox;
use crate::domain::issue::{Issue, IssueId, IssuePatch, IssueStatus};
use crate::domain::status_log::StatusLog;

/// Errors surfaced by issue persistence adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IssueRepositoryError {
    /// Repository connection could not be established.
    #[error("issue repository connection failed: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("issue repository query failed: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
    /// The referenced issue does not exist.
    #[error("issue not found")]
    NotFound,
    /// The issue's status changed between the caller's read and the
    /// locked write.
    #[error("issue status changed concurrently: expected {expected}, found {actual}")]
    StatusMismatch {
        /// Status the caller observed.
        expected: IssueStatus,
        /// Status found under the row lock.
        actual: IssueStatus,
    },
}

impl IssueRepositoryError {
    /// Helper for connection oriented failures.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Helper for query failures.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }
}

/// Status transition applied together with a field patch.
///
/// The embedded log entry carries the new status; the adapter verifies
/// `expected_status` against the locked row before writing anything and
/// fails with [`IssueRepositoryError::StatusMismatch`] when a concurrent
/// writer got there first.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusTransition {
    /// Status the caller observed before deciding to transition.
    pub expected_status: IssueStatus,
    /// Fully built audit entry; `new_status` is the transition target.
    pub log: StatusLog,
}

/// Port for issue aggregate persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Persist a new issue, its owned location, and the creation log
    /// entry in one transaction.
    async fn create(
        &self,
        issue: &Issue,
        creation_log: &StatusLog,
    ) -> Result<(), IssueRepositoryError>;

    /// Fetch an issue (with its location) by id.
    async fn find_by_id(&self, id: &IssueId) -> Result<Option<Issue>, IssueRepositoryError>;

    /// Read an issue's audit trail, newest first.
    async fn logs_for_issue(&self, id: &IssueId) -> Result<Vec<StatusLog>, IssueRepositoryError>;

    /// Apply a field patch and an optional status transition in one
    /// transaction, locking the issue row first. Returns the updated
    /// issue.
    async fn update(
        &self,
        id: &IssueId,
        patch: &IssuePatch,
        transition: Option<StatusTransition>,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Issue, IssueRepositoryError>;

    /// Delete an issue and everything it owns (status logs, flags,
    /// status requests, location) in one transaction.
    async fn delete(&self, id: &IssueId) -> Result<(), IssueRepositoryError>;

    /// Fetch issues whose location falls inside the box, newest first.
    async fn find_in_box(&self, bounds: &BoundingBox)
    -> Result<Vec<Issue>, IssueRepositoryError>;
}

/// Fixture implementation for tests that do not exercise persistence.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureIssueRepository;

#[async_trait]
impl IssueRepository for FixtureIssueRepository {
    async fn create(
        &self,
        _issue: &Issue,
        _creation_log: &StatusLog,
    ) -> Result<(), IssueRepositoryError> {
        Ok(())
    }

    async fn find_by_id(&self, _id: &IssueId) -> Result<Option<Issue>, IssueRepositoryError> {
        Ok(None)
    }

    async fn logs_for_issue(
        &self,
        _id: &IssueId,
    ) -> Result<Vec<StatusLog>, IssueRepositoryError> {
        Ok(Vec::new())
    }

    async fn update(
        &self,
        _id: &IssueId,
        _patch: &IssuePatch,
        _transition: Option<StatusTransition>,
        _updated_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Issue, IssueRepositoryError> {
        Err(IssueRepositoryError::NotFound)
    }

    async fn delete(&self, _id: &IssueId) -> Result<(), IssueRepositoryError> {
        Err(IssueRepositoryError::NotFound)
    }

    async fn find_in_box(
        &self,
        _bounds: &BoundingBox,
    ) -> Result<Vec<Issue>, IssueRepositoryError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn error_constructors_carry_messages() {
        let err = IssueRepositoryError::connection("refused");
        assert!(err.to_string().contains("refused"));
        let err = IssueRepositoryError::query("bad sql");
        assert!(err.to_string().contains("bad sql"));
    }

    #[rstest]
    fn status_mismatch_names_both_statuses() {
        let err = IssueRepositoryError::StatusMismatch {
            expected: IssueStatus::Reported,
            actual: IssueStatus::Closed,
        };
        let message = err.to_string();
        assert!(message.contains("reported"));
        assert!(message.contains("closed"));
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_lookup_returns_none() {
        let repo = FixtureIssueRepository;
        let found = repo
            .find_by_id(&IssueId::random())
            .await
            .expect("fixture lookup succeeds");
        assert!(found.is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn fixture_delete_reports_not_found() {
        let repo = FixtureIssueRepository;
        let err = repo
            .delete(&IssueId::random())
            .await
            .expect_err("fixture delete fails");
        assert_eq!(err, IssueRepositoryError::NotFound);
    }
}
