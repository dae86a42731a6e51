//! Port for abuse flag persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::flag::{Flag, FlagId};
use crate::domain::issue::IssueId;
use crate::domain::user::UserId;

/// Errors surfaced by flag persistence adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlagRepositoryError {
    /// Repository connection could not be established.
    #[error("flag repository connection failed: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("flag repository query failed: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
    /// A flag already exists for this (issue, flagger) pair.
    ///
    /// Raised by the unique constraint on insert; the service also
    /// pre-checks, so hitting this means two flags raced.
    #[error("issue already flagged by this user")]
    Duplicate,
    /// The referenced flag does not exist.
    #[error("flag not found")]
    NotFound,
}

impl FlagRepositoryError {
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

/// Port for flag persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FlagRepository: Send + Sync {
    /// Persist a new flag.
    async fn insert(&self, flag: &Flag) -> Result<(), FlagRepositoryError>;

    /// Fetch a flag by id.
    async fn find_by_id(&self, id: &FlagId) -> Result<Option<Flag>, FlagRepositoryError>;

    /// Fetch the flag a user raised against an issue, if any.
    async fn find_for_issue_and_user(
        &self,
        issue_id: &IssueId,
        flagger_id: &UserId,
    ) -> Result<Option<Flag>, FlagRepositoryError>;

    /// Mark a flag resolved at the given instant. Returns the updated
    /// flag.
    async fn mark_resolved(
        &self,
        id: &FlagId,
        resolved_at: DateTime<Utc>,
    ) -> Result<Flag, FlagRepositoryError>;

    /// Unresolved flags for an issue in insertion order.
    async fn unresolved_for_issue(
        &self,
        issue_id: &IssueId,
    ) -> Result<Vec<Flag>, FlagRepositoryError>;
}

/// Fixture implementation for tests that do not exercise flags.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureFlagRepository;

#[async_trait]
impl FlagRepository for FixtureFlagRepository {
    async fn insert(&self, _flag: &Flag) -> Result<(), FlagRepositoryError> {
        Ok(())
    }

    async fn find_by_id(&self, _id: &FlagId) -> Result<Option<Flag>, FlagRepositoryError> {
        Ok(None)
    }

    async fn find_for_issue_and_user(
        &self,
        _issue_id: &IssueId,
        _flagger_id: &UserId,
    ) -> Result<Option<Flag>, FlagRepositoryError> {
        Ok(None)
    }

    async fn mark_resolved(
        &self,
        _id: &FlagId,
        _resolved_at: DateTime<Utc>,
    ) -> Result<Flag, FlagRepositoryError> {
        Err(FlagRepositoryError::NotFound)
    }

    async fn unresolved_for_issue(
        &self,
        _issue_id: &IssueId,
    ) -> Result<Vec<Flag>, FlagRepositoryError> {
        Ok(Vec::new())
    }
}
