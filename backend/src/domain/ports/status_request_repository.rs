//! Port for status change request persistence and review transactions.
//!
//! Approval is the one operation here with a cross-aggregate invariant:
//! marking the request approved and applying the requested status to the
//! issue (with its audit entry) must commit together or not at all. The
//! adapter owns that transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::status_log::StatusLogId;
use crate::domain::status_request::{ReviewState, StatusRequest, StatusRequestId};
use crate::domain::user::UserId;

/// Errors surfaced by status request persistence adapters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusRequestRepositoryError {
    /// Repository connection could not be established.
    #[error("status request repository connection failed: {message}")]
    Connection {
        /// Adapter-provided context.
        message: String,
    },
    /// Query or mutation failed during execution.
    #[error("status request repository query failed: {message}")]
    Query {
        /// Adapter-provided context.
        message: String,
    },
    /// The referenced request does not exist.
    #[error("status request not found")]
    NotFound,
    /// The referenced issue disappeared before the review committed.
    #[error("issue for status request not found")]
    IssueNotFound,
    /// The request was already reviewed.
    #[error("status request already reviewed ({state})")]
    AlreadyReviewed {
        /// Terminal state found under the row lock.
        state: ReviewState,
    },
}

impl StatusRequestRepositoryError {
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

/// Reviewer identity and note recorded on a reviewed request.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    /// Administrator performing the review.
    pub reviewer_id: UserId,
    /// Optional note shown to the requester.
    pub comment: Option<String>,
    /// When the review happened.
    pub reviewed_at: DateTime<Utc>,
    /// Identifier for the audit entry written on approval. Unused by
    /// rejections but allocated by the caller either way so the adapter
    /// never generates ids.
    pub log_id: StatusLogId,
}

/// Search and state filter for the moderation list view.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingRequestFilter {
    /// Case-insensitive substring matched against the requester's
    /// username and the issue title.
    pub search: Option<String>,
    /// Review state to list; defaults to pending.
    pub state: Option<ReviewState>,
}

/// A status request joined with the display columns the moderation UI
/// needs.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusRequestListing {
    /// The request itself.
    pub request: StatusRequest,
    /// Title of the targeted issue.
    pub issue_title: String,
    /// Username of the requester.
    pub requester_username: String,
}

/// Port for status request persistence.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatusRequestRepository: Send + Sync {
    /// Persist a new pending request.
    async fn insert(&self, request: &StatusRequest) -> Result<(), StatusRequestRepositoryError>;

    /// Fetch a request by id.
    async fn find_by_id(
        &self,
        id: &StatusRequestId,
    ) -> Result<Option<StatusRequest>, StatusRequestRepositoryError>;

    /// Approve a pending request: in one transaction, mark it approved,
    /// apply its requested status to the issue, and append the audit
    /// entry. The entry's `old_status` is taken from the issue row under
    /// lock, not from the request's snapshot.
    async fn approve(
        &self,
        id: &StatusRequestId,
        review: &ReviewRecord,
    ) -> Result<StatusRequest, StatusRequestRepositoryError>;

    /// Reject a pending request, leaving the issue untouched.
    async fn reject(
        &self,
        id: &StatusRequestId,
        review: &ReviewRecord,
    ) -> Result<StatusRequest, StatusRequestRepositoryError>;

    /// List requests for the moderation view, newest first.
    async fn list(
        &self,
        filter: &PendingRequestFilter,
    ) -> Result<Vec<StatusRequestListing>, StatusRequestRepositoryError>;
}

/// Fixture implementation for tests that do not exercise requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureStatusRequestRepository;

#[async_trait]
impl StatusRequestRepository for FixtureStatusRequestRepository {
    async fn insert(&self, _request: &StatusRequest) -> Result<(), StatusRequestRepositoryError> {
        Ok(())
    }

    async fn find_by_id(
        &self,
        _id: &StatusRequestId,
    ) -> Result<Option<StatusRequest>, StatusRequestRepositoryError> {
        Ok(None)
    }

    async fn approve(
        &self,
        _id: &StatusRequestId,
        _review: &ReviewRecord,
    ) -> Result<StatusRequest, StatusRequestRepositoryError> {
        Err(StatusRequestRepositoryError::NotFound)
    }

    async fn reject(
        &self,
        _id: &StatusRequestId,
        _review: &ReviewRecord,
    ) -> Result<StatusRequest, StatusRequestRepositoryError> {
        Err(StatusRequestRepositoryError::NotFound)
    }

    async fn list(
        &self,
        _filter: &PendingRequestFilter,
    ) -> Result<Vec<StatusRequestListing>, StatusRequestRepositoryError> {
        Ok(Vec::new())
    }
}
