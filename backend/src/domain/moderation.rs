//! Abuse flag intake and moderation queue service.
//!
//! Resolving a flag never changes the flagged issue's status; if a
//! moderator decides to act on the issue itself, that is a separate
//! lifecycle call.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use mockable::Clock;
use serde_json::json;
use tracing::debug;

use crate::domain::access::Principal;
use crate::domain::error::Error;
use crate::domain::flag::{Flag, FlagId, validate_reason};
use crate::domain::issue::IssueId;
use crate::domain::ports::{
    FlagIssueRequest, FlagRepository, FlagRepositoryError, IssueRepository, IssueRepositoryError,
    ModerationQueue,
};

/// Moderation queue service backed by flag and issue repositories.
#[derive(Clone)]
pub struct ModerationService<F, R> {
    flags: Arc<F>,
    issues: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<F, R> ModerationService<F, R> {
    /// Create a new service over the given repositories and clock.
    pub fn new(flags: Arc<F>, issues: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self {
            flags,
            issues,
            clock,
        }
    }
}

fn map_flag_repo_error(error: FlagRepositoryError) -> Error {
    match error {
        FlagRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("flag repository unavailable: {message}"))
        }
        FlagRepositoryError::Query { message } => {
            Error::internal(format!("flag repository error: {message}"))
        }
        FlagRepositoryError::Duplicate => Error::conflict("issue already flagged"),
        FlagRepositoryError::NotFound => Error::not_found("flag not found"),
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
impl<F, R> ModerationQueue for ModerationService<F, R>
where
    F: FlagRepository,
    R: IssueRepository,
{
    async fn flag_issue(&self, request: FlagIssueRequest) -> Result<Flag, Error> {
        validate_reason(&request.reason).map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({ "field": "reason" }))
        })?;

        self.issues
            .find_by_id(&request.issue_id)
            .await
            .map_err(map_issue_repo_error)?
            .ok_or_else(|| Error::not_found("issue not found"))?;

        let existing = self
            .flags
            .find_for_issue_and_user(&request.issue_id, &request.principal.user_id)
            .await
            .map_err(map_flag_repo_error)?;
        if existing.is_some() {
            return Err(Error::conflict("issue already flagged"));
        }

        let flag = Flag {
            id: FlagId::random(),
            issue_id: request.issue_id,
            flagger_id: request.principal.user_id,
            reason: request.reason,
            resolved: false,
            resolved_at: None,
            created_at: self.clock.utc(),
        };

        // The unique constraint backstops the pre-check under races.
        self.flags
            .insert(&flag)
            .await
            .map_err(map_flag_repo_error)?;
        debug!(issue_id = %flag.issue_id, flag_id = %flag.id, "issue flagged");
        Ok(flag)
    }

    async fn resolve_flag(
        &self,
        flag_id: &FlagId,
        principal: &Principal,
    ) -> Result<Flag, Error> {
        if !principal.is_admin() {
            return Err(Error::forbidden("only administrators may resolve flags"));
        }
        let resolved_at: chrono::DateTime<Utc> = self.clock.utc();
        let flag = self
            .flags
            .mark_resolved(flag_id, resolved_at)
            .await
            .map_err(map_flag_repo_error)?;
        debug!(flag_id = %flag_id, "flag resolved");
        Ok(flag)
    }

    async fn unresolved_flags(&self, issue_id: &IssueId) -> Result<Vec<Flag>, Error> {
        self.flags
            .unresolved_for_issue(issue_id)
            .await
            .map_err(map_flag_repo_error)
    }
}
