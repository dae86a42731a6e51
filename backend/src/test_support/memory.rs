//! In-memory implementations of the persistence ports.
//!
//! One mutex guards the whole store, so every multi-row operation is
//! trivially atomic: it either happens entirely under the lock or not at
//! all. That mirrors the transactional guarantees the Diesel adapters
//! get from PostgreSQL and lets the behaviour suites run without a
//! database.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::access::Principal;
use crate::domain::flag::{Flag, FlagId};
use crate::domain::geo::BoundingBox;
use crate::domain::issue::{Issue, IssueId, IssuePatch};
use crate::domain::ports::{
    FlagRepository, FlagRepositoryError, IssueRepository, IssueRepositoryError,
    PendingRequestFilter, ReviewRecord, StatusRequestListing, StatusRequestRepository,
    StatusRequestRepositoryError, StatusTransition, TokenVerifier, TokenVerifierError,
    UserRepository, UserRepositoryError,
};
use crate::domain::status_log::StatusLog;
use crate::domain::status_request::{
    APPROVAL_COMMENT, ReviewState, StatusRequest, StatusRequestId,
};
use crate::domain::user::{User, UserId};

#[derive(Default)]
struct StoreState {
    users: Vec<User>,
    issues: Vec<Issue>,
    logs: Vec<StatusLog>,
    flags: Vec<Flag>,
    requests: Vec<StatusRequest>,
}

/// Shared in-memory store implementing every persistence port.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().expect("store poisoned")
    }

    /// Number of status log rows currently held for an issue.
    pub fn log_count(&self, issue_id: &IssueId) -> usize {
        self.lock()
            .logs
            .iter()
            .filter(|log| log.issue_id == *issue_id)
            .count()
    }

    /// Number of flag rows currently held for an issue.
    pub fn flag_count(&self, issue_id: &IssueId) -> usize {
        self.lock()
            .flags
            .iter()
            .filter(|flag| flag.issue_id == *issue_id)
            .count()
    }

    /// Snapshot of an issue's audit trail in creation order.
    pub fn logs_in_creation_order(&self, issue_id: &IssueId) -> Vec<StatusLog> {
        self.lock()
            .logs
            .iter()
            .filter(|log| log.issue_id == *issue_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl IssueRepository for InMemoryStore {
    async fn create(
        &self,
        issue: &Issue,
        creation_log: &StatusLog,
    ) -> Result<(), IssueRepositoryError> {
        let mut state = self.lock();
        state.issues.push(issue.clone());
        state.logs.push(creation_log.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &IssueId) -> Result<Option<Issue>, IssueRepositoryError> {
        let state = self.lock();
        Ok(state.issues.iter().find(|issue| issue.id == *id).cloned())
    }

    async fn logs_for_issue(&self, id: &IssueId) -> Result<Vec<StatusLog>, IssueRepositoryError> {
        let state = self.lock();
        let mut logs: Vec<StatusLog> = state
            .logs
            .iter()
            .filter(|log| log.issue_id == *id)
            .cloned()
            .collect();
        logs.reverse();
        Ok(logs)
    }

    async fn update(
        &self,
        id: &IssueId,
        patch: &IssuePatch,
        transition: Option<StatusTransition>,
        updated_at: DateTime<Utc>,
    ) -> Result<Issue, IssueRepositoryError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let issue = state
            .issues
            .iter_mut()
            .find(|issue| issue.id == *id)
            .ok_or(IssueRepositoryError::NotFound)?;

        if let Some(transition) = &transition {
            if issue.status != transition.expected_status {
                return Err(IssueRepositoryError::StatusMismatch {
                    expected: transition.expected_status,
                    actual: issue.status,
                });
            }
        }

        if let Some(title) = &patch.title {
            issue.title.clone_from(title);
        }
        if let Some(description) = &patch.description {
            issue.description.clone_from(description);
        }
        if let Some(category) = patch.category {
            issue.category = category;
        }
        if let Some(coordinates) = patch.coordinates {
            issue.location.coordinates = coordinates;
        }
        if let Some(address) = &patch.address {
            issue.location.address = Some(address.clone());
        }
        issue
            .photos
            .extend(patch.appended_photos.iter().cloned());
        issue.updated_at = updated_at;

        if let Some(transition) = transition {
            issue.status = transition.log.new_status;
            let updated = issue.clone();
            state.logs.push(transition.log);
            return Ok(updated);
        }
        Ok(issue.clone())
    }

    async fn delete(&self, id: &IssueId) -> Result<(), IssueRepositoryError> {
        let mut state = self.lock();
        let before = state.issues.len();
        state.issues.retain(|issue| issue.id != *id);
        if state.issues.len() == before {
            return Err(IssueRepositoryError::NotFound);
        }
        // Dependents (and the owned location, which lives inside the
        // issue) go in the same critical section.
        state.logs.retain(|log| log.issue_id != *id);
        state.flags.retain(|flag| flag.issue_id != *id);
        state.requests.retain(|request| request.issue_id != *id);
        Ok(())
    }

    async fn find_in_box(
        &self,
        bounds: &BoundingBox,
    ) -> Result<Vec<Issue>, IssueRepositoryError> {
        let state = self.lock();
        let mut matches: Vec<Issue> = state
            .issues
            .iter()
            .filter(|issue| bounds.contains(issue.location.coordinates))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matches)
    }
}

#[async_trait]
impl FlagRepository for InMemoryStore {
    async fn insert(&self, flag: &Flag) -> Result<(), FlagRepositoryError> {
        let mut state = self.lock();
        let duplicate = state
            .flags
            .iter()
            .any(|existing| {
                existing.issue_id == flag.issue_id && existing.flagger_id == flag.flagger_id
            });
        if duplicate {
            return Err(FlagRepositoryError::Duplicate);
        }
        state.flags.push(flag.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &FlagId) -> Result<Option<Flag>, FlagRepositoryError> {
        let state = self.lock();
        Ok(state.flags.iter().find(|flag| flag.id == *id).cloned())
    }

    async fn find_for_issue_and_user(
        &self,
        issue_id: &IssueId,
        flagger_id: &UserId,
    ) -> Result<Option<Flag>, FlagRepositoryError> {
        let state = self.lock();
        Ok(state
            .flags
            .iter()
            .find(|flag| flag.issue_id == *issue_id && flag.flagger_id == *flagger_id)
            .cloned())
    }

    async fn mark_resolved(
        &self,
        id: &FlagId,
        resolved_at: DateTime<Utc>,
    ) -> Result<Flag, FlagRepositoryError> {
        let mut state = self.lock();
        let flag = state
            .flags
            .iter_mut()
            .find(|flag| flag.id == *id)
            .ok_or(FlagRepositoryError::NotFound)?;
        flag.resolved = true;
        flag.resolved_at = Some(resolved_at);
        Ok(flag.clone())
    }

    async fn unresolved_for_issue(
        &self,
        issue_id: &IssueId,
    ) -> Result<Vec<Flag>, FlagRepositoryError> {
        let state = self.lock();
        Ok(state
            .flags
            .iter()
            .filter(|flag| flag.issue_id == *issue_id && !flag.resolved)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StatusRequestRepository for InMemoryStore {
    async fn insert(&self, request: &StatusRequest) -> Result<(), StatusRequestRepositoryError> {
        let mut state = self.lock();
        state.requests.push(request.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &StatusRequestId,
    ) -> Result<Option<StatusRequest>, StatusRequestRepositoryError> {
        let state = self.lock();
        Ok(state
            .requests
            .iter()
            .find(|request| request.id == *id)
            .cloned())
    }

    async fn approve(
        &self,
        id: &StatusRequestId,
        review: &ReviewRecord,
    ) -> Result<StatusRequest, StatusRequestRepositoryError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        let request_position = state
            .requests
            .iter()
            .position(|request| request.id == *id)
            .ok_or(StatusRequestRepositoryError::NotFound)?;
        let (issue_id, requested_status, current_state) = {
            let request = state
                .requests
                .get(request_position)
                .ok_or(StatusRequestRepositoryError::NotFound)?;
            (request.issue_id, request.requested_status, request.state)
        };
        if current_state != ReviewState::Pending {
            return Err(StatusRequestRepositoryError::AlreadyReviewed {
                state: current_state,
            });
        }

        let issue = state
            .issues
            .iter_mut()
            .find(|issue| issue.id == issue_id)
            .ok_or(StatusRequestRepositoryError::IssueNotFound)?;
        let old_status = issue.status;
        issue.status = requested_status;
        issue.updated_at = review.reviewed_at;
        let log = StatusLog {
            id: review.log_id,
            issue_id,
            actor_id: review.reviewer_id,
            old_status: Some(old_status),
            new_status: requested_status,
            comment: review
                .comment
                .clone()
                .or_else(|| Some(APPROVAL_COMMENT.to_owned())),
            created_at: review.reviewed_at,
        };
        state.logs.push(log);

        let request = state
            .requests
            .get_mut(request_position)
            .ok_or(StatusRequestRepositoryError::NotFound)?;
        request.state = ReviewState::Approved;
        request.reviewer_id = Some(review.reviewer_id);
        request.review_comment = review.comment.clone();
        request.reviewed_at = Some(review.reviewed_at);
        request.updated_at = review.reviewed_at;
        Ok(request.clone())
    }

    async fn reject(
        &self,
        id: &StatusRequestId,
        review: &ReviewRecord,
    ) -> Result<StatusRequest, StatusRequestRepositoryError> {
        let mut state = self.lock();
        let request = state
            .requests
            .iter_mut()
            .find(|request| request.id == *id)
            .ok_or(StatusRequestRepositoryError::NotFound)?;
        if request.state != ReviewState::Pending {
            return Err(StatusRequestRepositoryError::AlreadyReviewed {
                state: request.state,
            });
        }
        request.state = ReviewState::Rejected;
        request.reviewer_id = Some(review.reviewer_id);
        request.review_comment = review.comment.clone();
        request.reviewed_at = Some(review.reviewed_at);
        request.updated_at = review.reviewed_at;
        Ok(request.clone())
    }

    async fn list(
        &self,
        filter: &PendingRequestFilter,
    ) -> Result<Vec<StatusRequestListing>, StatusRequestRepositoryError> {
        let state = self.lock();
        let wanted = filter.state.unwrap_or(ReviewState::Pending);
        let needle = filter.search.as_deref().map(str::to_lowercase);

        let mut listings: Vec<StatusRequestListing> = state
            .requests
            .iter()
            .filter(|request| request.state == wanted)
            .map(|request| {
                let issue_title = state
                    .issues
                    .iter()
                    .find(|issue| issue.id == request.issue_id)
                    .map(|issue| issue.title.clone())
                    .unwrap_or_default();
                let requester_username = state
                    .users
                    .iter()
                    .find(|user| user.id == request.requester_id)
                    .map(|user| user.username.as_ref().to_owned())
                    .unwrap_or_default();
                StatusRequestListing {
                    request: request.clone(),
                    issue_title,
                    requester_username,
                }
            })
            .filter(|listing| {
                needle.as_deref().is_none_or(|needle| {
                    listing.issue_title.to_lowercase().contains(needle)
                        || listing.requester_username.to_lowercase().contains(needle)
                })
            })
            .collect();
        listings.sort_by(|a, b| b.request.created_at.cmp(&a.request.created_at));
        Ok(listings)
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn insert(&self, user: &User) -> Result<(), UserRepositoryError> {
        let mut state = self.lock();
        if state
            .users
            .iter()
            .any(|existing| existing.username == user.username)
        {
            return Err(UserRepositoryError::DuplicateUsername);
        }
        if state.users.iter().any(|existing| existing.email == user.email) {
            return Err(UserRepositoryError::DuplicateEmail);
        }
        state.users.push(user.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError> {
        let state = self.lock();
        Ok(state.users.iter().find(|user| user.id == *id).cloned())
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, UserRepositoryError> {
        let state = self.lock();
        Ok(state
            .users
            .iter()
            .find(|user| user.username.as_ref() == username)
            .cloned())
    }
}

/// Token verifier over a fixed token table, for handler tests.
#[derive(Clone, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, Principal>,
}

impl StaticTokenVerifier {
    /// Create an empty verifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token resolving to the given principal.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.tokens.insert(token.into(), principal);
        self
    }
}

#[async_trait]
impl TokenVerifier for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Principal, TokenVerifierError> {
        self.tokens
            .get(token)
            .copied()
            .ok_or(TokenVerifierError::InvalidToken)
    }
}
