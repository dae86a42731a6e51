//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (repositories, the token verifier) describe what the
//! domain expects from adapters; driving ports describe what adapters
//! may ask of the domain. Every port exposes strongly typed errors so
//! adapters map their failures into predictable variants.

mod flag_repository;
mod issue_lifecycle;
mod issue_repository;
mod moderation_queue;
mod nearby_search;
mod status_request_repository;
mod status_request_workflow;
mod token_verifier;
mod user_registry;
mod user_repository;

#[cfg(test)]
pub use flag_repository::MockFlagRepository;
pub use flag_repository::{FixtureFlagRepository, FlagRepository, FlagRepositoryError};
#[cfg(test)]
pub use issue_lifecycle::MockIssueLifecycle;
pub use issue_lifecycle::{
    ChangeStatusRequest, CreateIssueRequest, IssueDetail, IssueLifecycle, UpdateIssueRequest,
};
#[cfg(test)]
pub use issue_repository::MockIssueRepository;
pub use issue_repository::{
    FixtureIssueRepository, IssueRepository, IssueRepositoryError, StatusTransition,
};
#[cfg(test)]
pub use moderation_queue::MockModerationQueue;
pub use moderation_queue::{FlagIssueRequest, ModerationQueue};
#[cfg(test)]
pub use nearby_search::MockNearbySearch;
pub use nearby_search::{NearbyQuery, NearbySearch};
#[cfg(test)]
pub use status_request_repository::MockStatusRequestRepository;
pub use status_request_repository::{
    FixtureStatusRequestRepository, PendingRequestFilter, ReviewRecord, StatusRequestListing,
    StatusRequestRepository, StatusRequestRepositoryError,
};
#[cfg(test)]
pub use status_request_workflow::MockStatusRequestWorkflow;
pub use status_request_workflow::{RequestChangeRequest, ReviewRequest, StatusRequestWorkflow};
#[cfg(test)]
pub use token_verifier::MockTokenVerifier;
pub use token_verifier::{FixtureTokenVerifier, TokenVerifier, TokenVerifierError};
#[cfg(test)]
pub use user_registry::MockUserRegistry;
pub use user_registry::{RegisterUserRequest, UserRegistry};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{FixtureUserRepository, UserRepository, UserRepositoryError};
