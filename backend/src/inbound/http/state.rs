//! Shared HTTP adapter state.
//!
//! Handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{
    IssueLifecycle, ModerationQueue, NearbySearch, StatusRequestWorkflow, TokenVerifier,
    UserRegistry,
};

/// Dependency bundle for HTTP handlers.
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
///
/// use backend::domain::ports::{
///     FixtureFlagRepository, FixtureIssueRepository, FixtureStatusRequestRepository,
///     FixtureTokenVerifier, FixtureUserRepository,
/// };
/// use backend::domain::{
///     IssueLifecycleService, ModerationService, NearbySearchService, StatusRequestService,
///     UserRegistryService,
/// };
/// use backend::inbound::http::state::HttpState;
/// use mockable::DefaultClock;
///
/// let issues = Arc::new(FixtureIssueRepository);
/// let clock = Arc::new(DefaultClock);
/// let state = HttpState::new(
///     Arc::new(IssueLifecycleService::new(issues.clone(), clock.clone())),
///     Arc::new(ModerationService::new(
///         Arc::new(FixtureFlagRepository),
///         issues.clone(),
///         clock.clone(),
///     )),
///     Arc::new(StatusRequestService::new(
///         Arc::new(FixtureStatusRequestRepository),
///         issues.clone(),
///         clock.clone(),
///     )),
///     Arc::new(NearbySearchService::new(issues)),
///     Arc::new(UserRegistryService::new(
///         Arc::new(FixtureUserRepository),
///         clock,
///     )),
///     Arc::new(FixtureTokenVerifier),
/// );
/// let _ = state;
/// ```
#[derive(Clone)]
pub struct HttpState {
    /// Issue lifecycle operations.
    pub lifecycle: Arc<dyn IssueLifecycle>,
    /// Abuse flag intake and resolution.
    pub moderation: Arc<dyn ModerationQueue>,
    /// Citizen status change proposals and reviews.
    pub status_requests: Arc<dyn StatusRequestWorkflow>,
    /// Geospatial nearby query.
    pub nearby: Arc<dyn NearbySearch>,
    /// Account registration.
    pub users: Arc<dyn UserRegistry>,
    /// Bearer-token verification.
    pub verifier: Arc<dyn TokenVerifier>,
}

impl HttpState {
    /// Construct state from its port implementations.
    pub fn new(
        lifecycle: Arc<dyn IssueLifecycle>,
        moderation: Arc<dyn ModerationQueue>,
        status_requests: Arc<dyn StatusRequestWorkflow>,
        nearby: Arc<dyn NearbySearch>,
        users: Arc<dyn UserRegistry>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self {
            lifecycle,
            moderation,
            status_requests,
            nearby,
            users,
            verifier,
        }
    }
}
