//! Shared fixtures for the behaviour suites: every service wired over
//! one in-memory store, with a settable clock.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use mockable::Clock;

use backend::domain::ports::{CreateIssueRequest, IssueDetail, IssueLifecycle, UserRegistry};
use backend::domain::ports::RegisterUserRequest;
use backend::domain::user::Role;
use backend::domain::{
    IssueCategory, IssueLifecycleService, ModerationService, NearbySearchService, Principal,
    StatusRequestService, User, UserRegistryService,
};
use backend::test_support::{InMemoryStore, MutableClock};

/// Every domain service wired over one shared in-memory store.
pub struct TestContext {
    pub store: InMemoryStore,
    pub clock: Arc<MutableClock>,
    pub lifecycle: IssueLifecycleService<InMemoryStore>,
    pub moderation: ModerationService<InMemoryStore, InMemoryStore>,
    pub workflow: StatusRequestService<InMemoryStore, InMemoryStore>,
    pub nearby: NearbySearchService<InMemoryStore>,
    pub registry: UserRegistryService<InMemoryStore>,
}

/// Build a context with the clock frozen at a fixed instant.
pub fn context() -> TestContext {
    let store = InMemoryStore::new();
    let clock = Arc::new(MutableClock::new(
        Utc.with_ymd_and_hms(2026, 2, 14, 12, 0, 0).single().expect("valid instant"),
    ));
    let clock_dyn: Arc<dyn Clock> = clock.clone();
    let issues = Arc::new(store.clone());

    TestContext {
        lifecycle: IssueLifecycleService::new(issues.clone(), clock_dyn.clone()),
        moderation: ModerationService::new(
            Arc::new(store.clone()),
            issues.clone(),
            clock_dyn.clone(),
        ),
        workflow: StatusRequestService::new(
            Arc::new(store.clone()),
            issues.clone(),
            clock_dyn.clone(),
        ),
        nearby: NearbySearchService::new(issues),
        registry: UserRegistryService::new(Arc::new(store.clone()), clock_dyn),
        store,
        clock,
    }
}

/// Register an account and return it with its principal.
pub async fn register(ctx: &TestContext, username: &str, role: Role) -> (User, Principal) {
    let user = ctx
        .registry
        .register(RegisterUserRequest {
            username: username.to_owned(),
            email: format!("{username}@example.com"),
            password_hash: "argon2id$derived".to_owned(),
            role,
        })
        .await
        .expect("registration succeeds");
    let principal = Principal::new(user.id, role);
    (user, principal)
}

/// Report an issue at the given coordinates.
pub async fn report_issue(
    ctx: &TestContext,
    principal: Principal,
    title: &str,
    latitude: f64,
    longitude: f64,
) -> IssueDetail {
    ctx.lifecycle
        .create_issue(CreateIssueRequest {
            principal,
            title: title.to_owned(),
            description: format!("{title} reported by a citizen"),
            category: IssueCategory::Road,
            latitude,
            longitude,
            address: None,
            photos: Vec::new(),
        })
        .await
        .expect("issue creation succeeds")
}
