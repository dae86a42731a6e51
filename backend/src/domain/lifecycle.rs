//! Issue lifecycle domain service.
//!
//! Implements the [`IssueLifecycle`] driving port: every status change is
//! paired with an audit entry in the same store transaction, and every
//! mutation is gated on the caller being the reporter or an
//! administrator.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::debug;

use crate::domain::access::Principal;
use crate::domain::error::Error;
use crate::domain::geo::{Coordinates, GeoValidationError, Location, LocationId};
use crate::domain::issue::{
    Issue, IssueId, IssuePatch, IssueStatus, IssueValidationError, validate_description,
    validate_title,
};
use crate::domain::ports::{
    ChangeStatusRequest, CreateIssueRequest, IssueDetail, IssueLifecycle, IssueRepository,
    IssueRepositoryError, StatusTransition, UpdateIssueRequest,
};
use crate::domain::status_log::{StatusLog, StatusLogId};

/// Issue lifecycle service backed by an [`IssueRepository`].
///
/// # Examples
/// ```no_run
/// use std::sync::Arc;
///
/// use backend::domain::IssueLifecycleService;
/// use backend::domain::ports::FixtureIssueRepository;
/// use mockable::DefaultClock;
///
/// let service =
///     IssueLifecycleService::new(Arc::new(FixtureIssueRepository), Arc::new(DefaultClock));
/// let _ = service;
/// ```
#[derive(Clone)]
pub struct IssueLifecycleService<R> {
    repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> IssueLifecycleService<R> {
    /// Create a new service over the given repository and clock.
    pub fn new(repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }
}

/// Map geographic validation failures to a domain error with field
/// details.
pub(crate) fn map_geo_error(error: &GeoValidationError) -> Error {
    let field = match error {
        GeoValidationError::LatitudeOutOfRange { .. } => "latitude",
        GeoValidationError::LongitudeOutOfRange { .. } => "longitude",
        GeoValidationError::InvalidRadius { .. } => "radius",
    };
    Error::invalid_request(error.to_string()).with_details(json!({ "field": field }))
}

fn map_issue_validation_error(error: &IssueValidationError) -> Error {
    let field = match error {
        IssueValidationError::EmptyTitle | IssueValidationError::TitleTooLong { .. } => "title",
        IssueValidationError::EmptyDescription => "description",
        IssueValidationError::UnknownCategory => "category",
        IssueValidationError::UnknownStatus => "status",
    };
    Error::invalid_request(error.to_string()).with_details(json!({ "field": field }))
}

fn map_repo_error(error: IssueRepositoryError) -> Error {
    match error {
        IssueRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("issue repository unavailable: {message}"))
        }
        IssueRepositoryError::Query { message } => {
            Error::internal(format!("issue repository error: {message}"))
        }
        IssueRepositoryError::NotFound => Error::not_found("issue not found"),
        IssueRepositoryError::StatusMismatch { expected, actual } => {
            Error::conflict("issue status changed concurrently").with_details(json!({
                "expectedStatus": expected.as_str(),
                "actualStatus": actual.as_str(),
            }))
        }
    }
}

fn forbidden() -> Error {
    Error::forbidden("caller is neither the reporter nor an administrator")
}

impl<R> IssueLifecycleService<R>
where
    R: IssueRepository,
{
    async fn load_issue(&self, issue_id: &IssueId) -> Result<Issue, Error> {
        self.repo
            .find_by_id(issue_id)
            .await
            .map_err(map_repo_error)?
            .ok_or_else(|| Error::not_found("issue not found"))
    }

    async fn detail_for(&self, issue: Issue) -> Result<IssueDetail, Error> {
        let logs = self
            .repo
            .logs_for_issue(&issue.id)
            .await
            .map_err(map_repo_error)?;
        Ok(IssueDetail { issue, logs })
    }

    /// Shared path for field patches and status transitions; both trait
    /// operations funnel through here so a bundled request stays one
    /// store transaction.
    async fn apply_update(
        &self,
        issue_id: IssueId,
        principal: Principal,
        patch: IssuePatch,
        new_status: Option<IssueStatus>,
        status_comment: Option<String>,
    ) -> Result<IssueDetail, Error> {
        patch
            .validate()
            .map_err(|err| map_issue_validation_error(&err))?;
        if let Some(coordinates) = patch.coordinates {
            Coordinates::new(coordinates.latitude, coordinates.longitude)
                .map_err(|err| map_geo_error(&err))?;
        }

        let issue = self.load_issue(&issue_id).await?;
        if !principal.can_mutate(&issue.reporter_id) {
            return Err(forbidden());
        }

        let now = self.clock.utc();
        let transition = match new_status {
            None => None,
            Some(status) if status == issue.status => {
                // Explicit same-value request: succeed without a log.
                debug!(issue_id = %issue_id, status = %status, "same-status change is a no-op");
                None
            }
            Some(status) => {
                let comment = status_comment.unwrap_or_else(|| {
                    format!("Status changed from {} to {}", issue.status, status)
                });
                Some(StatusTransition {
                    expected_status: issue.status,
                    log: StatusLog {
                        id: StatusLogId::random(),
                        issue_id,
                        actor_id: principal.user_id,
                        old_status: Some(issue.status),
                        new_status: status,
                        comment: Some(comment),
                        created_at: now,
                    },
                })
            }
        };

        if patch.is_empty() && transition.is_none() {
            return self.detail_for(issue).await;
        }

        let updated = self
            .repo
            .update(&issue_id, &patch, transition, now)
            .await
            .map_err(map_repo_error)?;
        self.detail_for(updated).await
    }
}

#[async_trait]
impl<R> IssueLifecycle for IssueLifecycleService<R>
where
    R: IssueRepository,
{
    async fn create_issue(&self, request: CreateIssueRequest) -> Result<IssueDetail, Error> {
        validate_title(&request.title).map_err(|err| map_issue_validation_error(&err))?;
        validate_description(&request.description)
            .map_err(|err| map_issue_validation_error(&err))?;
        let coordinates = Coordinates::new(request.latitude, request.longitude)
            .map_err(|err| map_geo_error(&err))?;

        let now = self.clock.utc();
        let issue = Issue {
            id: IssueId::random(),
            title: request.title,
            description: request.description,
            category: request.category,
            status: IssueStatus::INITIAL,
            photos: request.photos,
            reporter_id: request.principal.user_id,
            location: Location {
                id: LocationId::random(),
                coordinates,
                address: request.address,
            },
            created_at: now,
            updated_at: now,
        };
        let creation_log = StatusLog::creation_entry(issue.id, request.principal.user_id, now);

        self.repo
            .create(&issue, &creation_log)
            .await
            .map_err(map_repo_error)?;
        debug!(issue_id = %issue.id, "issue created");

        Ok(IssueDetail {
            issue,
            logs: vec![creation_log],
        })
    }

    async fn get_issue(&self, issue_id: &IssueId) -> Result<IssueDetail, Error> {
        let issue = self.load_issue(issue_id).await?;
        self.detail_for(issue).await
    }

    async fn update_issue(&self, request: UpdateIssueRequest) -> Result<IssueDetail, Error> {
        self.apply_update(
            request.issue_id,
            request.principal,
            request.patch,
            request.new_status,
            request.status_comment,
        )
        .await
    }

    async fn change_status(&self, request: ChangeStatusRequest) -> Result<IssueDetail, Error> {
        self.apply_update(
            request.issue_id,
            request.principal,
            IssuePatch::default(),
            Some(request.new_status),
            request.comment,
        )
        .await
    }

    async fn delete_issue(
        &self,
        issue_id: &IssueId,
        principal: &Principal,
    ) -> Result<(), Error> {
        let issue = self.load_issue(issue_id).await?;
        if !principal.can_mutate(&issue.reporter_id) {
            return Err(forbidden());
        }
        self.repo.delete(issue_id).await.map_err(map_repo_error)?;
        debug!(issue_id = %issue_id, "issue deleted with its dependents");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use chrono::Utc;
    use mockable::DefaultClock;
    use rstest::rstest;

    use super::*;
    use crate::domain::error::ErrorCode;
    use crate::domain::issue::IssueCategory;
    use crate::domain::ports::MockIssueRepository;
    use crate::domain::user::{Role, UserId};

    fn service(repo: MockIssueRepository) -> IssueLifecycleService<MockIssueRepository> {
        IssueLifecycleService::new(Arc::new(repo), Arc::new(DefaultClock))
    }

    fn sample_issue(reporter: UserId, status: IssueStatus) -> Issue {
        let now = Utc::now();
        Issue {
            id: IssueId::random(),
            title: "Broken street light".to_owned(),
            description: "The light on the corner is out".to_owned(),
            category: IssueCategory::Electricity,
            status,
            photos: Vec::new(),
            reporter_id: reporter,
            location: Location {
                id: LocationId::random(),
                coordinates: Coordinates::new(40.7128, -74.0060).expect("coords"),
                address: None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    fn create_request(principal: Principal) -> CreateIssueRequest {
        CreateIssueRequest {
            principal,
            title: "Pothole on Main St".to_owned(),
            description: "Large pothole near the crossing".to_owned(),
            category: IssueCategory::Road,
            latitude: 40.7128,
            longitude: -74.0060,
            address: Some("Main St 12".to_owned()),
            photos: vec!["photos/1.jpg".to_owned()],
        }
    }

    #[rstest]
    #[tokio::test]
    async fn create_issue_writes_creation_log() {
        let principal = Principal::new(UserId::random(), Role::User);
        let mut repo = MockIssueRepository::new();
        repo.expect_create().times(1).return_once(|issue, log| {
            assert_eq!(issue.status, IssueStatus::Reported);
            assert_eq!(log.old_status, None);
            assert_eq!(log.new_status, IssueStatus::Reported);
            assert_eq!(log.issue_id, issue.id);
            Ok(())
        });

        let detail = service(repo)
            .create_issue(create_request(principal))
            .await
            .expect("create succeeds");

        assert_eq!(detail.issue.reporter_id, principal.user_id);
        assert_eq!(detail.logs.len(), 1);
    }

    #[rstest]
    #[case("", "desc")]
    #[case("title", "   ")]
    #[tokio::test]
    async fn create_issue_rejects_blank_fields(#[case] title: &str, #[case] description: &str) {
        let principal = Principal::new(UserId::random(), Role::User);
        let request = CreateIssueRequest {
            title: title.to_owned(),
            description: description.to_owned(),
            ..create_request(principal)
        };

        let err = service(MockIssueRepository::new())
            .create_issue(request)
            .await
            .expect_err("validation fails");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn create_issue_rejects_out_of_range_coordinates() {
        let principal = Principal::new(UserId::random(), Role::User);
        let request = CreateIssueRequest {
            latitude: 95.0,
            ..create_request(principal)
        };

        let err = service(MockIssueRepository::new())
            .create_issue(request)
            .await
            .expect_err("validation fails");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[rstest]
    #[tokio::test]
    async fn same_status_change_is_a_no_op() {
        let reporter = UserId::random();
        let issue = sample_issue(reporter, IssueStatus::Reported);
        let issue_id = issue.id;
        let logs_issue = issue.clone();

        let mut repo = MockIssueRepository::new();
        repo.expect_find_by_id()
            .times(1)
            .return_once(move |_| Ok(Some(issue)));
        repo.expect_logs_for_issue()
            .times(1)
            .return_once(move |_| {
                Ok(vec![StatusLog::creation_entry(
                    logs_issue.id,
                    logs_issue.reporter_id,
                    logs_issue.created_at,
                )])
            });
        // No update expectation: the repository must not be written.

        let detail = service(repo)
            .change_status(ChangeStatusRequest {
                issue_id,
                principal: Principal::new(reporter, Role::User),
                new_status: IssueStatus::Reported,
                comment: None,
            })
            .await
            .expect("no-op succeeds");

        assert_eq!(detail.issue.status, IssueStatus::Reported);
        assert_eq!(detail.logs.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn status_change_pairs_update_with_log() {
        let reporter = UserId::random();
        let issue = sample_issue(reporter, IssueStatus::Reported);
        let issue_id = issue.id;
        let updated = Issue {
            status: IssueStatus::InProgress,
            ..issue.clone()
        };

        let mut repo = MockIssueRepository::new();
        repo.expect_find_by_id()
            .times(1)
            .return_once(move |_| Ok(Some(issue)));
        repo.expect_update()
            .times(1)
            .withf(|_, patch, transition, _| {
                let Some(transition) = transition else {
                    return false;
                };
                patch.is_empty()
                    && transition.expected_status == IssueStatus::Reported
                    && transition.log.old_status == Some(IssueStatus::Reported)
                    && transition.log.new_status == IssueStatus::InProgress
            })
            .return_once(move |_, _, _, _| Ok(updated));
        repo.expect_logs_for_issue()
            .times(1)
            .return_once(|_| Ok(Vec::new()));

        let detail = service(repo)
            .change_status(ChangeStatusRequest {
                issue_id,
                principal: Principal::new(reporter, Role::User),
                new_status: IssueStatus::InProgress,
                comment: Some("Crew dispatched".to_owned()),
            })
            .await
            .expect("change succeeds");

        assert_eq!(detail.issue.status, IssueStatus::InProgress);
    }

    #[rstest]
    #[tokio::test]
    async fn stranger_cannot_change_status() {
        let issue = sample_issue(UserId::random(), IssueStatus::Reported);
        let issue_id = issue.id;

        let mut repo = MockIssueRepository::new();
        repo.expect_find_by_id()
            .times(1)
            .return_once(move |_| Ok(Some(issue)));

        let err = service(repo)
            .change_status(ChangeStatusRequest {
                issue_id,
                principal: Principal::new(UserId::random(), Role::User),
                new_status: IssueStatus::Closed,
                comment: None,
            })
            .await
            .expect_err("forbidden");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_status_mismatch_maps_to_conflict() {
        let reporter = UserId::random();
        let issue = sample_issue(reporter, IssueStatus::Reported);
        let issue_id = issue.id;

        let mut repo = MockIssueRepository::new();
        repo.expect_find_by_id()
            .times(1)
            .return_once(move |_| Ok(Some(issue)));
        repo.expect_update().times(1).return_once(|_, _, _, _| {
            Err(IssueRepositoryError::StatusMismatch {
                expected: IssueStatus::Reported,
                actual: IssueStatus::Closed,
            })
        });

        let err = service(repo)
            .change_status(ChangeStatusRequest {
                issue_id,
                principal: Principal::new(reporter, Role::User),
                new_status: IssueStatus::InProgress,
                comment: None,
            })
            .await
            .expect_err("conflict");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[rstest]
    #[tokio::test]
    async fn missing_issue_maps_to_not_found() {
        let mut repo = MockIssueRepository::new();
        repo.expect_find_by_id().times(1).return_once(|_| Ok(None));

        let err = service(repo)
            .get_issue(&IssueId::random())
            .await
            .expect_err("not found");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_requires_ownership() {
        let issue = sample_issue(UserId::random(), IssueStatus::Reported);
        let issue_id = issue.id;

        let mut repo = MockIssueRepository::new();
        repo.expect_find_by_id()
            .times(1)
            .return_once(move |_| Ok(Some(issue)));

        let err = service(repo)
            .delete_issue(&issue_id, &Principal::new(UserId::random(), Role::User))
            .await
            .expect_err("forbidden");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[rstest]
    #[tokio::test]
    async fn admin_can_delete_any_issue() {
        let issue = sample_issue(UserId::random(), IssueStatus::Reported);
        let issue_id = issue.id;

        let mut repo = MockIssueRepository::new();
        repo.expect_find_by_id()
            .times(1)
            .return_once(move |_| Ok(Some(issue)));
        repo.expect_delete().times(1).return_once(|_| Ok(()));

        service(repo)
            .delete_issue(&issue_id, &Principal::new(UserId::random(), Role::Admin))
            .await
            .expect("delete succeeds");
    }
}
