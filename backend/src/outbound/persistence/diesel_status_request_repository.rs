//! PostgreSQL-backed `StatusRequestRepository` implementation using
//! Diesel.
//!
//! Approval runs as one transaction covering three tables: the request
//! row flips to approved, the issue row takes the requested status, and
//! the audit entry is appended. The request row is locked first so a
//! concurrent second review fails with `AlreadyReviewed` instead of
//! double-applying.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::PgTextExpressionMethods;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::ports::{
    PendingRequestFilter, ReviewRecord, StatusRequestListing, StatusRequestRepository,
    StatusRequestRepositoryError,
};
use crate::domain::status_request::{
    APPROVAL_COMMENT, ReviewState, StatusRequest, StatusRequestId,
};

use super::helpers::{TxError, diesel_error_message, is_connection_error, pool_error_message};
use super::models::{
    NewStatusRequestRow, NewStatusLogRow, RowConversionError, StatusRequestRow,
};
use super::pool::DbPool;
use super::schema::{issues, status_logs, status_requests, users};

/// Diesel-backed implementation of the `StatusRequestRepository` port.
#[derive(Clone)]
pub struct DieselStatusRequestRepository {
    pool: DbPool,
}

impl DieselStatusRequestRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: super::pool::PoolError) -> StatusRequestRepositoryError {
    StatusRequestRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(
    error: &diesel::result::Error,
    operation: &str,
) -> StatusRequestRepositoryError {
    if is_connection_error(error) {
        return StatusRequestRepositoryError::connection(diesel_error_message(error, operation));
    }
    StatusRequestRepositoryError::query(diesel_error_message(error, operation))
}

fn map_tx_error(
    error: TxError<StatusRequestRepositoryError>,
    operation: &str,
) -> StatusRequestRepositoryError {
    match error {
        TxError::Db(error) => map_diesel_error(&error, operation),
        TxError::Domain(error) => error,
    }
}

fn map_row_error(error: &RowConversionError) -> StatusRequestRepositoryError {
    StatusRequestRepositoryError::query(error.to_string())
}

/// Lock the request row and fail unless it is still pending.
async fn lock_pending_request<C>(
    conn: &mut C,
    request_uuid: uuid::Uuid,
) -> Result<StatusRequestRow, TxError<StatusRequestRepositoryError>>
where
    C: diesel_async::AsyncConnection<Backend = diesel::pg::Pg> + Send,
{
    let locked: StatusRequestRow = status_requests::table
        .find(request_uuid)
        .select(StatusRequestRow::as_select())
        .for_update()
        .first(conn)
        .await
        .optional()?
        .ok_or(TxError::Domain(StatusRequestRepositoryError::NotFound))?;

    let state: ReviewState = locked.state.parse().map_err(|_| {
        TxError::Domain(StatusRequestRepositoryError::query(format!(
            "stored review state is not valid: {}",
            locked.state
        )))
    })?;
    if state != ReviewState::Pending {
        return Err(TxError::Domain(
            StatusRequestRepositoryError::AlreadyReviewed { state },
        ));
    }
    Ok(locked)
}

#[async_trait]
impl StatusRequestRepository for DieselStatusRequestRepository {
    async fn insert(&self, request: &StatusRequest) -> Result<(), StatusRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewStatusRequestRow::from_domain(request);

        diesel::insert_into(status_requests::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|error| map_diesel_error(&error, "insert status request"))
    }

    async fn find_by_id(
        &self,
        id: &StatusRequestId,
    ) -> Result<Option<StatusRequest>, StatusRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<StatusRequestRow> = status_requests::table
            .find(id.as_uuid())
            .select(StatusRequestRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(&error, "find status request"))?;
        row.map(StatusRequest::try_from)
            .transpose()
            .map_err(|error| map_row_error(&error))
    }

    async fn approve(
        &self,
        id: &StatusRequestId,
        review: &ReviewRecord,
    ) -> Result<StatusRequest, StatusRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let request_uuid = *id.as_uuid();
        let review = review.clone();

        let updated = conn
            .transaction::<_, TxError<StatusRequestRepositoryError>, _>(|conn| {
                async move {
                    let locked = lock_pending_request(conn, request_uuid).await?;

                    // The audit entry's old status comes from the issue
                    // row under lock, not the snapshot taken when the
                    // request was filed.
                    let issue_status: Option<String> = issues::table
                        .find(locked.issue_id)
                        .select(issues::status)
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?;
                    let old_status = issue_status.ok_or(TxError::Domain(
                        StatusRequestRepositoryError::IssueNotFound,
                    ))?;

                    diesel::update(issues::table.find(locked.issue_id))
                        .set((
                            issues::status.eq(&locked.requested_status),
                            issues::updated_at.eq(review.reviewed_at),
                        ))
                        .execute(conn)
                        .await?;

                    let comment = review
                        .comment
                        .clone()
                        .unwrap_or_else(|| APPROVAL_COMMENT.to_owned());
                    let log_row = NewStatusLogRow {
                        id: *review.log_id.as_uuid(),
                        issue_id: locked.issue_id,
                        actor_id: *review.reviewer_id.as_uuid(),
                        old_status: Some(old_status.as_str()),
                        new_status: locked.requested_status.as_str(),
                        comment: Some(comment.as_str()),
                        created_at: review.reviewed_at,
                    };
                    diesel::insert_into(status_logs::table)
                        .values(&log_row)
                        .execute(conn)
                        .await?;

                    let updated: StatusRequestRow =
                        diesel::update(status_requests::table.find(request_uuid))
                            .set((
                                status_requests::state.eq(ReviewState::Approved.as_str()),
                                status_requests::reviewer_id
                                    .eq(Some(*review.reviewer_id.as_uuid())),
                                status_requests::review_comment.eq(review.comment.as_deref()),
                                status_requests::reviewed_at.eq(Some(review.reviewed_at)),
                                status_requests::updated_at.eq(review.reviewed_at),
                            ))
                            .returning(StatusRequestRow::as_returning())
                            .get_result(conn)
                            .await?;
                    Ok(updated)
                }
                .scope_boxed()
            })
            .await
            .map_err(|error| map_tx_error(error, "approve status request"))?;

        StatusRequest::try_from(updated).map_err(|error| map_row_error(&error))
    }

    async fn reject(
        &self,
        id: &StatusRequestId,
        review: &ReviewRecord,
    ) -> Result<StatusRequest, StatusRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let request_uuid = *id.as_uuid();
        let review = review.clone();

        let updated = conn
            .transaction::<_, TxError<StatusRequestRepositoryError>, _>(|conn| {
                async move {
                    lock_pending_request(conn, request_uuid).await?;

                    let updated: StatusRequestRow =
                        diesel::update(status_requests::table.find(request_uuid))
                            .set((
                                status_requests::state.eq(ReviewState::Rejected.as_str()),
                                status_requests::reviewer_id
                                    .eq(Some(*review.reviewer_id.as_uuid())),
                                status_requests::review_comment.eq(review.comment.as_deref()),
                                status_requests::reviewed_at.eq(Some(review.reviewed_at)),
                                status_requests::updated_at.eq(review.reviewed_at),
                            ))
                            .returning(StatusRequestRow::as_returning())
                            .get_result(conn)
                            .await?;
                    Ok(updated)
                }
                .scope_boxed()
            })
            .await
            .map_err(|error| map_tx_error(error, "reject status request"))?;

        StatusRequest::try_from(updated).map_err(|error| map_row_error(&error))
    }

    async fn list(
        &self,
        filter: &PendingRequestFilter,
    ) -> Result<Vec<StatusRequestListing>, StatusRequestRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let state = filter.state.unwrap_or(ReviewState::Pending);

        let mut query = status_requests::table
            .inner_join(issues::table.on(issues::id.eq(status_requests::issue_id)))
            .inner_join(users::table.on(users::id.eq(status_requests::requester_id)))
            .filter(status_requests::state.eq(state.as_str()))
            .into_boxed();

        if let Some(search) = filter.search.as_deref() {
            let pattern = format!("%{search}%");
            query = query.filter(
                users::username
                    .ilike(pattern.clone())
                    .or(issues::title.ilike(pattern)),
            );
        }

        let rows: Vec<(StatusRequestRow, String, String)> = query
            .order(status_requests::created_at.desc())
            .select((
                StatusRequestRow::as_select(),
                issues::title,
                users::username,
            ))
            .load(&mut conn)
            .await
            .map_err(|error| map_diesel_error(&error, "list status requests"))?;

        rows.into_iter()
            .map(|(row, issue_title, requester_username)| {
                let request =
                    StatusRequest::try_from(row).map_err(|error| map_row_error(&error))?;
                Ok(StatusRequestListing {
                    request,
                    issue_title,
                    requester_username,
                })
            })
            .collect()
    }
}
