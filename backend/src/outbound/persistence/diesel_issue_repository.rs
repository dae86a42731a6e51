//! PostgreSQL-backed `IssueRepository` implementation using Diesel.
//!
//! Multi-row invariants are enforced here: create, update, and delete
//! each run in one transaction, and the read-then-write paths take a
//! `FOR UPDATE` lock on the issue row before touching anything.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use crate::domain::geo::BoundingBox;
use crate::domain::issue::{Issue, IssueId, IssuePatch, IssueStatus};
use crate::domain::ports::{IssueRepository, IssueRepositoryError, StatusTransition};
use crate::domain::status_log::StatusLog;

use super::helpers::{TxError, diesel_error_message, is_connection_error, pool_error_message};
use super::models::{
    IssueChanges, IssueRow, LocationChanges, LocationRow, NewIssueRow, NewLocationRow,
    NewStatusLogRow, RowConversionError, StatusLogRow, issue_from_rows,
};
use super::pool::DbPool;
use super::schema::{flags, issues, locations, status_logs, status_requests};

/// Diesel-backed implementation of the `IssueRepository` port.
#[derive(Clone)]
pub struct DieselIssueRepository {
    pool: DbPool,
}

impl DieselIssueRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: super::pool::PoolError) -> IssueRepositoryError {
    IssueRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: &diesel::result::Error, operation: &str) -> IssueRepositoryError {
    if is_connection_error(error) {
        return IssueRepositoryError::connection(diesel_error_message(error, operation));
    }
    IssueRepositoryError::query(diesel_error_message(error, operation))
}

fn map_tx_error(error: TxError<IssueRepositoryError>, operation: &str) -> IssueRepositoryError {
    match error {
        TxError::Db(error) => map_diesel_error(&error, operation),
        TxError::Domain(error) => error,
    }
}

fn map_row_error(error: &RowConversionError) -> IssueRepositoryError {
    IssueRepositoryError::query(error.to_string())
}

fn parse_row_status(status: &str) -> Result<IssueStatus, IssueRepositoryError> {
    status
        .parse()
        .map_err(|_| IssueRepositoryError::query(format!("stored issue status is not valid: {status}")))
}

#[async_trait]
impl IssueRepository for DieselIssueRepository {
    async fn create(
        &self,
        issue: &Issue,
        creation_log: &StatusLog,
    ) -> Result<(), IssueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let location_row = NewLocationRow::from_domain(&issue.location);
        let issue_row = NewIssueRow::from_domain(issue);
        let log_row = NewStatusLogRow::from_domain(creation_log);

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                diesel::insert_into(locations::table)
                    .values(&location_row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(issues::table)
                    .values(&issue_row)
                    .execute(conn)
                    .await?;
                diesel::insert_into(status_logs::table)
                    .values(&log_row)
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|error| map_diesel_error(&error, "create issue"))
    }

    async fn find_by_id(&self, id: &IssueId) -> Result<Option<Issue>, IssueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<(IssueRow, LocationRow)> = issues::table
            .inner_join(locations::table)
            .filter(issues::id.eq(id.as_uuid()))
            .select((IssueRow::as_select(), LocationRow::as_select()))
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(&error, "find issue"))?;

        row.map(|(issue, location)| issue_from_rows(issue, location))
            .transpose()
            .map_err(|error| map_row_error(&error))
    }

    async fn logs_for_issue(&self, id: &IssueId) -> Result<Vec<StatusLog>, IssueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<StatusLogRow> = status_logs::table
            .filter(status_logs::issue_id.eq(id.as_uuid()))
            .order(status_logs::created_at.desc())
            .select(StatusLogRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|error| map_diesel_error(&error, "load status logs"))?;

        rows.into_iter()
            .map(|row| StatusLog::try_from(row).map_err(|error| map_row_error(&error)))
            .collect()
    }

    async fn update(
        &self,
        id: &IssueId,
        patch: &IssuePatch,
        transition: Option<StatusTransition>,
        updated_at: DateTime<Utc>,
    ) -> Result<Issue, IssueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let issue_uuid = *id.as_uuid();
        let patch = patch.clone();

        let (issue_row, location_row) = conn
            .transaction::<_, TxError<IssueRepositoryError>, _>(|conn| {
                async move {
                    let locked: IssueRow = issues::table
                        .find(issue_uuid)
                        .select(IssueRow::as_select())
                        .for_update()
                        .first(conn)
                        .await
                        .optional()?
                        .ok_or(TxError::Domain(IssueRepositoryError::NotFound))?;

                    if let Some(transition) = &transition {
                        let actual = parse_row_status(&locked.status).map_err(TxError::Domain)?;
                        if actual != transition.expected_status {
                            return Err(TxError::Domain(IssueRepositoryError::StatusMismatch {
                                expected: transition.expected_status,
                                actual,
                            }));
                        }
                    }

                    let photos = if patch.appended_photos.is_empty() {
                        None
                    } else {
                        let mut combined = locked.photos.clone();
                        combined.extend(patch.appended_photos.iter().cloned());
                        Some(combined)
                    };

                    let changes = IssueChanges {
                        title: patch.title.as_deref(),
                        description: patch.description.as_deref(),
                        category: patch.category.map(|category| category.as_str()),
                        status: transition
                            .as_ref()
                            .map(|transition| transition.log.new_status.as_str()),
                        photos,
                        updated_at,
                    };
                    diesel::update(issues::table.find(issue_uuid))
                        .set(&changes)
                        .execute(conn)
                        .await?;

                    if patch.coordinates.is_some() || patch.address.is_some() {
                        let location_changes = LocationChanges {
                            latitude: patch.coordinates.map(|coordinates| coordinates.latitude),
                            longitude: patch.coordinates.map(|coordinates| coordinates.longitude),
                            address: patch.address.as_deref(),
                        };
                        diesel::update(locations::table.find(locked.location_id))
                            .set(&location_changes)
                            .execute(conn)
                            .await?;
                    }

                    if let Some(transition) = &transition {
                        let log_row = NewStatusLogRow::from_domain(&transition.log);
                        diesel::insert_into(status_logs::table)
                            .values(&log_row)
                            .execute(conn)
                            .await?;
                    }

                    let reloaded: (IssueRow, LocationRow) = issues::table
                        .inner_join(locations::table)
                        .filter(issues::id.eq(issue_uuid))
                        .select((IssueRow::as_select(), LocationRow::as_select()))
                        .first(conn)
                        .await?;
                    Ok(reloaded)
                }
                .scope_boxed()
            })
            .await
            .map_err(|error| map_tx_error(error, "update issue"))?;

        issue_from_rows(issue_row, location_row).map_err(|error| map_row_error(&error))
    }

    async fn delete(&self, id: &IssueId) -> Result<(), IssueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let issue_uuid = *id.as_uuid();

        conn.transaction::<_, TxError<IssueRepositoryError>, _>(|conn| {
            async move {
                let locked: IssueRow = issues::table
                    .find(issue_uuid)
                    .select(IssueRow::as_select())
                    .for_update()
                    .first(conn)
                    .await
                    .optional()?
                    .ok_or(TxError::Domain(IssueRepositoryError::NotFound))?;

                // Dependents first, then the issue, then its owned
                // location; no FK cascade is relied upon.
                diesel::delete(status_logs::table.filter(status_logs::issue_id.eq(issue_uuid)))
                    .execute(conn)
                    .await?;
                diesel::delete(flags::table.filter(flags::issue_id.eq(issue_uuid)))
                    .execute(conn)
                    .await?;
                diesel::delete(
                    status_requests::table.filter(status_requests::issue_id.eq(issue_uuid)),
                )
                .execute(conn)
                .await?;
                diesel::delete(issues::table.find(issue_uuid))
                    .execute(conn)
                    .await?;
                diesel::delete(locations::table.find(locked.location_id))
                    .execute(conn)
                    .await?;
                Ok(())
            }
            .scope_boxed()
        })
        .await
        .map_err(|error| map_tx_error(error, "delete issue"))
    }

    async fn find_in_box(
        &self,
        bounds: &BoundingBox,
    ) -> Result<Vec<Issue>, IssueRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<(IssueRow, LocationRow)> = issues::table
            .inner_join(locations::table)
            .filter(locations::latitude.between(bounds.min_latitude, bounds.max_latitude))
            .filter(locations::longitude.between(bounds.min_longitude, bounds.max_longitude))
            .order(issues::created_at.desc())
            .select((IssueRow::as_select(), LocationRow::as_select()))
            .load(&mut conn)
            .await
            .map_err(|error| map_diesel_error(&error, "find issues in box"))?;

        rows.into_iter()
            .map(|(issue, location)| {
                issue_from_rows(issue, location).map_err(|error| map_row_error(&error))
            })
            .collect()
    }
}
