//! PostgreSQL-backed `FlagRepository` implementation using Diesel.
//!
//! The (issue, flagger) unique constraint is the last line of defence
//! against duplicate flags; a violation maps to the port's `Duplicate`
//! variant so racing callers get a conflict, not an internal error.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::flag::{Flag, FlagId};
use crate::domain::issue::IssueId;
use crate::domain::ports::{FlagRepository, FlagRepositoryError};
use crate::domain::user::UserId;

use super::helpers::{
    diesel_error_message, is_connection_error, pool_error_message, unique_violation_constraint,
};
use super::models::{FlagRow, NewFlagRow};
use super::pool::DbPool;
use super::schema::flags;

/// Diesel-backed implementation of the `FlagRepository` port.
#[derive(Clone)]
pub struct DieselFlagRepository {
    pool: DbPool,
}

impl DieselFlagRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: super::pool::PoolError) -> FlagRepositoryError {
    FlagRepositoryError::connection(pool_error_message(error))
}

fn map_diesel_error(error: &diesel::result::Error, operation: &str) -> FlagRepositoryError {
    if unique_violation_constraint(error).is_some() {
        return FlagRepositoryError::Duplicate;
    }
    if is_connection_error(error) {
        return FlagRepositoryError::connection(diesel_error_message(error, operation));
    }
    FlagRepositoryError::query(diesel_error_message(error, operation))
}

#[async_trait]
impl FlagRepository for DieselFlagRepository {
    async fn insert(&self, flag: &Flag) -> Result<(), FlagRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row = NewFlagRow::from_domain(flag);

        diesel::insert_into(flags::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|error| map_diesel_error(&error, "insert flag"))
    }

    async fn find_by_id(&self, id: &FlagId) -> Result<Option<Flag>, FlagRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<FlagRow> = flags::table
            .find(id.as_uuid())
            .select(FlagRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(&error, "find flag"))?;
        Ok(row.map(Flag::from))
    }

    async fn find_for_issue_and_user(
        &self,
        issue_id: &IssueId,
        flagger_id: &UserId,
    ) -> Result<Option<Flag>, FlagRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<FlagRow> = flags::table
            .filter(flags::issue_id.eq(issue_id.as_uuid()))
            .filter(flags::flagger_id.eq(flagger_id.as_uuid()))
            .select(FlagRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(&error, "find flag for issue and user"))?;
        Ok(row.map(Flag::from))
    }

    async fn mark_resolved(
        &self,
        id: &FlagId,
        resolved_at: DateTime<Utc>,
    ) -> Result<Flag, FlagRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row: Option<FlagRow> = diesel::update(flags::table.find(id.as_uuid()))
            .set((
                flags::resolved.eq(true),
                flags::resolved_at.eq(Some(resolved_at)),
            ))
            .returning(FlagRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(|error| map_diesel_error(&error, "resolve flag"))?;
        row.map(Flag::from).ok_or(FlagRepositoryError::NotFound)
    }

    async fn unresolved_for_issue(
        &self,
        issue_id: &IssueId,
    ) -> Result<Vec<Flag>, FlagRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows: Vec<FlagRow> = flags::table
            .filter(flags::issue_id.eq(issue_id.as_uuid()))
            .filter(flags::resolved.eq(false))
            .order(flags::created_at.asc())
            .select(FlagRow::as_select())
            .load(&mut conn)
            .await
            .map_err(|error| map_diesel_error(&error, "list unresolved flags"))?;
        Ok(rows.into_iter().map(Flag::from).collect())
    }
}
