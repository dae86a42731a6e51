//! Shared helpers for Diesel repository implementations.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Extract a readable message from a pool error.
pub fn pool_error_message(error: PoolError) -> String {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => message,
    }
}

/// Extract a readable message from a Diesel error and emit debug
/// context for operators.
pub fn diesel_error_message(error: &DieselError, operation: &str) -> String {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        other => {
            debug!(
                error_type = %std::any::type_name_of_val(other),
                %operation,
                "diesel operation failed"
            );
        }
    }
    error.to_string()
}

/// Error threaded through a Diesel transaction closure.
///
/// Domain outcomes (not-found, concurrency conflicts) must roll the
/// transaction back just like database failures, so both travel in the
/// closure's error position and are split apart after commit/rollback.
#[derive(Debug)]
pub enum TxError<E> {
    /// Underlying Diesel failure.
    Db(DieselError),
    /// Port-level outcome that aborts the transaction.
    Domain(E),
}

impl<E> From<DieselError> for TxError<E> {
    fn from(error: DieselError) -> Self {
        Self::Db(error)
    }
}

/// The violated constraint's name, when `error` is a unique violation.
pub fn unique_violation_constraint(error: &DieselError) -> Option<&str> {
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            info.constraint_name()
        }
        _ => None,
    }
}

/// Whether the error means the connection is gone rather than the query
/// being bad.
pub fn is_connection_error(error: &DieselError) -> bool {
    matches!(
        error,
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
            | DieselError::BrokenTransactionManager
    )
}
