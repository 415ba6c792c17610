//! Translation of Diesel and pool failures into [`SongRepositoryError`].

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::SongRepositoryError;

use super::pool::PoolError;

/// Pool failures always mean the store is unreachable.
pub(crate) fn map_pool_error(error: PoolError) -> SongRepositoryError {
    SongRepositoryError::connection(error.into_message())
}

/// Map a Diesel failure, keeping the store's message for constraint
/// violations.
pub(crate) fn map_diesel_error(error: DieselError) -> SongRepositoryError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(
                ?kind,
                message = info.message(),
                constraint = info.constraint_name(),
                "diesel operation failed"
            );
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation
            | DatabaseErrorKind::ForeignKeyViolation
            | DatabaseErrorKind::NotNullViolation
            | DatabaseErrorKind::CheckViolation,
            info,
        ) => SongRepositoryError::constraint(info.message()),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            SongRepositoryError::connection("database connection error")
        }
        DieselError::DatabaseError(_, info) => SongRepositoryError::query(info.message()),
        DieselError::NotFound => SongRepositoryError::query("record not found"),
        DieselError::QueryBuilderError(_) => SongRepositoryError::query("database query error"),
        other => SongRepositoryError::query(other.to_string()),
    }
}
