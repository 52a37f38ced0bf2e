//! Storage-specific error types for SQLite operations.
//!
//! Diesel and r2d2 errors are wrapped here and converted to the
//! database-agnostic errors defined in `vuka_core` at the crate boundary.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;
use vuka_core::errors::{DatabaseError, Error};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Connection pool error: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Query execution failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Stored value is corrupt: {0}")]
    CorruptValue(String),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::PoolCreationFailed(e.to_string()))
            }
            StorageError::QueryFailed(DieselError::NotFound) => {
                Error::Database(DatabaseError::NotFound("Record not found".to_string()))
            }
            StorageError::QueryFailed(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => Error::Database(DatabaseError::UniqueViolation(info.message().to_string())),
            StorageError::QueryFailed(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                info,
            )) => Error::Database(DatabaseError::ForeignKeyViolation(
                info.message().to_string(),
            )),
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::CorruptValue(e) => Error::Database(DatabaseError::Internal(e)),
        }
    }
}

/// Extension trait for converting Diesel results to core results.
///
/// `From<DieselError> for vuka_core::Error` would break the orphan rule, so
/// repositories call `.into_core()` instead.
pub trait IntoCore<T> {
    fn into_core(self) -> vuka_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, DieselError> {
    fn into_core(self) -> vuka_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

/// Like [`IntoCore`], but a missing row becomes `Error::NotFound(what)`.
pub trait OrNotFound<T> {
    fn or_not_found(self, what: impl FnOnce() -> String) -> vuka_core::Result<T>;
}

impl<T> OrNotFound<T> for std::result::Result<T, DieselError> {
    fn or_not_found(self, what: impl FnOnce() -> String) -> vuka_core::Result<T> {
        match self {
            Err(DieselError::NotFound) => Err(Error::NotFound(what())),
            other => other.into_core(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_row_maps_to_not_found() {
        let err: Error = StorageError::QueryFailed(DieselError::NotFound).into();
        assert!(err.is_not_found());

        let named = Err::<(), _>(DieselError::NotFound)
            .or_not_found(|| "Invoice inv-1".to_string())
            .unwrap_err();
        assert!(matches!(named, Error::NotFound(ref what) if what == "Invoice inv-1"));
    }

    #[test]
    fn other_query_errors_stay_database_errors() {
        let err: Error = StorageError::QueryFailed(DieselError::RollbackTransaction).into();
        assert!(matches!(err, Error::Database(DatabaseError::QueryFailed(_))));
    }
}
