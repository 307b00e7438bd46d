//! Database error types
//!
//! Domain errors raised inside a repository workflow are carried through
//! unchanged so the API layer can map them to the right status code.

use thiserror::Error;

use core_kernel::MoneyError;
use domain_directory::DirectoryError;
use domain_renewal::RenewalError;
use domain_settlement::SettlementError;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation (SQLSTATE 23505)
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key violation (SQLSTATE 23503)
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation (SQLSTATE 23514)
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// A stored value could not be mapped back to a domain type
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Connection pool exhausted")]
    PoolExhausted,

    #[error("SQL error: {0}")]
    SqlError(#[source] sqlx::Error),

    #[error(transparent)]
    Settlement(#[from] SettlementError),

    #[error(transparent)]
    Renewal(#[from] RenewalError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl DatabaseError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        DatabaseError::NotFound(format!("{} with id '{}' not found", entity, id))
    }

    pub fn duplicate(entity: &str, field: &str, value: impl std::fmt::Display) -> Self {
        DatabaseError::DuplicateEntry(format!(
            "{} with {} '{}' already exists",
            entity, field, value
        ))
    }

    /// Stored column value that no domain variant accepts
    pub fn corrupt(column: &str, detail: impl std::fmt::Display) -> Self {
        DatabaseError::SerializationError(format!("{}: {}", column, detail))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DatabaseError::NotFound(_))
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            DatabaseError::DuplicateEntry(_)
                | DatabaseError::ForeignKeyViolation(_)
                | DatabaseError::ConstraintViolation(_)
        )
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            DatabaseError::ConnectionFailed(_) | DatabaseError::PoolExhausted
        )
    }
}

/// Maps PostgreSQL error codes to specific variants
///
/// See <https://www.postgresql.org/docs/current/errcodes-appendix.html>
impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut => DatabaseError::PoolExhausted,
            sqlx::Error::Database(ref db_err) => {
                let message = db_err.message().to_string();
                let code = db_err.code().map(|c| c.into_owned());
                match code.as_deref() {
                    Some("23505") => DatabaseError::DuplicateEntry(message),
                    Some("23503") => DatabaseError::ForeignKeyViolation(message),
                    Some("23514") => DatabaseError::ConstraintViolation(message),
                    _ => DatabaseError::SqlError(error),
                }
            }
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                DatabaseError::SerializationError(error.to_string())
            }
            other => DatabaseError::SqlError(other),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DatabaseError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        DatabaseError::MigrationFailed(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = DatabaseError::not_found("Renewal", "RNW-1");
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Renewal"));
    }

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: DatabaseError = sqlx::Error::RowNotFound.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_pool_timeout_is_connection_error() {
        let err: DatabaseError = sqlx::Error::PoolTimedOut.into();
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_domain_errors_pass_through() {
        let err: DatabaseError = SettlementError::NothingToSettle("agent".into()).into();
        assert!(matches!(err, DatabaseError::Settlement(_)));
        assert!(err.to_string().contains("Nothing to settle"));
    }
}
