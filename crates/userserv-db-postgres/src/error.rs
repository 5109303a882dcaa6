//! Error types for the PostgreSQL storage backend.

use sqlx_core::error::Error as SqlxError;
use userserv_storage::StorageError;

/// PostgreSQL error code for unique violation (23505).
pub const PG_UNIQUE_VIOLATION: &str = "23505";

/// PostgreSQL error code for foreign key violation (23503).
pub const PG_FOREIGN_KEY_VIOLATION: &str = "23503";

/// Checks if a sqlx error has a specific PostgreSQL error code.
pub fn has_pg_error_code(err: &SqlxError, code: &str) -> bool {
    if let SqlxError::Database(db_err) = err {
        db_err.code().as_deref() == Some(code)
    } else {
        false
    }
}

/// Name of the violated constraint, if the error carries one.
fn constraint_name(err: &SqlxError) -> Option<&str> {
    match err {
        SqlxError::Database(db_err) => db_err.constraint(),
        _ => None,
    }
}

/// Errors specific to the PostgreSQL storage backend.
#[derive(Debug, thiserror::Error)]
pub enum PostgresError {
    /// Database connection error.
    #[error("Database connection error: {0}")]
    Connection(#[from] SqlxError),

    /// Migration error.
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<PostgresError> for StorageError {
    fn from(err: PostgresError) -> Self {
        match err {
            PostgresError::Connection(e) => StorageError::connection_error(e.to_string()),
            PostgresError::Migration(e) => StorageError::internal(format!("Migration error: {e}")),
        }
    }
}

/// Result type alias for PostgreSQL operations.
pub type Result<T> = std::result::Result<T, PostgresError>;

/// Maps a query error to a storage error.
///
/// Unique violations become `Conflict` on the column the constraint guards;
/// `value` is the offending value as the caller knows it.
pub(crate) fn map_query_error(err: SqlxError, value: &str) -> StorageError {
    if has_pg_error_code(&err, PG_UNIQUE_VIOLATION) {
        let field = match constraint_name(&err) {
            Some("principals_email_key") => "email",
            Some("cards_number_key") => "number",
            _ => "id",
        };
        return StorageError::conflict(field, value);
    }
    if has_pg_error_code(&err, PG_FOREIGN_KEY_VIOLATION) {
        return StorageError::foreign_key_violation(err.to_string());
    }
    match err {
        SqlxError::PoolTimedOut | SqlxError::PoolClosed | SqlxError::Io(_) | SqlxError::Tls(_) => {
            StorageError::connection_error(err.to_string())
        }
        other => StorageError::internal(format!("Query failed: {other}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_errors_are_connection_errors() {
        let err = map_query_error(SqlxError::PoolTimedOut, "x");
        assert!(err.is_unavailable());

        let err = map_query_error(SqlxError::RowNotFound, "x");
        assert!(matches!(err, StorageError::Internal { .. }));
    }

    #[test]
    fn test_postgres_error_into_storage_error() {
        let err: StorageError = PostgresError::Migration("boom".into()).into();
        assert!(matches!(err, StorageError::Internal { .. }));

        let err: StorageError = PostgresError::Connection(SqlxError::PoolClosed).into();
        assert!(err.is_unavailable());
    }
}
