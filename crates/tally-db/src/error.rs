//! # Database Error Types
//!
//! Error types for database operations.
//!
//! ## Error Flow
//! ```text
//! SQLite error (sqlx::Error)
//!      │
//!      ▼
//! DbError (this module) - adds context and categorization; business
//!      │                  errors raised mid-transaction arrive as the
//!      │                  transparent Domain variant
//!      ▼
//! HTTP layer (external) maps variants to status codes:
//!   NotFound / Domain(ProductNotFound)   -> 404
//!   Domain(InsufficientStock/Validation) -> 400
//!   Conflict                             -> 409
//! ```

use thiserror::Error;

use tally_core::CoreError;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context for
/// debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A concurrent writer won the race.
    ///
    /// ## When This Occurs
    /// - Invoice number collision between two same-day sales
    /// - Product version guard mismatch (stock/price changed underneath
    ///   an open transaction)
    ///
    /// Retryable: the movement recorder and the sale builder re-run the
    /// whole transaction a bounded number of times before surfacing this.
    #[error("Conflict on {resource}, concurrent update in progress")]
    Conflict { resource: String },

    /// Unique constraint violation outside the retryable invoice path.
    #[error("Duplicate {field}: already exists")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use past the acquire timeout).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Business rule violation from tally-core.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a retryable Conflict error.
    pub fn conflict(resource: impl Into<String>) -> Self {
        DbError::Conflict {
            resource: resource.into(),
        }
    }

    /// Whether re-running the failed transaction can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DbError::Conflict { .. } | DbError::PoolExhausted)
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    -> DbError::NotFound
/// sqlx::Error::Database       -> Analyze message for constraint type
/// sqlx::Error::PoolTimedOut   -> DbError::PoolExhausted
/// Other                       -> DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite reports constraints in the message text:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(DbError::conflict("sales.invoice_number").is_retryable());
        assert!(DbError::PoolExhausted.is_retryable());
        assert!(!DbError::not_found("Product", "p1").is_retryable());
        assert!(!DbError::Internal("boom".to_string()).is_retryable());
    }

    #[test]
    fn test_domain_errors_pass_through() {
        let err: DbError = CoreError::ProductNotFound("p1".to_string()).into();
        assert_eq!(err.to_string(), "Product not found: p1");
    }
}
