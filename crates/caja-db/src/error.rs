//! # Storage Errors
//!
//! ```text
//!   sqlx::Error ─────────┐
//!   MigrateError ────────┤
//!   timeout elapsed ─────┼──► DbError ──► ApiError (terminal)
//!   CoreError (in tx) ───┘     │
//!                              └── Rule(_) is a business rejection,
//!                                  everything else a persistence failure
//! ```

use caja_core::{CoreError, ValidationError};
use thiserror::Error;

/// Why a storage call failed.
///
/// Every variant except [`DbError::Rule`] is a persistence failure: the
/// store rejected or never completed the operation, and nothing was
/// applied.
#[derive(Debug, Error)]
pub enum DbError {
    /// No row with that id.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// SQLite rejected a row on a UNIQUE constraint. `field` is the raw
    /// `table.column`.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// A user-chosen value that is already taken (a username).
    #[error("{field} '{value}' is already taken")]
    Duplicate { field: String, value: String },

    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// The file could not be opened, or the pool was already closed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// SQLite refused the statement: a CHECK constraint (negative stock,
    /// unknown movement type) or the append-only triggers on
    /// `transactions` / `cash_movements`.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A cart-line commit lost its race: the stock changed between the
    /// read and the conditional update, or BEGIN/COMMIT was refused.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// No connection became free within `connect_timeout`.
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// The operation did not finish within the configured time.
    #[error("Database operation timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// A business rule rejected the operation inside a storage transaction.
    #[error(transparent)]
    Rule(#[from] CoreError),

    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Names the taken value; sqlx only reports the column.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::Duplicate {
            field: field.into(),
            value: value.into(),
        }
    }

    /// True for failures of the store itself, as opposed to rejections of
    /// what the user asked for.
    pub fn is_persistence(&self) -> bool {
        !matches!(self, DbError::Rule(_) | DbError::Duplicate { .. })
    }
}

/// SQLite reports constraint failures only as message text, so the
/// message prefix decides the variant.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // "UNIQUE constraint failed: <table>.<column>"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
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

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Rule(CoreError::Validation(err))
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

pub type DbResult<T> = Result<T, DbError>;
