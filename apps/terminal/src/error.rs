//! # API Error Type
//!
//! Unified error type for terminal commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Caja POS                               │
//! │                                                                         │
//! │  Command Function  →  Result<T, ApiError>                               │
//! │         │                                                               │
//! │         ├── ValidationError ─────────┐  form input, tender rules       │
//! │         ├── CoreError (state gate) ──┤  register closed, forbidden     │
//! │         ├── DbError (persistence) ───┤  internals logged, not shown    │
//! │         │                            ▼                                  │
//! │         │                     ApiError { code, message }               │
//! │         ▼                            │                                  │
//! │  caja prints `error: <message>` ◄────┘  (or JSON with --json)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages are short and human readable; no internal identifiers or
//! driver messages reach the user.

use serde::Serialize;
use tracing::error;

use caja_core::{CoreError, Transaction, ValidationError};
use caja_db::DbError;

/// Error returned from every command.
///
/// ```json
/// { "code": "REGISTER_STATE", "message": "The cash register is closed" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found
    NotFound,

    /// Input validation failed
    ValidationError,

    /// No user logged in, or wrong credentials
    Unauthorized,

    /// Logged-in user lacks the required role
    Forbidden,

    /// Operation not allowed in the register's current state
    RegisterState,

    /// Insufficient stock
    InsufficientStock,

    /// Tendered amount does not satisfy the payment rules
    PaymentError,

    /// Business rule rejected the operation
    BusinessLogic,

    /// Database operation failed
    DatabaseError,

    /// Database did not answer in time
    Timeout,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }

    /// True for failures of the store (including timeouts).
    pub fn is_persistence(&self) -> bool {
        matches!(self.code, ErrorCode::DatabaseError | ErrorCode::Timeout)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Rule(core) => ApiError::from(core),
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::Duplicate { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' is already taken", field, value),
            ),
            DbError::UniqueViolation { field, .. } => {
                error!(field = %field, "Unique constraint failed");
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::Timeout { millis } => {
                error!(millis, "Database operation timed out");
                ApiError::new(ErrorCode::Timeout, "The database did not respond in time")
            }
            DbError::ConnectionFailed(e) => {
                error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(e) => {
                error!("Database migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let message = err.to_string();
        match err {
            CoreError::NotAuthenticated => ApiError::new(ErrorCode::Unauthorized, message),
            CoreError::Forbidden { .. } => ApiError::new(ErrorCode::Forbidden, message),
            CoreError::RegisterClosed | CoreError::RegisterAlreadyOpen => {
                ApiError::new(ErrorCode::RegisterState, message)
            }
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::UserNotFound(id) => ApiError::not_found("User", &id),
            CoreError::InsufficientStock { .. } => {
                ApiError::new(ErrorCode::InsufficientStock, message)
            }
            CoreError::EmptyCart | CoreError::CartTooLarge { .. } => {
                ApiError::new(ErrorCode::ValidationError, message)
            }
            CoreError::LastUser | CoreError::LastAdmin | CoreError::SelfDeletion => {
                ApiError::new(ErrorCode::BusinessLogic, message)
            }
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

/// Converts validation errors to API errors.
impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::InsufficientTender { .. } | ValidationError::PaymentMismatch { .. } => {
                ApiError::new(ErrorCode::PaymentError, err.to_string())
            }
            other => ApiError::validation(other.to_string()),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Checkout Failure
// =============================================================================

/// A checkout that stopped before every line was posted.
///
/// Lines are committed one at a time; `committed` lists the ones that are
/// durable (with their stock change and cash movement). `failed_line` is
/// the 0-based index of the line that failed, or `None` when the checkout
/// was rejected before any line was attempted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutFailure {
    pub committed: Vec<Transaction>,
    pub failed_line: Option<usize>,
    pub error: ApiError,
}

impl CheckoutFailure {
    /// A rejection before anything was posted.
    pub fn rejected(error: impl Into<ApiError>) -> Self {
        CheckoutFailure {
            committed: Vec::new(),
            failed_line: None,
            error: error.into(),
        }
    }
}

impl std::fmt::Display for CheckoutFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.failed_line {
            Some(line) => write!(
                f,
                "line {} failed after {} committed: {}",
                line + 1,
                self.committed.len(),
                self.error.message
            ),
            None => f.write_str(&self.error.message),
        }
    }
}

impl std::error::Error for CheckoutFailure {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_errors_map_to_register_state() {
        let err = ApiError::from(CoreError::RegisterClosed);
        assert_eq!(err.code, ErrorCode::RegisterState);
        assert_eq!(err.message, "The cash register is closed");
    }

    #[test]
    fn test_rule_inside_db_error_keeps_its_meaning() {
        let err = ApiError::from(DbError::Rule(CoreError::LastAdmin));
        assert_eq!(err.code, ErrorCode::BusinessLogic);
        assert!(!err.is_persistence());
    }

    #[test]
    fn test_persistence_errors_hide_details() {
        let err = ApiError::from(DbError::QueryFailed("near \"SELEC\": syntax error".to_string()));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, "Database operation failed");

        let err = ApiError::from(DbError::Timeout { millis: 5000 });
        assert_eq!(err.code, ErrorCode::Timeout);
        assert!(err.is_persistence());
    }

    #[test]
    fn test_unique_failures_are_persistence_unless_username_taken() {
        let raw = ApiError::from(DbError::UniqueViolation {
            field: "cash_movements.id".to_string(),
            value: "unknown".to_string(),
        });
        assert_eq!(raw.code, ErrorCode::DatabaseError);
        assert_eq!(raw.message, "Database operation failed");
        assert!(raw.is_persistence());

        let taken = ApiError::from(DbError::duplicate("username", "Vendedor1"));
        assert_eq!(taken.code, ErrorCode::ValidationError);
        assert_eq!(taken.message, "username 'Vendedor1' is already taken");
        assert!(!taken.is_persistence());
    }

    #[test]
    fn test_tender_errors_are_payment_errors() {
        let err = ApiError::from(CoreError::Validation(ValidationError::InsufficientTender {
            tendered: "$9.000".to_string(),
            total: "$10.000".to_string(),
        }));
        assert_eq!(err.code, ErrorCode::PaymentError);
    }

    #[test]
    fn test_checkout_failure_display() {
        let failure = CheckoutFailure {
            committed: Vec::new(),
            failed_line: Some(1),
            error: ApiError::new(ErrorCode::DatabaseError, "Database operation failed"),
        };
        assert_eq!(
            failure.to_string(),
            "line 2 failed after 0 committed: Database operation failed"
        );
        assert_eq!(CheckoutFailure::rejected(CoreError::EmptyCart).to_string(), "Cart is empty");
    }
}
