//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          CoreError                                      │
//! │                                                                         │
//! │   State gates                 Business rules          Input             │
//! │   ───────────                 ──────────────          ─────             │
//! │   NotAuthenticated            InsufficientStock       Validation(..)    │
//! │   Forbidden                   LastUser / LastAdmin      └─ ValidationError
//! │   RegisterClosed              SelfDeletion                              │
//! │   RegisterAlreadyOpen         EmptyCart                                 │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Persistence failures are not modelled here: they belong to `caja-db`.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// These errors represent business rule violations or state-gate
/// failures. They are translated to short user-facing messages by the
/// application layer.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No user is logged in, or the credentials did not match.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The current user lacks the role required for the operation.
    #[error("Operation requires the {required} role")]
    Forbidden { required: String },

    /// The register must be open for this operation.
    ///
    /// ## When This Occurs
    /// - Selling or buying before the shift was opened
    /// - Posting a manual ingreso/egreso while closed
    /// - Closing a register that is already closed
    #[error("The cash register is closed")]
    RegisterClosed,

    /// Opening a register that is already open.
    #[error("The cash register is already open")]
    RegisterAlreadyOpen,

    /// Product cannot be found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// User cannot be found.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Insufficient stock to complete a sale line.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to cart (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Pan", available: "3", requested: "5" }
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: String,
        requested: String,
    },

    /// Checkout attempted with no cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Deleting the only remaining user.
    #[error("At least one user must exist")]
    LastUser,

    /// Deleting or demoting the only remaining admin.
    #[error("At least one admin user must exist")]
    LastAdmin,

    /// Deleting the user that is currently logged in.
    #[error("You cannot delete your own user")]
    SelfDeletion,

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any operation is attempted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed quantity).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Cash tendered does not cover the total.
    #[error("Tendered amount {tendered} is less than the total {total}")]
    InsufficientTender { tendered: String, total: String },

    /// Non-cash payments and purchases must match the total exactly.
    #[error("Payment amount {tendered} must equal the total {total}")]
    PaymentMismatch { tendered: String, total: String },
}

impl ValidationError {
    /// Creates a Required error for a field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidFormat error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
