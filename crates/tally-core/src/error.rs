//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! tally-core errors (this file)
//! ├── CoreError        - Business rule violations
//! └── ValidationError  - Input validation failures (rejected before any
//!                        transaction is opened)
//!
//! tally-db errors (separate crate)
//! └── DbError          - Database failures; wraps CoreError transparently
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, quantities, ...)
//! 3. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Any of these raised mid-transaction rolls the whole transaction back;
/// no partial stock or price change is ever visible to a caller.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced product does not exist or is inactive.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Referenced service does not exist or is inactive.
    #[error("Service not found: {0}")]
    ServiceNotFound(String),

    /// An OUT movement or sale line asked for more units than are on hand.
    ///
    /// Carries the product name plus both quantities so the caller can
    /// render "Only 3 units of Oil filter in stock".
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before a transaction is opened; a request failing validation
/// never touches the database.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// A sale line must reference exactly one of product or service.
    #[error("sale item must reference exactly one of productId or serviceId")]
    AmbiguousLineTarget,

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
