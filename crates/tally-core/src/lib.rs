//! # tally-core: Pure Business Logic for Tally
//!
//! This crate is the heart of the Tally back office. It contains all
//! business logic as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! HTTP resource layer (external)
//!        │
//!        ▼
//! tally-db ── transactions, repositories, SQLite
//!        │
//!        ▼
//! tally-core (THIS CRATE) ── money, costing, numbering, validation
//!
//! NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, InventoryMovement, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`costing`] - Weighted-average cost and sale totals
//! - [`numbering`] - Per-day sequential document numbers
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::money::{Money, TaxRate};
//! use tally_core::costing::weighted_average_cost;
//!
//! // A product holding 10 units at $5.00 receives 10 more at $7.00
//! let new_cost = weighted_average_cost(10, Money::from_cents(500), 10, Money::from_cents(700));
//! assert_eq!(new_cost.cents(), 600); // $6.00
//!
//! // 15% tax on a $25.00 subtotal
//! let tax = Money::from_cents(2500).calculate_tax(TaxRate::from_bps(1500));
//! assert_eq!(tax.cents(), 375);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod costing;
pub mod error;
pub mod money;
pub mod numbering;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use tally_core::Money` instead of
// `use tally_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, TaxRate};
pub use numbering::DocumentSeries;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity accepted for a single movement or sale line.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 10000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 9999;

/// How many times a conflicted transaction is attempted before giving up.
///
/// Invoice numbers are derived with a read-then-increment that can collide
/// under concurrency; the unique constraint turns the collision into a
/// retryable conflict. Three attempts clear any realistic contention on a
/// single back office.
pub const CONFLICT_RETRY_LIMIT: u32 = 3;
