//! # Domain Types
//!
//! Core domain types for the Tally back office.
//!
//! ## Ownership
//! - [`Sale`] exclusively owns its [`SaleItem`]s (created together, never
//!   mutated after commit)
//! - [`Product`] is referenced, not owned, by sale items and movements
//! - [`InventoryMovement`] is an append-only ledger entry
//!
//! ## Dual write-path rule
//! `Product::stock` and `Product::purchase_price_cents` are mutated only by
//! the inventory movement recorder and the sale transaction builder in
//! tally-db. Every other writer leaves them alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A stocked product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Units on hand. Never negative; enforced by the movement/sale
    /// transactions and backstopped by a CHECK constraint.
    pub stock: i64,

    /// Weighted-average purchase cost in cents.
    pub purchase_price_cents: i64,

    /// Selling price in cents.
    pub sale_price_cents: i64,

    /// Threshold for low-stock alerts.
    pub min_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Optimistic-concurrency guard. Stock/price writers update the row
    /// with `WHERE version = ?`; a missed match is a retryable conflict.
    pub version: i64,
}

impl Product {
    /// Returns the purchase cost as Money.
    #[inline]
    pub fn purchase_price(&self) -> Money {
        Money::from_cents(self.purchase_price_cents)
    }

    /// Returns the selling price as Money.
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    /// Low on stock but not yet out.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock > 0 && self.stock <= self.min_stock
    }

    /// Checks whether `quantity` units can be taken from stock.
    #[inline]
    pub fn can_fulfill(&self, quantity: i64) -> bool {
        self.stock >= quantity
    }
}

// =============================================================================
// Service
// =============================================================================

/// A billable service (labor, diagnostics, ...). No stock is tracked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: Option<String>,

    /// Price in cents.
    pub price_cents: i64,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Service {
    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Inventory Movement
// =============================================================================

/// Direction of an inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    /// Stock received; may carry a unit price that feeds the
    /// weighted-average cost.
    In,
    /// Stock issued; fails if it would take stock below zero.
    Out,
}

/// An immutable stock ledger entry.
///
/// Created once inside the recorder's transaction; never updated or
/// deleted afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,

    #[serde(rename = "type")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "type"))]
    pub kind: MovementType,

    /// Units moved; always positive, direction comes from `kind`.
    pub quantity: i64,

    /// Unit purchase price in cents. Only meaningful for IN movements.
    pub unit_price_cents: Option<i64>,

    pub reason: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// The status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum SaleStatus {
    /// Declared but not finalized. The builder never persists this state;
    /// it exists for the external cancel/hold workflows.
    Pending,
    /// Paid and finalized. Set directly by the sale builder.
    Completed,
    /// Cancelled externally. No compensating stock return is performed.
    Cancelled,
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Pending
    }
}

/// What a sale line bills for: a stocked product or a service.
///
/// Exactly one of the two - the type makes both-or-neither unrepresentable,
/// which is why the domain model carries this enum instead of the two
/// nullable foreign keys that exist at the row level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum LineTarget {
    Product(String),
    Service(String),
}

impl LineTarget {
    /// Product id, if this line targets a product.
    pub fn product_id(&self) -> Option<&str> {
        match self {
            LineTarget::Product(id) => Some(id),
            LineTarget::Service(_) => None,
        }
    }

    /// Service id, if this line targets a service.
    pub fn service_id(&self) -> Option<&str> {
        match self {
            LineTarget::Product(_) => None,
            LineTarget::Service(id) => Some(id),
        }
    }
}

/// A line item in a sale.
///
/// Uses the snapshot pattern: unit price and purchase cost are frozen at
/// sale time so later catalog edits do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,

    /// Product or service this line bills for.
    pub target: LineTarget,

    pub quantity: i64,

    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,

    /// Unit purchase cost in cents at time of sale (frozen; zero for
    /// service lines).
    pub purchase_price_cents: i64,

    /// Line total before tax (unit price x quantity).
    pub total_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    /// Returns the unit price as Money.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the line total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A sale with its line items.
///
/// Sale and items are created together in one transaction and are
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,

    /// Per-day sequential number, e.g. `F20260804001`. Unique.
    pub invoice_number: String,

    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub status: SaleStatus,

    /// Whether tax was applied to this sale.
    pub apply_tax: bool,

    /// Weak reference for reporting; no customer record is required.
    pub customer_id: Option<String>,

    pub user_id: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Line items, hydrated by the repository after the sale row is read.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<SaleItem>,
}

impl Sale {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Settings
// =============================================================================

/// A global configuration entry (key/value store).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Setting {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Settings key holding the tax rate as a decimal fraction ("0.15").
pub const TAX_RATE_KEY: &str = "TAX_RATE";

// =============================================================================
// Request Types
// =============================================================================

/// Input for recording an inventory movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMovement {
    pub product_id: String,

    #[serde(rename = "type")]
    pub kind: MovementType,

    pub quantity: i64,

    /// Unit purchase price in cents; applied to the weighted average only
    /// for IN movements.
    pub unit_price_cents: Option<i64>,

    pub reason: Option<String>,
}

/// One requested sale line. The wire shape carries two optional ids;
/// validation resolves them into a [`LineTarget`] and rejects both/neither.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSaleItem {
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    pub quantity: i64,
}

/// Input for creating a sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSale {
    pub items: Vec<NewSaleItem>,
    pub customer_id: Option<String>,
    pub notes: Option<String>,

    #[serde(default)]
    pub apply_tax: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================
