//! # tally-db: Database Layer for Tally
//!
//! This crate provides database access for the Tally back office.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! HTTP resource layer (external)
//!      │
//!      ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    tally-db (THIS CRATE)                    │
//! │                                                             │
//! │  ┌──────────────┐   ┌────────────────┐   ┌──────────────┐  │
//! │  │   Database   │   │  Repositories  │   │  Migrations  │  │
//! │  │  (pool.rs)   │   │                │   │  (embedded)  │  │
//! │  │              │   │ ProductRepo    │   │              │  │
//! │  │ SqlitePool   │◄──│ InventoryRepo  │   │ 001_init.sql │  │
//! │  │ WAL, timeouts│   │ SaleRepo       │   │ 002_....sql  │  │
//! │  └──────────────┘   │ ServiceRepo    │   └──────────────┘  │
//! │                     │ SettingsRepo   │                     │
//! │                     └────────────────┘                     │
//! └─────────────────────────────────────────────────────────────┘
//!      │
//!      ▼
//! tally-core ── money, costing, numbering, validation (pure)
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## The two transactional operations
//!
//! [`repository::inventory::InventoryRepository::record_movement`] and
//! [`repository::sale::SaleRepository::create_sale`] each demarcate exactly
//! one transaction and are the only writers of product stock and purchase
//! price. Everything else in this crate is catalog and settings plumbing
//! around them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/tally.db")).await?;
//!
//! // Read the tax rate outside the transaction, inject it into the sale
//! let tax_rate = db.settings().tax_rate().await?;
//! let sale = db.sales().create_sale(&request, user_id, tax_rate).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::inventory::InventoryRepository;
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::sale::SaleRepository;
pub use repository::service::{NewService, ServiceRepository};
pub use repository::settings::SettingsRepository;
