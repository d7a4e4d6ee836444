//! # Inventory Repository
//!
//! The inventory movement recorder: the stock ledger and one of the two
//! writers of product stock and purchase price.
//!
//! ## Recording a movement
//! ```text
//! validate input                      (no transaction yet)
//!      │
//!      ▼
//! BEGIN ── read product ── apply rules ── guarded UPDATE ── INSERT ledger ── COMMIT
//!                │               │               │
//!                │               │               └─ version mismatch -> Conflict, retry
//!                │               └─ OUT below zero -> InsufficientStock, rollback
//!                └─ missing/inactive -> NotFound, rollback
//! ```
//!
//! Either the product update and the ledger insert both land, or neither
//! does: any error before commit drops the transaction and sqlx rolls it
//! back.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::costing::weighted_average_cost;
use tally_core::validation::validate_movement;
use tally_core::{
    CoreError, InventoryMovement, Money, MovementType, NewMovement, Product, CONFLICT_RETRY_LIMIT,
};

/// Repository for the stock ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Records a stock movement and updates the product atomically.
    ///
    /// ## Rules
    /// - IN: stock increases; a positive unit price recomputes the
    ///   weighted-average purchase cost
    /// - OUT: stock decreases; fails with InsufficientStock if it would
    ///   go below zero
    ///
    /// The product row is updated under its version guard; losing the
    /// race to a concurrent writer re-runs the whole transaction up to
    /// [`CONFLICT_RETRY_LIMIT`] times.
    pub async fn record_movement(
        &self,
        new: &NewMovement,
        user_id: &str,
    ) -> DbResult<InventoryMovement> {
        validate_movement(new).map_err(CoreError::from)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_record(new, user_id).await {
                Err(err) if err.is_retryable() && attempt < CONFLICT_RETRY_LIMIT => {
                    debug!(attempt, product_id = %new.product_id, "Retrying movement after conflict");
                }
                result => return result,
            }
        }
    }

    /// One attempt at the movement transaction.
    async fn try_record(&self, new: &NewMovement, user_id: &str) -> DbResult<InventoryMovement> {
        let mut tx = self.pool.begin().await?;

        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, stock, purchase_price_cents, sale_price_cents, \
             min_stock, is_active, created_at, updated_at, version \
             FROM products WHERE id = ?1",
        )
        .bind(&new.product_id)
        .fetch_optional(&mut *tx)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| CoreError::ProductNotFound(new.product_id.clone()))?;

        let (new_stock, new_purchase_price) = match new.kind {
            MovementType::In => {
                let price = match new.unit_price_cents {
                    Some(cents) if cents > 0 => weighted_average_cost(
                        product.stock,
                        product.purchase_price(),
                        new.quantity,
                        Money::from_cents(cents),
                    ),
                    _ => product.purchase_price(),
                };
                (product.stock + new.quantity, price)
            }
            MovementType::Out => {
                if product.stock < new.quantity {
                    return Err(CoreError::InsufficientStock {
                        name: product.name.clone(),
                        available: product.stock,
                        requested: new.quantity,
                    }
                    .into());
                }
                (product.stock - new.quantity, product.purchase_price())
            }
        };

        let now = Utc::now();

        let updated = sqlx::query(
            "UPDATE products SET stock = ?2, purchase_price_cents = ?3, updated_at = ?4, \
             version = version + 1 \
             WHERE id = ?1 AND version = ?5",
        )
        .bind(&product.id)
        .bind(new_stock)
        .bind(new_purchase_price.cents())
        .bind(now)
        .bind(product.version)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::conflict("products.version"));
        }

        let movement = InventoryMovement {
            id: Uuid::new_v4().to_string(),
            product_id: new.product_id.clone(),
            kind: new.kind,
            quantity: new.quantity,
            unit_price_cents: new.unit_price_cents,
            reason: new.reason.clone(),
            user_id: user_id.to_string(),
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO inventory_movements (
                id, product_id, type, quantity, unit_price_cents, reason, user_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.kind)
        .bind(movement.quantity)
        .bind(movement.unit_price_cents)
        .bind(&movement.reason)
        .bind(&movement.user_id)
        .bind(movement.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            movement_id = %movement.id,
            product_id = %movement.product_id,
            quantity = movement.quantity,
            stock = new_stock,
            "Movement recorded"
        );

        Ok(movement)
    }

    /// Lists movements newest-first, optionally filtered by product.
    pub async fn list(&self, product_id: Option<&str>) -> DbResult<Vec<InventoryMovement>> {
        const COLUMNS: &str =
            "id, product_id, type, quantity, unit_price_cents, reason, user_id, created_at";

        let movements = match product_id {
            Some(pid) => {
                sqlx::query_as::<_, InventoryMovement>(&format!(
                    "SELECT {COLUMNS} FROM inventory_movements \
                     WHERE product_id = ?1 ORDER BY created_at DESC"
                ))
                .bind(pid)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, InventoryMovement>(&format!(
                    "SELECT {COLUMNS} FROM inventory_movements ORDER BY created_at DESC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
