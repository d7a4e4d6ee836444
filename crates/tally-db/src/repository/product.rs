//! # Product Repository
//!
//! Catalog operations for products.
//!
//! ## What is NOT here
//! `stock` and `purchase_price_cents` are owned by the inventory movement
//! recorder and the sale transaction builder. [`ProductRepository::update`]
//! deliberately cannot touch them, and nothing in this module increments
//! the row version.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::Product;

const PRODUCT_COLUMNS: &str = "id, name, description, stock, purchase_price_cents, \
     sale_price_cents, min_stock, is_active, created_at, updated_at, version";

/// Repository for product catalog operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

/// Input for creating a product. Stock starts at zero and is only ever
/// changed through inventory movements or sales.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub sale_price_cents: i64,
    pub min_stock: i64,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a new product with zero stock.
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, name = %new.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, description, stock, purchase_price_cents,
                sale_price_cents, min_stock, is_active, created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, 0, 0, ?4, ?5, 1, ?6, ?6, 0)
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.sale_price_cents)
        .bind(new.min_stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &id))
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found (active or not)
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates a product's catalog fields.
    ///
    /// Stock and purchase price are intentionally absent; those change
    /// only through the movement recorder and the sale builder.
    pub async fn update(&self, id: &str, new: &NewProduct) -> DbResult<()> {
        debug!(id = %id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                description = ?3,
                sale_price_cents = ?4,
                min_stock = ?5,
                updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.sale_price_cents)
        .bind(new.min_stock)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Products that are low on stock (0 < stock <= min_stock).
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND stock > 0 AND stock <= min_stock \
             ORDER BY stock"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Products that are completely out of stock.
    pub async fn out_of_stock(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND stock = 0 \
             ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical sales and movements still reference the row, so rows
    /// are never physically deleted.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn oil_filter() -> NewProduct {
        NewProduct {
            name: "Oil filter".to_string(),
            description: Some("Spin-on oil filter".to_string()),
            sale_price_cents: 1000,
            min_stock: 5,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let repo = db.products();

        let product = repo.insert(&oil_filter()).await.unwrap();
        assert_eq!(product.stock, 0);
        assert_eq!(product.purchase_price_cents, 0);
        assert_eq!(product.sale_price_cents, 1000);
        assert!(product.is_active);

        let fetched = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Oil filter");
    }

    #[tokio::test]
    async fn test_update_leaves_stock_alone() {
        let db = test_db().await;
        let repo = db.products();

        let product = repo.insert(&oil_filter()).await.unwrap();

        let mut changed = oil_filter();
        changed.name = "Oil filter (premium)".to_string();
        changed.sale_price_cents = 1500;
        repo.update(&product.id, &changed).await.unwrap();

        let fetched = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Oil filter (premium)");
        assert_eq!(fetched.sale_price_cents, 1500);
        assert_eq!(fetched.stock, 0);
        assert_eq!(fetched.version, 0);
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let db = test_db().await;
        let repo = db.products();

        let err = repo
            .update("does-not-exist", &oil_filter())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_listing() {
        let db = test_db().await;
        let repo = db.products();

        let product = repo.insert(&oil_filter()).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 1);

        repo.soft_delete(&product.id).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.list_active().await.unwrap().is_empty());

        // Row still exists for historical references
        let fetched = repo.get_by_id(&product.id).await.unwrap().unwrap();
        assert!(!fetched.is_active);
    }
}
