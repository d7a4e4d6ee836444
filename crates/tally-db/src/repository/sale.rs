//! # Sale Repository
//!
//! The sale transaction builder: validates stock for every line, decrements
//! it, snapshots prices, computes totals, assigns the day's next invoice
//! number and persists sale + items as one atomic unit.
//!
//! ## Creating a sale
//! ```text
//! validate + resolve line targets     (no transaction yet)
//!      │
//!      ▼
//! BEGIN
//!   ├─ derive invoice number from today's highest
//!   ├─ per product line: load, check stock, guarded decrement, snapshot prices
//!   ├─ per service line: load, snapshot price (zero cost)
//!   ├─ totals = subtotal / tax / total
//!   ├─ INSERT sale (status = completed) + items
//! COMMIT
//! ```
//!
//! The read-max-then-increment invoice derivation is not serialized
//! against concurrent inserts; the UNIQUE constraint on invoice_number
//! turns the race into a conflict, and the whole transaction re-runs a
//! bounded number of times. Any failure at any step rolls everything
//! back - stock decrements included.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::costing::sale_totals;
use tally_core::validation::resolve_sale_items;
use tally_core::{
    CoreError, DocumentSeries, LineTarget, Money, NewSale, Product, Sale, SaleItem, SaleStatus,
    Service, TaxRate, CONFLICT_RETRY_LIMIT,
};

const SALE_COLUMNS: &str = "id, invoice_number, subtotal_cents, tax_cents, total_cents, status, \
     apply_tax, customer_id, user_id, notes, created_at, updated_at";

/// Repository for sale operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

/// Row shape of `sale_items`; the two nullable id columns collapse into
/// [`LineTarget`] on the way out.
#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    id: String,
    sale_id: String,
    product_id: Option<String>,
    service_id: Option<String>,
    quantity: i64,
    unit_price_cents: i64,
    purchase_price_cents: i64,
    total_cents: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<SaleItemRow> for SaleItem {
    type Error = DbError;

    fn try_from(row: SaleItemRow) -> Result<Self, Self::Error> {
        let target = match (row.product_id, row.service_id) {
            (Some(product_id), None) => LineTarget::Product(product_id),
            (None, Some(service_id)) => LineTarget::Service(service_id),
            // The CHECK constraint makes this unreachable; a hit means the
            // row was written by something other than this repository.
            _ => {
                return Err(DbError::Internal(format!(
                    "sale item {} references both or neither of product/service",
                    row.id
                )))
            }
        };

        Ok(SaleItem {
            id: row.id,
            sale_id: row.sale_id,
            target,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            purchase_price_cents: row.purchase_price_cents,
            total_cents: row.total_cents,
            created_at: row.created_at,
        })
    }
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Creates a completed sale from the requested lines.
    ///
    /// The tax rate is injected by the caller (read from settings outside
    /// the transaction); the builder never consults ambient configuration.
    ///
    /// ## Errors
    /// - Validation failures surface before any transaction is opened
    /// - NotFound / InsufficientStock roll the transaction back
    /// - Invoice-number and version conflicts retry up to
    ///   [`CONFLICT_RETRY_LIMIT`] times, then surface as Conflict
    pub async fn create_sale(
        &self,
        new: &NewSale,
        user_id: &str,
        tax_rate: TaxRate,
    ) -> DbResult<Sale> {
        let lines = resolve_sale_items(new).map_err(CoreError::from)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_create(new, &lines, user_id, tax_rate).await {
                Err(err) if err.is_retryable() && attempt < CONFLICT_RETRY_LIMIT => {
                    debug!(attempt, "Retrying sale creation after conflict");
                }
                result => return result,
            }
        }
    }

    /// One attempt at the sale transaction.
    async fn try_create(
        &self,
        new: &NewSale,
        lines: &[(LineTarget, i64)],
        user_id: &str,
        tax_rate: TaxRate,
    ) -> DbResult<Sale> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        // Step 1: next invoice number for today
        let series = DocumentSeries::invoice();
        let today = now.date_naive();
        let last: Option<String> = sqlx::query_scalar(
            "SELECT invoice_number FROM sales WHERE invoice_number LIKE ?1 \
             ORDER BY invoice_number DESC LIMIT 1",
        )
        .bind(format!("{}%", series.day_prefix(today)))
        .fetch_optional(&mut *tx)
        .await?;
        let invoice_number = series.next_after(today, last.as_deref());

        // Steps 2-3: build the line items, decrementing product stock
        let sale_id = Uuid::new_v4().to_string();
        let mut items: Vec<SaleItem> = Vec::with_capacity(lines.len());
        let mut line_totals: Vec<Money> = Vec::with_capacity(lines.len());

        for (target, quantity) in lines {
            let item = match target {
                LineTarget::Product(product_id) => {
                    let product = self
                        .take_stock(&mut tx, product_id, *quantity, now)
                        .await?;
                    SaleItem {
                        id: Uuid::new_v4().to_string(),
                        sale_id: sale_id.clone(),
                        target: target.clone(),
                        quantity: *quantity,
                        unit_price_cents: product.sale_price_cents,
                        purchase_price_cents: product.purchase_price_cents,
                        total_cents: product.sale_price().multiply_quantity(*quantity).cents(),
                        created_at: now,
                    }
                }
                LineTarget::Service(service_id) => {
                    let service = self.load_service(&mut tx, service_id).await?;
                    SaleItem {
                        id: Uuid::new_v4().to_string(),
                        sale_id: sale_id.clone(),
                        target: target.clone(),
                        quantity: *quantity,
                        unit_price_cents: service.price_cents,
                        purchase_price_cents: 0,
                        total_cents: service.price().multiply_quantity(*quantity).cents(),
                        created_at: now,
                    }
                }
            };

            line_totals.push(item.total());
            items.push(item);
        }

        // Step 4: totals
        let totals = sale_totals(&line_totals, tax_rate, new.apply_tax);

        // Step 5: persist sale + items
        let inserted = sqlx::query(
            r#"
            INSERT INTO sales (
                id, invoice_number, subtotal_cents, tax_cents, total_cents,
                status, apply_tax, customer_id, user_id, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
        )
        .bind(&sale_id)
        .bind(&invoice_number)
        .bind(totals.subtotal.cents())
        .bind(totals.tax.cents())
        .bind(totals.total.cents())
        .bind(SaleStatus::Completed)
        .bind(new.apply_tax)
        .bind(&new.customer_id)
        .bind(user_id)
        .bind(&new.notes)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            return Err(match DbError::from(err) {
                // Lost the invoice race to a concurrent sale
                DbError::UniqueViolation { ref field } if field.contains("invoice_number") => {
                    DbError::conflict("sales.invoice_number")
                }
                other => other,
            });
        }

        for item in &items {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    id, sale_id, product_id, service_id, quantity,
                    unit_price_cents, purchase_price_cents, total_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(&item.id)
            .bind(&item.sale_id)
            .bind(item.target.product_id())
            .bind(item.target.service_id())
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.purchase_price_cents)
            .bind(item.total_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            invoice_number = %invoice_number,
            total = totals.total.cents(),
            items = items.len(),
            "Sale created"
        );

        // Step 6: return the hydrated sale
        self.get_by_id(&sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", &sale_id))
    }

    /// Loads a product inside the transaction and decrements its stock
    /// under the version guard. Returns the product as read, for the
    /// price snapshots.
    async fn take_stock(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        product_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT id, name, description, stock, purchase_price_cents, sale_price_cents, \
             min_stock, is_active, created_at, updated_at, version \
             FROM products WHERE id = ?1",
        )
        .bind(product_id)
        .fetch_optional(&mut **tx)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        if !product.can_fulfill(quantity) {
            return Err(CoreError::InsufficientStock {
                name: product.name.clone(),
                available: product.stock,
                requested: quantity,
            }
            .into());
        }

        let updated = sqlx::query(
            "UPDATE products SET stock = ?2, updated_at = ?3, version = version + 1 \
             WHERE id = ?1 AND version = ?4",
        )
        .bind(product_id)
        .bind(product.stock - quantity)
        .bind(now)
        .bind(product.version)
        .execute(&mut **tx)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(DbError::conflict("products.version"));
        }

        Ok(product)
    }

    /// Loads an active service inside the transaction.
    async fn load_service(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        service_id: &str,
    ) -> DbResult<Service> {
        sqlx::query_as::<_, Service>(
            "SELECT id, name, description, price_cents, is_active, created_at, updated_at \
             FROM services WHERE id = ?1",
        )
        .bind(service_id)
        .fetch_optional(&mut **tx)
        .await?
        .filter(|s| s.is_active)
        .ok_or_else(|| CoreError::ServiceNotFound(service_id.to_string()).into())
    }

    /// Gets a sale by ID, hydrated with its items.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match sale {
            Some(sale) => Ok(Some(self.hydrate(sale).await?)),
            None => Ok(None),
        }
    }

    /// Lists all sales newest-first, hydrated with items.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(sales).await
    }

    /// Lists one user's sales newest-first, hydrated with items.
    pub async fn list_by_user(&self, user_id: &str) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE user_id = ?1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(sales).await
    }

    /// Lists sales in a closed created_at range, newest-first.
    pub async fn list_by_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales \
             WHERE created_at >= ?1 AND created_at <= ?2 ORDER BY created_at DESC"
        ))
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate_all(sales).await
    }

    /// Attaches items to a sale.
    async fn hydrate(&self, mut sale: Sale) -> DbResult<Sale> {
        let rows = sqlx::query_as::<_, SaleItemRow>(
            "SELECT id, sale_id, product_id, service_id, quantity, unit_price_cents, \
             purchase_price_cents, total_cents, created_at \
             FROM sale_items WHERE sale_id = ?1 ORDER BY created_at",
        )
        .bind(&sale.id)
        .fetch_all(&self.pool)
        .await?;

        sale.items = rows
            .into_iter()
            .map(SaleItem::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sale)
    }

    async fn hydrate_all(&self, sales: Vec<Sale>) -> DbResult<Vec<Sale>> {
        let mut hydrated = Vec::with_capacity(sales.len());
        for sale in sales {
            hydrated.push(self.hydrate(sale).await?);
        }
        Ok(hydrated)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;
    use crate::repository::service::NewService;
    use tally_core::{MovementType, NewMovement, NewSaleItem};

    const TAX_15: TaxRate = TaxRate::from_bps(1500);

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    /// Product with stock brought in through the movement recorder.
    async fn seed_product(
        db: &Database,
        name: &str,
        stock: i64,
        purchase_price_cents: i64,
        sale_price_cents: i64,
    ) -> Product {
        let product = db
            .products()
            .insert(&NewProduct {
                name: name.to_string(),
                description: None,
                sale_price_cents,
                min_stock: 2,
            })
            .await
            .unwrap();

        db.inventory()
            .record_movement(
                &NewMovement {
                    product_id: product.id.clone(),
                    kind: MovementType::In,
                    quantity: stock,
                    unit_price_cents: Some(purchase_price_cents),
                    reason: None,
                },
                "stockist",
            )
            .await
            .unwrap();

        db.products().get_by_id(&product.id).await.unwrap().unwrap()
    }

    fn product_line(product_id: &str, quantity: i64) -> NewSaleItem {
        NewSaleItem {
            product_id: Some(product_id.to_string()),
            service_id: None,
            quantity,
        }
    }

    fn service_line(service_id: &str, quantity: i64) -> NewSaleItem {
        NewSaleItem {
            product_id: None,
            service_id: Some(service_id.to_string()),
            quantity,
        }
    }

    fn sale_of(items: Vec<NewSaleItem>, apply_tax: bool) -> NewSale {
        NewSale {
            items,
            customer_id: None,
            notes: None,
            apply_tax,
        }
    }

    #[tokio::test]
    async fn test_create_sale_totals_and_stock() {
        // 2 x $10.00 + 1 x $5.00 at 15% -> 25.00 / 3.75 / 28.75
        let db = test_db().await;
        let widget = seed_product(&db, "Widget", 10, 600, 1000).await;
        let gadget = seed_product(&db, "Gadget", 10, 300, 500).await;

        let sale = db
            .sales()
            .create_sale(
                &sale_of(
                    vec![product_line(&widget.id, 2), product_line(&gadget.id, 1)],
                    true,
                ),
                "cashier",
                TAX_15,
            )
            .await
            .unwrap();

        assert_eq!(sale.subtotal_cents, 2500);
        assert_eq!(sale.tax_cents, 375);
        assert_eq!(sale.total_cents, 2875);
        assert_eq!(sale.status, SaleStatus::Completed);
        assert!(sale.apply_tax);
        assert_eq!(sale.items.len(), 2);

        // Price and cost snapshots frozen on the items
        let widget_item = sale
            .items
            .iter()
            .find(|i| i.target.product_id() == Some(widget.id.as_str()))
            .unwrap();
        assert_eq!(widget_item.unit_price_cents, 1000);
        assert_eq!(widget_item.purchase_price_cents, 600);
        assert_eq!(widget_item.total_cents, 2000);

        // Stock decremented
        let widget_after = db.products().get_by_id(&widget.id).await.unwrap().unwrap();
        let gadget_after = db.products().get_by_id(&gadget.id).await.unwrap().unwrap();
        assert_eq!(widget_after.stock, 8);
        assert_eq!(gadget_after.stock, 9);
    }

    #[tokio::test]
    async fn test_create_sale_without_tax() {
        let db = test_db().await;
        let widget = seed_product(&db, "Widget", 5, 600, 1000).await;

        let sale = db
            .sales()
            .create_sale(
                &sale_of(vec![product_line(&widget.id, 1)], false),
                "cashier",
                TAX_15,
            )
            .await
            .unwrap();

        assert_eq!(sale.subtotal_cents, 1000);
        assert_eq!(sale.tax_cents, 0);
        assert_eq!(sale.total_cents, 1000);
    }

    #[tokio::test]
    async fn test_create_sale_with_service_line() {
        let db = test_db().await;
        let widget = seed_product(&db, "Widget", 5, 600, 1000).await;
        let oil_change = db
            .services()
            .insert(&NewService {
                name: "Oil change".to_string(),
                description: None,
                price_cents: 2500,
            })
            .await
            .unwrap();

        let sale = db
            .sales()
            .create_sale(
                &sale_of(
                    vec![product_line(&widget.id, 1), service_line(&oil_change.id, 1)],
                    false,
                ),
                "cashier",
                TAX_15,
            )
            .await
            .unwrap();

        assert_eq!(sale.subtotal_cents, 3500);

        let service_item = sale
            .items
            .iter()
            .find(|i| i.target.service_id() == Some(oil_change.id.as_str()))
            .unwrap();
        assert_eq!(service_item.unit_price_cents, 2500);
        assert_eq!(service_item.purchase_price_cents, 0);
    }

    #[tokio::test]
    async fn test_invoice_numbers_are_sequential() {
        let db = test_db().await;
        let widget = seed_product(&db, "Widget", 10, 600, 1000).await;

        let series = DocumentSeries::invoice();
        let today = Utc::now().date_naive();

        let first = db
            .sales()
            .create_sale(&sale_of(vec![product_line(&widget.id, 1)], false), "a", TAX_15)
            .await
            .unwrap();
        let second = db
            .sales()
            .create_sale(&sale_of(vec![product_line(&widget.id, 1)], false), "a", TAX_15)
            .await
            .unwrap();

        assert_eq!(first.invoice_number, series.first(today));
        assert_eq!(
            second.invoice_number,
            series.next_after(today, Some(&first.invoice_number))
        );
    }

    #[tokio::test]
    async fn test_failed_sale_rolls_everything_back() {
        // First line would succeed; second line fails on stock. Nothing
        // may stick - not the first decrement, not the sale, not items.
        let db = test_db().await;
        let widget = seed_product(&db, "Widget", 10, 600, 1000).await;
        let gadget = seed_product(&db, "Gadget", 1, 300, 500).await;

        let err = db
            .sales()
            .create_sale(
                &sale_of(
                    vec![product_line(&widget.id, 2), product_line(&gadget.id, 5)],
                    true,
                ),
                "cashier",
                TAX_15,
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InsufficientStock { .. })
        ));

        let widget_after = db.products().get_by_id(&widget.id).await.unwrap().unwrap();
        let gadget_after = db.products().get_by_id(&gadget.id).await.unwrap().unwrap();
        assert_eq!(widget_after.stock, 10);
        assert_eq!(widget_after.purchase_price_cents, 600);
        assert_eq!(gadget_after.stock, 1);

        assert!(db.sales().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sale_with_unknown_product() {
        let db = test_db().await;
        let ghost = Uuid::new_v4().to_string();

        let err = db
            .sales()
            .create_sale(&sale_of(vec![product_line(&ghost, 1)], false), "c", TAX_15)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_sale_with_inactive_service() {
        let db = test_db().await;
        let service = db
            .services()
            .insert(&NewService {
                name: "Alignment".to_string(),
                description: None,
                price_cents: 4000,
            })
            .await
            .unwrap();
        db.services().soft_delete(&service.id).await.unwrap();

        let err = db
            .sales()
            .create_sale(&sale_of(vec![service_line(&service.id, 1)], false), "c", TAX_15)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ServiceNotFound(_))));
    }

    #[tokio::test]
    async fn test_validation_rejected_before_transaction() {
        let db = test_db().await;
        let widget = seed_product(&db, "Widget", 5, 600, 1000).await;

        // Empty items
        let err = db
            .sales()
            .create_sale(&sale_of(vec![], true), "c", TAX_15)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        // Both product and service set on one line
        let both = NewSaleItem {
            product_id: Some(widget.id.clone()),
            service_id: Some(Uuid::new_v4().to_string()),
            quantity: 1,
        };
        let err = db
            .sales()
            .create_sale(&sale_of(vec![both], true), "c", TAX_15)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        assert!(db.sales().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_sales_get_distinct_invoice_numbers() {
        let db = test_db().await;
        let widget = seed_product(&db, "Widget", 10, 600, 1000).await;

        let sales_a = db.sales();
        let sales_b = db.sales();
        let req = sale_of(vec![product_line(&widget.id, 1)], false);

        let (a, b) = tokio::join!(
            sales_a.create_sale(&req, "cashier-a", TAX_15),
            sales_b.create_sale(&req, "cashier-b", TAX_15),
        );
        let a = a.unwrap();
        let b = b.unwrap();

        assert_ne!(a.invoice_number, b.invoice_number);

        let series = DocumentSeries::invoice();
        let today = Utc::now().date_naive();
        let mut sequences = vec![
            series.sequence_of(today, &a.invoice_number).unwrap(),
            series.sequence_of(today, &b.invoice_number).unwrap(),
        ];
        sequences.sort_unstable();
        assert_eq!(sequences, vec![1, 2]);

        let widget_after = db.products().get_by_id(&widget.id).await.unwrap().unwrap();
        assert_eq!(widget_after.stock, 8);
    }

    #[tokio::test]
    async fn test_list_by_user_and_date_range() {
        let db = test_db().await;
        let widget = seed_product(&db, "Widget", 10, 600, 1000).await;

        db.sales()
            .create_sale(&sale_of(vec![product_line(&widget.id, 1)], false), "alice", TAX_15)
            .await
            .unwrap();
        db.sales()
            .create_sale(&sale_of(vec![product_line(&widget.id, 1)], false), "bob", TAX_15)
            .await
            .unwrap();

        let alices = db.sales().list_by_user("alice").await.unwrap();
        assert_eq!(alices.len(), 1);
        assert_eq!(alices[0].user_id, "alice");
        assert_eq!(alices[0].items.len(), 1);

        let start = Utc::now() - chrono::Duration::hours(1);
        let end = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(db.sales().list_by_date_range(start, end).await.unwrap().len(), 2);

        let long_ago = Utc::now() - chrono::Duration::days(30);
        let yesterday = Utc::now() - chrono::Duration::days(1);
        assert!(db
            .sales()
            .list_by_date_range(long_ago, yesterday)
            .await
            .unwrap()
            .is_empty());
    }
}
