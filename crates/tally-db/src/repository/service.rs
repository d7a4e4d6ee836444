//! # Service Repository
//!
//! Catalog operations for billable services (labor, diagnostics, ...).
//! Services have no stock; sale lines snapshot their price with a zero
//! purchase cost.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tally_core::Service;

/// Repository for the service catalog.
#[derive(Debug, Clone)]
pub struct ServiceRepository {
    pool: SqlitePool,
}

/// Input for creating a service.
#[derive(Debug, Clone)]
pub struct NewService {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
}

impl ServiceRepository {
    /// Creates a new ServiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ServiceRepository { pool }
    }

    /// Inserts a new service.
    pub async fn insert(&self, new: &NewService) -> DbResult<Service> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(id = %id, name = %new.name, "Inserting service");

        sqlx::query(
            r#"
            INSERT INTO services (id, name, description, price_cents, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 1, ?5, ?5)
            "#,
        )
        .bind(&id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.price_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(&id)
            .await?
            .ok_or_else(|| DbError::not_found("Service", &id))
    }

    /// Gets a service by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Service>> {
        let service = sqlx::query_as::<_, Service>(
            "SELECT id, name, description, price_cents, is_active, created_at, updated_at \
             FROM services WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(service)
    }

    /// Lists active services sorted by name.
    pub async fn list_active(&self) -> DbResult<Vec<Service>> {
        let services = sqlx::query_as::<_, Service>(
            "SELECT id, name, description, price_cents, is_active, created_at, updated_at \
             FROM services WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(services)
    }

    /// Soft-deletes a service.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting service");

        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE services SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Service", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
