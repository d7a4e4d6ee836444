//! # Settings Repository
//!
//! Global key/value configuration. Defaults (tax rate, business identity)
//! are seeded by migration; this repository reads and upserts them.
//!
//! The tax rate is read here and *passed into* the sale builder by the
//! caller - the builder itself never reaches for ambient configuration.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use tally_core::{Setting, TaxRate, TAX_RATE_KEY};

/// Repository for the settings key/value store.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Lists all settings sorted by key.
    pub async fn all(&self) -> DbResult<Vec<Setting>> {
        let settings = sqlx::query_as::<_, Setting>(
            "SELECT key, value, description, updated_at FROM settings ORDER BY key",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(settings)
    }

    /// Gets a setting by key.
    pub async fn get(&self, key: &str) -> DbResult<Option<Setting>> {
        let setting = sqlx::query_as::<_, Setting>(
            "SELECT key, value, description, updated_at FROM settings WHERE key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(setting)
    }

    /// Creates or replaces a setting value.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, "Updating setting");

        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reads the configured tax rate.
    ///
    /// The value is stored as a decimal fraction ("0.15"). A missing or
    /// unparsable value falls back to a zero rate - a misconfigured store
    /// must not block sales.
    pub async fn tax_rate(&self) -> DbResult<TaxRate> {
        let setting = self.get(TAX_RATE_KEY).await?;

        let rate = match setting {
            Some(setting) => match setting.value.parse::<f64>() {
                Ok(fraction) => TaxRate::from_fraction(fraction),
                Err(_) => {
                    warn!(value = %setting.value, "Unparsable TAX_RATE setting, using zero rate");
                    TaxRate::zero()
                }
            },
            None => {
                warn!("TAX_RATE setting missing, using zero rate");
                TaxRate::zero()
            }
        };

        Ok(rate)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
