//! SQLite-backed lot store
//!
//! UUIDs are stored as TEXT, genealogy lists and test results as JSON TEXT.
//! `save_all` runs inside one transaction with a version check per row, so
//! the two sides of a link land together or not at all.

use async_trait::async_trait;
use fsq_common::uuid_utils;
use fsq_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::debug;
use uuid::Uuid;

use super::LotStore;
use crate::models::{Lot, LotFilter, LotStatus};
use crate::pagination::Page;

const LOT_COLUMNS: &str = r#"
    id, tenant_id, lot_number, ingredient_id, product_id, product_code, product_name,
    supplier_id, production_batch_id, received_date, manufactured_date, expiry_date,
    quantity, unit_of_measure, quantity_remaining, status, test_results, quality_score,
    parent_lots, child_lots, is_on_hold, hold_reason, hold_date, released_date,
    released_by, notes, version, created_at, updated_at
"#;

/// [`LotStore`] over the shared SQLite pool
#[derive(Debug, Clone)]
pub struct SqliteLotStore {
    pool: SqlitePool,
}

impl SqliteLotStore {
    /// Create new store with database pool
    ///
    /// The pool must already have the lots schema
    /// (see `fsq_common::db::create_schema`).
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn opt_uuid(row: &SqliteRow, column: &str) -> Result<Option<Uuid>> {
    let value: Option<String> = row.try_get(column)?;
    value.as_deref().map(uuid_utils::parse).transpose()
}

fn lot_numbers(row: &SqliteRow, column: &str) -> Result<Vec<String>> {
    let json: String = row.try_get(column)?;
    Ok(serde_json::from_str(&json)?)
}

fn lot_from_row(row: &SqliteRow) -> Result<Lot> {
    let id: String = row.try_get("id")?;
    let tenant_id: String = row.try_get("tenant_id")?;
    let status: String = row.try_get("status")?;
    let test_results: Option<String> = row.try_get("test_results")?;

    Ok(Lot {
        id: uuid_utils::parse(&id)?,
        tenant_id: uuid_utils::parse(&tenant_id)?,
        lot_number: row.try_get("lot_number")?,
        ingredient_id: opt_uuid(row, "ingredient_id")?,
        product_id: opt_uuid(row, "product_id")?,
        product_code: row.try_get("product_code")?,
        product_name: row.try_get("product_name")?,
        supplier_id: opt_uuid(row, "supplier_id")?,
        production_batch_id: opt_uuid(row, "production_batch_id")?,
        received_date: row.try_get("received_date")?,
        manufactured_date: row.try_get("manufactured_date")?,
        expiry_date: row.try_get("expiry_date")?,
        quantity: row.try_get("quantity")?,
        unit_of_measure: row.try_get("unit_of_measure")?,
        quantity_remaining: row.try_get("quantity_remaining")?,
        status: LotStatus::from_str(&status)
            .map_err(|e| Error::Internal(format!("Stored lot {} has bad status: {}", id, e)))?,
        test_results: test_results.as_deref().map(|s| serde_json::from_str(s)).transpose()?,
        quality_score: row.try_get("quality_score")?,
        parent_lots: lot_numbers(row, "parent_lots")?,
        child_lots: lot_numbers(row, "child_lots")?,
        is_on_hold: row.try_get("is_on_hold")?,
        hold_reason: row.try_get("hold_reason")?,
        hold_date: row.try_get("hold_date")?,
        released_date: row.try_get("released_date")?,
        released_by: row.try_get("released_by")?,
        notes: row.try_get("notes")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, tenant_id: Uuid, filter: &LotFilter) {
    qb.push(" WHERE tenant_id = ").push_bind(tenant_id.to_string());
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(supplier_id) = filter.supplier_id {
        qb.push(" AND supplier_id = ").push_bind(supplier_id.to_string());
    }
    if let Some(ingredient_id) = filter.ingredient_id {
        qb.push(" AND ingredient_id = ").push_bind(ingredient_id.to_string());
    }
    if let Some(on_hold) = filter.is_on_hold {
        qb.push(" AND is_on_hold = ").push_bind(on_hold);
    }
}

#[async_trait]
impl LotStore for SqliteLotStore {
    async fn insert(&self, lot: &Lot) -> Result<()> {
        let result = sqlx::query(&format!(
            "INSERT INTO lots ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            LOT_COLUMNS
        ))
        .bind(lot.id.to_string())
        .bind(lot.tenant_id.to_string())
        .bind(&lot.lot_number)
        .bind(lot.ingredient_id.map(|id| id.to_string()))
        .bind(lot.product_id.map(|id| id.to_string()))
        .bind(&lot.product_code)
        .bind(&lot.product_name)
        .bind(lot.supplier_id.map(|id| id.to_string()))
        .bind(lot.production_batch_id.map(|id| id.to_string()))
        .bind(lot.received_date)
        .bind(lot.manufactured_date)
        .bind(lot.expiry_date)
        .bind(lot.quantity)
        .bind(&lot.unit_of_measure)
        .bind(lot.quantity_remaining)
        .bind(lot.status.as_str())
        .bind(lot.test_results.as_ref().map(|v| serde_json::to_string(v)).transpose()?)
        .bind(lot.quality_score)
        .bind(serde_json::to_string(&lot.parent_lots)?)
        .bind(serde_json::to_string(&lot.child_lots)?)
        .bind(lot.is_on_hold)
        .bind(&lot.hold_reason)
        .bind(lot.hold_date)
        .bind(lot.released_date)
        .bind(&lot.released_by)
        .bind(&lot.notes)
        .bind(lot.version)
        .bind(lot.created_at)
        .bind(lot.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(Error::Conflict(
                format!("Lot number '{}' already exists", lot.lot_number),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_by_id(&self, tenant_id: Uuid, lot_id: Uuid) -> Result<Option<Lot>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM lots WHERE tenant_id = ? AND id = ?",
            LOT_COLUMNS
        ))
        .bind(tenant_id.to_string())
        .bind(lot_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(lot_from_row).transpose()
    }

    async fn get_by_number(&self, tenant_id: Uuid, lot_number: &str) -> Result<Option<Lot>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM lots WHERE tenant_id = ? AND lot_number = ?",
            LOT_COLUMNS
        ))
        .bind(tenant_id.to_string())
        .bind(lot_number)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(lot_from_row).transpose()
    }

    async fn list(&self, tenant_id: Uuid, filter: &LotFilter, page: Page) -> Result<(Vec<Lot>, i64)> {
        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM lots");
        push_filters(&mut count_qb, tenant_id, filter);
        let total: i64 = count_qb.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM lots", LOT_COLUMNS));
        push_filters(&mut qb, tenant_id, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit)
            .push(" OFFSET ")
            .push_bind(page.skip);

        let rows = qb.build().fetch_all(&self.pool).await?;
        let lots = rows.iter().map(lot_from_row).collect::<Result<Vec<_>>>()?;

        Ok((lots, total))
    }

    async fn count_on_hold(&self, tenant_id: Uuid) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM lots WHERE tenant_id = ? AND is_on_hold = 1")
                .bind(tenant_id.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn save_all(&self, tenant_id: Uuid, batch: &mut [Lot]) -> Result<()> {
        for (i, lot) in batch.iter().enumerate() {
            if batch[..i].iter().any(|l| l.id == lot.id) {
                return Err(Error::InvalidInput(format!(
                    "Lot {} appears twice in one save",
                    lot.lot_number
                )));
            }
        }

        let now = fsq_common::time::now();
        let mut tx = self.pool.begin().await?;

        for lot in batch.iter() {
            let result = sqlx::query(
                r#"
                UPDATE lots SET
                    status = ?, quantity_remaining = ?, test_results = ?, quality_score = ?,
                    parent_lots = ?, child_lots = ?, is_on_hold = ?, hold_reason = ?,
                    hold_date = ?, released_date = ?, released_by = ?, notes = ?,
                    version = version + 1, updated_at = ?
                WHERE tenant_id = ? AND id = ? AND version = ?
                "#,
            )
            .bind(lot.status.as_str())
            .bind(lot.quantity_remaining)
            .bind(lot.test_results.as_ref().map(|v| serde_json::to_string(v)).transpose()?)
            .bind(lot.quality_score)
            .bind(serde_json::to_string(&lot.parent_lots)?)
            .bind(serde_json::to_string(&lot.child_lots)?)
            .bind(lot.is_on_hold)
            .bind(&lot.hold_reason)
            .bind(lot.hold_date)
            .bind(lot.released_date)
            .bind(&lot.released_by)
            .bind(&lot.notes)
            .bind(now)
            .bind(tenant_id.to_string())
            .bind(lot.id.to_string())
            .bind(lot.version)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                // Dropping `tx` rolls back anything already written in this batch
                let stored: Option<i64> =
                    sqlx::query_scalar("SELECT version FROM lots WHERE tenant_id = ? AND id = ?")
                        .bind(tenant_id.to_string())
                        .bind(lot.id.to_string())
                        .fetch_optional(&mut *tx)
                        .await?;

                return Err(match stored {
                    Some(version) => Error::StaleVersion(format!(
                        "Lot {} changed since it was read (version {} != {})",
                        lot.lot_number, lot.version, version
                    )),
                    None => Error::NotFound(format!("Lot with ID {} not found", lot.id)),
                });
            }
        }

        tx.commit().await?;

        for lot in batch.iter_mut() {
            lot.version += 1;
            lot.updated_at = now;
        }

        debug!(tenant_id = %tenant_id, lots = batch.len(), "Saved lot batch");
        Ok(())
    }
}
