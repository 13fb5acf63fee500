//! Database initialization
//!
//! Opens (or creates) the SQLite database, creates the lot tables if they do
//! not exist yet, then brings older databases forward with versioned
//! migrations. Every step is idempotent, so services call this on each
//! startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Pragmas go on the connect options so every pooled connection gets them,
    // not just the first one a PRAGMA statement happens to run on.
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and run pending migrations on an open pool
///
/// Public so tests can prepare `sqlite::memory:` pools the same way.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    create_lots_table(pool).await?;
    create_lots_indexes(pool).await?;

    crate::db::migrations::run_migrations(pool).await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Create the lots table
///
/// `parent_lots` / `child_lots` hold JSON arrays of lot numbers. Lot numbers
/// are unique per tenant, never globally.
pub async fn create_lots_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lots (
            id TEXT PRIMARY KEY,
            tenant_id TEXT NOT NULL,
            lot_number TEXT NOT NULL,
            ingredient_id TEXT,
            product_id TEXT,
            product_code TEXT,
            product_name TEXT,
            supplier_id TEXT,
            production_batch_id TEXT,
            received_date TEXT,
            manufactured_date TEXT,
            expiry_date TEXT,
            quantity REAL NOT NULL,
            unit_of_measure TEXT NOT NULL,
            quantity_remaining REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            test_results TEXT,
            quality_score REAL,
            parent_lots TEXT NOT NULL DEFAULT '[]',
            child_lots TEXT NOT NULL DEFAULT '[]',
            is_on_hold INTEGER NOT NULL DEFAULT 0,
            hold_reason TEXT,
            hold_date TEXT,
            released_date TEXT,
            released_by TEXT,
            notes TEXT,
            version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (tenant_id, lot_number)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_lots_indexes(pool: &SqlitePool) -> Result<()> {
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_lots_tenant_status ON lots(tenant_id, status)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_lots_tenant_hold ON lots(tenant_id, is_on_hold)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_lots_tenant_created ON lots(tenant_id, created_at)")
        .execute(pool)
        .await?;

    Ok(())
}
