//! Database schema migrations
//!
//! Versioned migrations tracked in the `schema_version` table. Tables are
//! created with their current shape by [`crate::db::init`]; migrations only
//! bring databases created by older builds up to date.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field already ran them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Idempotent** - check before altering, so re-runs are harmless
//! 4. **Use ALTER TABLE** - prefer it over DROP/CREATE to keep lot history

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    Ok(())
}

/// Migration v1: Add version column to lots table
///
/// **Background:** lots tables created before link writes became
/// version-checked have no `version` column. Existing rows start at 0.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: Add version column to lots");

    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='lots'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        info!("  Lots table doesn't exist yet - skipping migration");
        return Ok(());
    }

    let has_column: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('lots') WHERE name = 'version'",
    )
    .fetch_one(pool)
    .await?;

    if has_column > 0 {
        info!("  version column already exists - skipping");
        return Ok(());
    }

    // Catch duplicate column error for concurrent initialization races
    match sqlx::query("ALTER TABLE lots ADD COLUMN version INTEGER NOT NULL DEFAULT 0")
        .execute(pool)
        .await
    {
        Ok(_) => {
            info!("  ✓ Added version column to lots table");
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
            info!("  version column added by concurrent initializer - skipping");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
