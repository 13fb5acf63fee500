//! Shared integration test utilities
//!
//! Services here run against a real on-disk SQLite database in a temporary
//! directory, with the production schema applied.

#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use fsq_common::config::LoggingConfig;
use fsq_lots::{Lot, LotService, NewLot, SqliteLotStore};
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

/// Create temporary test database with the lot schema applied
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> Result<(TempDir, SqlitePool)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test_fsq.db");
    let pool = fsq_common::db::init_database(&db_path).await?;
    Ok((temp_dir, pool))
}

/// Test database plus one service per tenant sharing the same store
pub struct TestEnv {
    pub _temp_dir: TempDir,
    pub store: Arc<SqliteLotStore>,
}

impl TestEnv {
    pub async fn new() -> Result<Self> {
        // Shows engine warnings with `RUST_LOG=fsq_lots=debug cargo test -- --nocapture`
        fsq_common::logging::init_tracing(&LoggingConfig::default())?;
        let (temp_dir, pool) = create_test_db().await?;
        Ok(Self {
            _temp_dir: temp_dir,
            store: Arc::new(SqliteLotStore::new(pool)),
        })
    }

    /// Service bound to a fresh tenant
    pub fn tenant(&self) -> LotService<SqliteLotStore> {
        LotService::new(Arc::clone(&self.store), Uuid::new_v4())
    }
}

/// Create a lot with quantity 100 kg
pub async fn lot(service: &LotService<SqliteLotStore>, number: &str) -> Result<Lot> {
    Ok(service.create_lot(NewLot::new(number, 100.0, "kg")).await?)
}

/// Create lots `numbers` and link each consecutive pair as parent -> child
pub async fn chain(service: &LotService<SqliteLotStore>, numbers: &[&str]) -> Result<Vec<Lot>> {
    let mut lots = Vec::with_capacity(numbers.len());
    for number in numbers {
        lots.push(lot(service, number).await?);
    }
    for pair in lots.windows(2) {
        service.link_lots(pair[0].id, pair[1].id).await?;
    }
    Ok(lots)
}
