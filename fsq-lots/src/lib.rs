//! # FSQ Lots
//!
//! Lot management and traceability for the FSQ services:
//! - Lot records with two-sided genealogy (`parent_lots` / `child_lots`)
//! - Forward and backward traces bounded by depth and deadline
//! - Hold/release (quarantine) workflow
//! - Tenant-scoped storage behind [`LotStore`], with SQLite and in-memory
//!   implementations
//!
//! ```no_run
//! use std::sync::Arc;
//! use fsq_lots::{LotService, NewLot, SqliteLotStore, DEFAULT_TRACE_DEPTH};
//!
//! # async fn run(pool: sqlx::SqlitePool, tenant_id: uuid::Uuid) -> fsq_common::Result<()> {
//! let service = LotService::new(Arc::new(SqliteLotStore::new(pool)), tenant_id);
//! let flour = service.create_lot(NewLot::new("FLOUR-2024-118", 500.0, "kg")).await?;
//! let bread = service.create_lot(NewLot::new("BREAD-0042", 1200.0, "ea")).await?;
//! service.link_lots(flour.id, bread.id).await?;
//!
//! let affected = service.trace_forward(flour.id, DEFAULT_TRACE_DEPTH).await?;
//! assert!(affected.contains_lot_number("BREAD-0042"));
//! # Ok(())
//! # }
//! ```

pub mod link;
pub mod models;
pub mod pagination;
pub mod service;
pub mod store;
pub mod trace;

pub use models::{
    Lot, LotFilter, LotStatus, LotTraceResult, LotUpdate, NewLot, TraceDirection,
};
pub use service::LotService;
pub use store::{InMemoryLotStore, LotStore, SqliteLotStore};
pub use trace::DEFAULT_TRACE_DEPTH;
