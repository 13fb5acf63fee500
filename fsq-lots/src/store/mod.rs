//! Lot persistence
//!
//! [`LotStore`] is the only way the genealogy engine and the lot service
//! reach stored lots. Every method is scoped by tenant: a lot belonging to
//! another tenant behaves exactly like a missing one.

mod memory;
mod sqlite;

pub use memory::InMemoryLotStore;
pub use sqlite::SqliteLotStore;

use async_trait::async_trait;

use crate::models::{Lot, LotFilter};
use crate::pagination::Page;
use fsq_common::Result;
use uuid::Uuid;

/// Tenant-scoped lot storage
///
/// # Write contract
///
/// `save_all` is atomic across all lots it is given: either every lot is
/// written or none is. Each lot's `version` must equal the stored version;
/// otherwise the call fails with `Error::StaleVersion` and nothing is
/// written. On success the store bumps `version` and refreshes `updated_at`
/// on the passed-in lots so callers can keep using them.
#[async_trait]
pub trait LotStore: Send + Sync {
    /// Persist a new lot. Fails with `Error::Conflict` if the tenant already
    /// has a lot with the same number.
    async fn insert(&self, lot: &Lot) -> Result<()>;

    async fn get_by_id(&self, tenant_id: Uuid, lot_id: Uuid) -> Result<Option<Lot>>;

    async fn get_by_number(&self, tenant_id: Uuid, lot_number: &str) -> Result<Option<Lot>>;

    /// One page of matching lots (newest first) and the total match count
    async fn list(&self, tenant_id: Uuid, filter: &LotFilter, page: Page) -> Result<(Vec<Lot>, i64)>;

    async fn count_on_hold(&self, tenant_id: Uuid) -> Result<i64>;

    /// Atomically write all `lots` (see the trait docs)
    async fn save_all(&self, tenant_id: Uuid, lots: &mut [Lot]) -> Result<()>;

    /// Write a single lot
    async fn save(&self, tenant_id: Uuid, lot: &mut Lot) -> Result<()> {
        self.save_all(tenant_id, std::slice::from_mut(lot)).await
    }
}
