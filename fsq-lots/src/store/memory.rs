//! In-memory lot store
//!
//! Process-local and non-persistent. Used by unit tests and by embedders that
//! want the genealogy engine without a database. A single `RwLock` over the
//! whole map makes `save_all` trivially atomic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use fsq_common::{Error, Result};
use uuid::Uuid;

use super::LotStore;
use crate::models::{Lot, LotFilter};
use crate::pagination::Page;

fn poisoned<T>(_: PoisonError<T>) -> Error {
    Error::Internal("lot store lock poisoned".to_string())
}

/// Map-backed [`LotStore`]
#[derive(Debug, Default)]
pub struct InMemoryLotStore {
    lots: RwLock<HashMap<Uuid, Lot>>,
}

impl InMemoryLotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delete a lot without touching lots that reference it
    ///
    /// Mirrors an out-of-band deletion in the real database; returns the
    /// removed lot if it existed in the tenant.
    pub fn remove(&self, tenant_id: Uuid, lot_id: Uuid) -> Result<Option<Lot>> {
        let mut lots = self.lots.write().map_err(poisoned)?;
        match lots.get(&lot_id) {
            Some(lot) if lot.tenant_id == tenant_id => Ok(lots.remove(&lot_id)),
            _ => Ok(None),
        }
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lots.read().map_err(poisoned)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl LotStore for InMemoryLotStore {
    async fn insert(&self, lot: &Lot) -> Result<()> {
        let mut lots = self.lots.write().map_err(poisoned)?;

        let duplicate = lots
            .values()
            .any(|l| l.tenant_id == lot.tenant_id && l.lot_number == lot.lot_number);
        if duplicate {
            return Err(Error::Conflict(format!(
                "Lot number '{}' already exists",
                lot.lot_number
            )));
        }
        if lots.contains_key(&lot.id) {
            return Err(Error::Conflict(format!("Lot with ID {} already exists", lot.id)));
        }

        lots.insert(lot.id, lot.clone());
        Ok(())
    }

    async fn get_by_id(&self, tenant_id: Uuid, lot_id: Uuid) -> Result<Option<Lot>> {
        let lots = self.lots.read().map_err(poisoned)?;
        Ok(lots
            .get(&lot_id)
            .filter(|l| l.tenant_id == tenant_id)
            .cloned())
    }

    async fn get_by_number(&self, tenant_id: Uuid, lot_number: &str) -> Result<Option<Lot>> {
        let lots = self.lots.read().map_err(poisoned)?;
        Ok(lots
            .values()
            .find(|l| l.tenant_id == tenant_id && l.lot_number == lot_number)
            .cloned())
    }

    async fn list(&self, tenant_id: Uuid, filter: &LotFilter, page: Page) -> Result<(Vec<Lot>, i64)> {
        let lots = self.lots.read().map_err(poisoned)?;

        let mut matching: Vec<&Lot> = lots
            .values()
            .filter(|l| l.tenant_id == tenant_id && filter.matches(l))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let page_lots = matching
            .into_iter()
            .skip(page.skip as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok((page_lots, total))
    }

    async fn count_on_hold(&self, tenant_id: Uuid) -> Result<i64> {
        let lots = self.lots.read().map_err(poisoned)?;
        Ok(lots
            .values()
            .filter(|l| l.tenant_id == tenant_id && l.is_on_hold)
            .count() as i64)
    }

    async fn save_all(&self, tenant_id: Uuid, batch: &mut [Lot]) -> Result<()> {
        let mut lots = self.lots.write().map_err(poisoned)?;

        // Check every lot before writing any of them
        for (i, lot) in batch.iter().enumerate() {
            if batch[..i].iter().any(|l| l.id == lot.id) {
                return Err(Error::InvalidInput(format!(
                    "Lot {} appears twice in one save",
                    lot.lot_number
                )));
            }
            let stored = lots
                .get(&lot.id)
                .filter(|l| l.tenant_id == tenant_id && lot.tenant_id == tenant_id)
                .ok_or_else(|| Error::NotFound(format!("Lot with ID {} not found", lot.id)))?;
            if stored.version != lot.version {
                return Err(Error::StaleVersion(format!(
                    "Lot {} changed since it was read (version {} != {})",
                    lot.lot_number, lot.version, stored.version
                )));
            }
        }

        let now = fsq_common::time::now();
        for lot in batch.iter_mut() {
            lot.version += 1;
            lot.updated_at = now;
            lots.insert(lot.id, lot.clone());
        }

        Ok(())
    }
}
