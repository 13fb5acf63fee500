//! Lot service
//!
//! Tenant-bound entry point for lot management: CRUD, hold/release,
//! genealogy linking and forward/backward traces. One service instance
//! serves one tenant; every store call carries its tenant id.

use std::sync::Arc;

use fsq_common::config::TraceConfig;
use fsq_common::{Error, Result};
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{Lot, LotFilter, LotStatus, LotTraceResult, LotUpdate, NewLot, TraceDirection};
use crate::pagination;
use crate::store::LotStore;
use crate::{link, trace};

/// Lot Service
///
/// Cheap to clone; clones share the store.
#[derive(Debug)]
pub struct LotService<S> {
    store: Arc<S>,
    tenant_id: Uuid,
    settings: TraceConfig,
}

impl<S> Clone for LotService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            tenant_id: self.tenant_id,
            settings: self.settings.clone(),
        }
    }
}

impl<S: LotStore> LotService<S> {
    /// Create a service with default trace settings
    pub fn new(store: Arc<S>, tenant_id: Uuid) -> Self {
        Self::with_settings(store, tenant_id, TraceConfig::default())
    }

    pub fn with_settings(store: Arc<S>, tenant_id: Uuid, settings: TraceConfig) -> Self {
        Self {
            store,
            tenant_id,
            settings,
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Depth to use when a caller does not pick one
    pub fn default_trace_depth(&self) -> u32 {
        self.settings.default_max_depth
    }

    async fn require(&self, lot_id: Uuid) -> Result<Lot> {
        self.store
            .get_by_id(self.tenant_id, lot_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("Lot with ID {} not found", lot_id)))
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Create a lot in `pending` status
    pub async fn create_lot(&self, data: NewLot) -> Result<Lot> {
        data.validate()?;

        if self
            .store
            .get_by_number(self.tenant_id, &data.lot_number)
            .await?
            .is_some()
        {
            return Err(Error::Conflict(format!(
                "Lot number '{}' already exists",
                data.lot_number
            )));
        }

        let lot = Lot::new(self.tenant_id, data);
        self.store.insert(&lot).await?;

        info!(
            tenant_id = %self.tenant_id,
            lot_id = %lot.id,
            lot_number = %lot.lot_number,
            "Created lot"
        );

        Ok(lot)
    }

    pub async fn get_lot(&self, lot_id: Uuid) -> Result<Option<Lot>> {
        self.store.get_by_id(self.tenant_id, lot_id).await
    }

    pub async fn get_lot_by_number(&self, lot_number: &str) -> Result<Option<Lot>> {
        self.store.get_by_number(self.tenant_id, lot_number).await
    }

    /// One page of lots (newest first) plus the total match count
    ///
    /// `skip` and `limit` are clamped rather than rejected.
    pub async fn list_lots(&self, filter: &LotFilter, skip: i64, limit: i64) -> Result<(Vec<Lot>, i64)> {
        let page = pagination::page(skip, limit);
        self.store.list(self.tenant_id, filter, page).await
    }

    pub async fn update_lot(&self, lot_id: Uuid, update: LotUpdate) -> Result<Lot> {
        update.validate()?;

        let mut lot = self.require(lot_id).await?;
        update.apply(&mut lot);
        self.store.save(self.tenant_id, &mut lot).await?;

        info!(lot_id = %lot.id, lot_number = %lot.lot_number, "Updated lot");
        Ok(lot)
    }

    // ------------------------------------------------------------------
    // Hold / release
    // ------------------------------------------------------------------

    /// Quarantine a lot
    pub async fn put_on_hold(&self, lot_id: Uuid, reason: &str) -> Result<Lot> {
        if reason.is_empty() {
            return Err(Error::InvalidInput("Hold reason must not be empty".to_string()));
        }

        let mut lot = self.require(lot_id).await?;
        lot.is_on_hold = true;
        lot.hold_reason = Some(reason.to_string());
        lot.hold_date = Some(fsq_common::time::now());
        lot.status = LotStatus::Quarantine;
        self.store.save(self.tenant_id, &mut lot).await?;

        warn!(
            tenant_id = %self.tenant_id,
            lot_id = %lot.id,
            lot_number = %lot.lot_number,
            reason = %reason,
            "Lot put on hold"
        );

        Ok(lot)
    }

    /// Release a lot from hold
    ///
    /// Fails with `InvalidState` if the lot is not on hold.
    pub async fn release_lot(&self, lot_id: Uuid, released_by: &str) -> Result<Lot> {
        let mut lot = self.require(lot_id).await?;
        if !lot.is_on_hold {
            return Err(Error::InvalidState(format!(
                "Lot {} is not on hold",
                lot.lot_number
            )));
        }

        lot.is_on_hold = false;
        lot.released_date = Some(fsq_common::time::now());
        lot.released_by = Some(released_by.to_string());
        lot.status = LotStatus::Released;
        self.store.save(self.tenant_id, &mut lot).await?;

        info!(
            tenant_id = %self.tenant_id,
            lot_id = %lot.id,
            lot_number = %lot.lot_number,
            released_by = %released_by,
            "Lot released from hold"
        );

        Ok(lot)
    }

    pub async fn lots_on_hold_count(&self) -> Result<i64> {
        self.store.count_on_hold(self.tenant_id).await
    }

    // ------------------------------------------------------------------
    // Genealogy
    // ------------------------------------------------------------------

    /// Record that `child_id` was made from `parent_id`
    ///
    /// Returns the updated `(parent, child)`.
    pub async fn link_lots(&self, parent_id: Uuid, child_id: Uuid) -> Result<(Lot, Lot)> {
        link::link(self.store.as_ref(), self.tenant_id, parent_id, child_id).await
    }

    /// Every lot made from `lot_id`, up to `max_depth` hops away
    pub async fn trace_forward(&self, lot_id: Uuid, max_depth: u32) -> Result<LotTraceResult> {
        self.trace(lot_id, TraceDirection::Forward, max_depth).await
    }

    /// Every lot that went into `lot_id`, up to `max_depth` hops away
    pub async fn trace_backward(&self, lot_id: Uuid, max_depth: u32) -> Result<LotTraceResult> {
        self.trace(lot_id, TraceDirection::Backward, max_depth).await
    }

    async fn trace(&self, lot_id: Uuid, direction: TraceDirection, max_depth: u32) -> Result<LotTraceResult> {
        if max_depth == 0 || max_depth > self.settings.max_depth_limit {
            return Err(Error::InvalidInput(format!(
                "max_depth must be between 1 and {} (got {})",
                self.settings.max_depth_limit, max_depth
            )));
        }

        let origin = self.require(lot_id).await?;
        let timeout = self.settings.timeout();

        let result = tokio::time::timeout(
            timeout,
            trace::trace(self.store.as_ref(), self.tenant_id, &origin, direction, max_depth),
        )
        .await
        .map_err(|_| {
            Error::Timeout(format!(
                "{} trace of lot {} exceeded {:?}",
                direction, origin.lot_number, timeout
            ))
        })??;

        info!(
            tenant_id = %self.tenant_id,
            lot_number = %origin.lot_number,
            direction = %direction,
            total = result.total_lots,
            "Traced lot genealogy"
        );
        if result.depth_limited {
            info!(lot_number = %origin.lot_number, max_depth, "Trace stopped at depth limit");
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::Page;
    use crate::store::InMemoryLotStore;
    use std::time::Duration;

    fn service() -> LotService<InMemoryLotStore> {
        LotService::new(Arc::new(InMemoryLotStore::new()), Uuid::new_v4())
    }

    #[tokio::test]
    async fn test_create_lot_defaults() {
        let svc = service();
        let lot = svc.create_lot(NewLot::new("LOT-001", 100.0, "kg")).await.unwrap();

        assert_eq!(lot.status, LotStatus::Pending);
        assert_eq!(lot.quantity_remaining, 100.0);
        assert_eq!(lot.tenant_id, svc.tenant_id());
        assert!(lot.parent_lots.is_empty() && lot.child_lots.is_empty());
    }

    #[tokio::test]
    async fn test_create_lot_validates() {
        let svc = service();
        let err = svc.create_lot(NewLot::new("", 1.0, "kg")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = svc.create_lot(NewLot::new("LOT-1", 0.0, "kg")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
        let err = svc.create_lot(NewLot::new("LOT-1", 1.0, " ")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_duplicate_lot_number() {
        let svc = service();
        svc.create_lot(NewLot::new("LOT-001", 1.0, "kg")).await.unwrap();
        let err = svc.create_lot(NewLot::new("LOT-001", 1.0, "kg")).await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_lot() {
        let svc = service();
        let lot = svc.create_lot(NewLot::new("LOT-001", 10.0, "kg")).await.unwrap();

        let update = LotUpdate {
            status: Some(LotStatus::Approved),
            quantity_remaining: Some(4.0),
            notes: Some("partially used".to_string()),
            ..LotUpdate::default()
        };
        let updated = svc.update_lot(lot.id, update).await.unwrap();
        assert_eq!(updated.status, LotStatus::Approved);
        assert_eq!(updated.quantity_remaining, 4.0);
        assert_eq!(updated.version, 1);

        let bad = LotUpdate {
            quality_score: Some(120.0),
            ..LotUpdate::default()
        };
        assert!(matches!(svc.update_lot(lot.id, bad).await.unwrap_err(), Error::InvalidInput(_)));
        assert!(matches!(
            svc.update_lot(Uuid::new_v4(), LotUpdate::default()).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_hold_and_release() {
        let svc = service();
        let lot = svc.create_lot(NewLot::new("LOT-001", 10.0, "kg")).await.unwrap();

        let held = svc.put_on_hold(lot.id, "Listeria swab positive").await.unwrap();
        assert!(held.is_on_hold);
        assert_eq!(held.status, LotStatus::Quarantine);
        assert_eq!(held.hold_reason.as_deref(), Some("Listeria swab positive"));
        assert!(held.hold_date.is_some());
        assert_eq!(svc.lots_on_hold_count().await.unwrap(), 1);

        let released = svc.release_lot(lot.id, "qa.lead").await.unwrap();
        assert!(!released.is_on_hold);
        assert_eq!(released.status, LotStatus::Released);
        assert_eq!(released.released_by.as_deref(), Some("qa.lead"));
        assert!(released.released_date.is_some());
        assert_eq!(svc.lots_on_hold_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_hold_requires_reason() {
        let svc = service();
        let lot = svc.create_lot(NewLot::new("LOT-001", 10.0, "kg")).await.unwrap();
        let err = svc.put_on_hold(lot.id, "").await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        // Any non-empty reason is accepted as given
        let held = svc.put_on_hold(lot.id, " ").await.unwrap();
        assert_eq!(held.hold_reason.as_deref(), Some(" "));
    }

    #[tokio::test]
    async fn test_release_without_hold() {
        let svc = service();
        let lot = svc.create_lot(NewLot::new("LOT-001", 10.0, "kg")).await.unwrap();
        let err = svc.release_lot(lot.id, "qa").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_trace_depth_bounds() {
        let svc = service();
        let lot = svc.create_lot(NewLot::new("LOT-001", 10.0, "kg")).await.unwrap();

        assert!(matches!(svc.trace_forward(lot.id, 0).await.unwrap_err(), Error::InvalidInput(_)));
        assert!(matches!(svc.trace_backward(lot.id, 51).await.unwrap_err(), Error::InvalidInput(_)));
        assert!(svc.trace_forward(lot.id, 50).await.is_ok());
        assert!(matches!(
            svc.trace_forward(Uuid::new_v4(), 10).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_link_and_trace() {
        let svc = service();
        let raw = svc.create_lot(NewLot::new("RAW-1", 10.0, "kg")).await.unwrap();
        let fg = svc.create_lot(NewLot::new("FG-1", 10.0, "kg")).await.unwrap();

        svc.link_lots(raw.id, fg.id).await.unwrap();

        let forward = svc.trace_forward(raw.id, svc.default_trace_depth()).await.unwrap();
        assert_eq!(forward.lot_numbers(), vec!["FG-1"]);
        let backward = svc.trace_backward(fg.id, svc.default_trace_depth()).await.unwrap();
        assert_eq!(backward.lot_numbers(), vec!["RAW-1"]);
        assert_eq!(backward.origin_lot_number, "FG-1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_service_calls_run_on_spawned_tasks() {
        let svc = service();
        let a = svc.create_lot(NewLot::new("A", 1.0, "kg")).await.unwrap();
        let b = svc.create_lot(NewLot::new("B", 1.0, "kg")).await.unwrap();

        let worker = svc.clone();
        let handle = tokio::spawn(async move {
            worker.link_lots(a.id, b.id).await?;
            worker.trace_forward(a.id, 5).await
        });
        let result = handle.await.unwrap().unwrap();
        assert_eq!(result.lot_numbers(), vec!["B"]);
    }

    /// Store whose lookups by number never finish in time
    struct Slow(InMemoryLotStore);

    #[async_trait::async_trait]
    impl LotStore for Slow {
        async fn insert(&self, lot: &Lot) -> Result<()> {
            self.0.insert(lot).await
        }
        async fn get_by_id(&self, tenant_id: Uuid, lot_id: Uuid) -> Result<Option<Lot>> {
            self.0.get_by_id(tenant_id, lot_id).await
        }
        async fn get_by_number(&self, tenant_id: Uuid, lot_number: &str) -> Result<Option<Lot>> {
            tokio::time::sleep(Duration::from_millis(200)).await;
            self.0.get_by_number(tenant_id, lot_number).await
        }
        async fn list(&self, tenant_id: Uuid, filter: &LotFilter, page: Page) -> Result<(Vec<Lot>, i64)> {
            self.0.list(tenant_id, filter, page).await
        }
        async fn count_on_hold(&self, tenant_id: Uuid) -> Result<i64> {
            self.0.count_on_hold(tenant_id).await
        }
        async fn save_all(&self, tenant_id: Uuid, lots: &mut [Lot]) -> Result<()> {
            self.0.save_all(tenant_id, lots).await
        }
    }

    #[tokio::test]
    async fn test_trace_timeout() {
        let settings = TraceConfig {
            timeout_ms: 20,
            ..TraceConfig::default()
        };
        let svc = LotService::with_settings(Arc::new(Slow(InMemoryLotStore::new())), Uuid::new_v4(), settings);
        let a = svc.create_lot(NewLot::new("A", 1.0, "kg")).await.unwrap();
        let b = svc.create_lot(NewLot::new("B", 1.0, "kg")).await.unwrap();
        svc.link_lots(a.id, b.id).await.unwrap();

        let err = svc.trace_forward(a.id, 5).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }
}
