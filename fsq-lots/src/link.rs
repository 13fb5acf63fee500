//! Two-sided genealogy links
//!
//! A link is recorded on both lots: the parent's `child_lots` gains the
//! child's number and the child's `parent_lots` gains the parent's. Both
//! sides are written in one `save_all` so a failure leaves neither changed.

use fsq_common::{Error, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::Lot;
use crate::store::LotStore;

/// Read-modify-write attempts before a version conflict is surfaced
pub const LINK_MAX_ATTEMPTS: u32 = 3;

async fn load<S: LotStore>(store: &S, tenant_id: Uuid, lot_id: Uuid) -> Result<Lot> {
    store
        .get_by_id(tenant_id, lot_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Lot with ID {} not found", lot_id)))
}

fn push_absent(list: &mut Vec<String>, lot_number: &str) -> bool {
    if list.iter().any(|n| n == lot_number) {
        return false;
    }
    list.push(lot_number.to_string());
    true
}

/// Record `parent_id` -> `child_id` on both lots
///
/// Returns the updated `(parent, child)`. Linking an existing pair again
/// changes nothing and performs no write. A lot may be linked to itself, in
/// which case both returned lots are the same record.
pub async fn link<S: LotStore>(
    store: &S,
    tenant_id: Uuid,
    parent_id: Uuid,
    child_id: Uuid,
) -> Result<(Lot, Lot)> {
    let mut attempt = 1;
    loop {
        match try_link(store, tenant_id, parent_id, child_id).await {
            Err(Error::StaleVersion(msg)) if attempt < LINK_MAX_ATTEMPTS => {
                warn!(
                    tenant_id = %tenant_id,
                    parent_id = %parent_id,
                    child_id = %child_id,
                    attempt,
                    "Lot changed during link, retrying: {}",
                    msg
                );
                attempt += 1;
            }
            other => return other,
        }
    }
}

async fn try_link<S: LotStore>(
    store: &S,
    tenant_id: Uuid,
    parent_id: Uuid,
    child_id: Uuid,
) -> Result<(Lot, Lot)> {
    let mut parent = load(store, tenant_id, parent_id).await?;

    if parent_id == child_id {
        let number = parent.lot_number.clone();
        let added_child = push_absent(&mut parent.child_lots, &number);
        let added_parent = push_absent(&mut parent.parent_lots, &number);
        if added_child || added_parent {
            store.save(tenant_id, &mut parent).await?;
            info!(tenant_id = %tenant_id, lot_number = %number, "Linked lot to itself");
        } else {
            debug!(lot_number = %number, "Self link already recorded");
        }
        return Ok((parent.clone(), parent));
    }

    let mut child = load(store, tenant_id, child_id).await?;

    let added_child = push_absent(&mut parent.child_lots, &child.lot_number);
    let added_parent = push_absent(&mut child.parent_lots, &parent.lot_number);

    if !added_child && !added_parent {
        debug!(
            parent = %parent.lot_number,
            child = %child.lot_number,
            "Link already recorded"
        );
        return Ok((parent, child));
    }

    let mut pair = [parent, child];
    store.save_all(tenant_id, &mut pair).await?;
    let [parent, child] = pair;

    info!(
        tenant_id = %tenant_id,
        parent = %parent.lot_number,
        child = %child.lot_number,
        "Linked lots"
    );

    Ok((parent, child))
}
