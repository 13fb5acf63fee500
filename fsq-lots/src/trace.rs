//! Lot genealogy tracing
//!
//! Walks the genealogy graph depth-first from an origin lot, following
//! `child_lots` (forward) or `parent_lots` (backward) in list order. The
//! graph may contain cycles because linking never rejects them, so the depth
//! bound is a hard stop rather than a tuning knob: a lot more than
//! `max_depth` hops from the origin is never visited.
//!
//! The walk keeps an explicit frame stack instead of recursing, which yields
//! the same pre-order as the recursive formulation without boxing futures.
//! Discovered lots are keyed by id, so two fetches of the same row never
//! count twice.

use std::collections::{HashMap, HashSet};

use fsq_common::{Error, Result};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Lot, LotTraceResult, TraceDirection};
use crate::store::LotStore;

/// Depth used by callers that do not pick one
pub const DEFAULT_TRACE_DEPTH: u32 = 10;

/// Pending references of one lot on the walk
struct Frame {
    lot_number: String,
    refs: Vec<String>,
    next: usize,
    depth: u32,
}

impl Frame {
    fn new(lot: &Lot, direction: TraceDirection, depth: u32) -> Self {
        Self {
            lot_number: lot.lot_number.clone(),
            refs: lot.related(direction).to_vec(),
            next: 0,
            depth,
        }
    }
}

/// Trace `origin` through the tenant's genealogy graph
///
/// Fails with `InvalidInput` when `max_depth` is 0. References that no
/// longer resolve are skipped, logged, and listed in
/// `unresolved_lot_numbers`; they never fail the trace.
///
/// A lot reached again at a strictly shallower depth than before is
/// re-expanded from there (but not listed twice), so every lot within
/// `max_depth` hops is found even when a deeper path reached it first.
pub async fn trace<S: LotStore>(
    store: &S,
    tenant_id: Uuid,
    origin: &Lot,
    direction: TraceDirection,
    max_depth: u32,
) -> Result<LotTraceResult> {
    if max_depth == 0 {
        return Err(Error::InvalidInput(
            "max_depth must be a positive integer".to_string(),
        ));
    }

    let mut traced: Vec<Lot> = Vec::new();
    // Shallowest depth at which each traced lot has been reached
    let mut seen_depth: HashMap<Uuid, u32> = HashMap::new();
    let mut unresolved: Vec<String> = Vec::new();
    let mut unresolved_seen: HashSet<String> = HashSet::new();

    let mut stack = vec![Frame::new(origin, direction, 0)];

    while let Some(frame) = stack.last_mut() {
        if frame.next >= frame.refs.len() {
            stack.pop();
            continue;
        }

        let lot_number = frame.refs[frame.next].clone();
        frame.next += 1;
        let depth = frame.depth + 1;
        let referenced_from = frame.lot_number.clone();

        let Some(lot) = store.get_by_number(tenant_id, &lot_number).await? else {
            warn!(
                tenant_id = %tenant_id,
                lot_number = %lot_number,
                referenced_from = %referenced_from,
                direction = %direction,
                "Genealogy reference does not resolve; skipping branch"
            );
            if unresolved_seen.insert(lot_number.clone()) {
                unresolved.push(lot_number);
            }
            continue;
        };

        match seen_depth.get(&lot.id) {
            None => {
                seen_depth.insert(lot.id, depth);
            }
            Some(&previous) if depth < previous => {
                debug!(
                    lot_number = %lot.lot_number,
                    previous_depth = previous,
                    depth,
                    "Re-expanding lot reached by a shorter path"
                );
                seen_depth.insert(lot.id, depth);
                if depth < max_depth {
                    stack.push(Frame::new(&lot, direction, depth));
                }
                continue;
            }
            Some(_) => continue,
        }

        if depth < max_depth {
            stack.push(Frame::new(&lot, direction, depth));
        }
        traced.push(lot);
    }

    // Truncated only if some lot's shallowest depth left its references unexplored
    let depth_limited = traced.iter().any(|lot| {
        !lot.related(direction).is_empty()
            && seen_depth.get(&lot.id).is_some_and(|&depth| depth >= max_depth)
    });

    Ok(LotTraceResult {
        direction,
        origin_lot_id: origin.id,
        origin_lot_number: origin.lot_number.clone(),
        total_lots: traced.len(),
        traced_lots: traced,
        trace_depth: max_depth,
        unresolved_lot_numbers: unresolved,
        depth_limited,
    })
}
