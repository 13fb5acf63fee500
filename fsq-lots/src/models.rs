//! Lot data model
//!
//! A lot is a traceable batch of ingredient or finished product. Genealogy
//! is stored on the lot itself: `parent_lots` and `child_lots` are ordered
//! lists of lot numbers, kept symmetric by [`crate::link`].

use chrono::{DateTime, Utc};
use fsq_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Maximum length of a lot number
pub const MAX_LOT_NUMBER_LEN: usize = 100;

/// Maximum length of a unit of measure
pub const MAX_UNIT_LEN: usize = 50;

/// Lot lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LotStatus {
    /// Received or produced, awaiting QC
    Pending,
    Approved,
    /// On hold pending investigation
    Quarantine,
    Rejected,
    /// Released from hold
    Released,
    Consumed,
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LotStatus::Pending => "pending",
            LotStatus::Approved => "approved",
            LotStatus::Quarantine => "quarantine",
            LotStatus::Rejected => "rejected",
            LotStatus::Released => "released",
            LotStatus::Consumed => "consumed",
        }
    }
}

impl fmt::Display for LotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LotStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(LotStatus::Pending),
            "approved" => Ok(LotStatus::Approved),
            "quarantine" => Ok(LotStatus::Quarantine),
            "rejected" => Ok(LotStatus::Rejected),
            "released" => Ok(LotStatus::Released),
            "consumed" => Ok(LotStatus::Consumed),
            other => Err(Error::InvalidInput(format!("Unknown lot status '{}'", other))),
        }
    }
}

/// Lot record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub lot_number: String,

    pub ingredient_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub production_batch_id: Option<Uuid>,

    pub received_date: Option<DateTime<Utc>>,
    pub manufactured_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,

    pub quantity: f64,
    pub unit_of_measure: String,
    pub quantity_remaining: f64,

    pub status: LotStatus,
    pub test_results: Option<serde_json::Value>,
    pub quality_score: Option<f64>,

    /// Lot numbers this lot was produced from
    pub parent_lots: Vec<String>,
    /// Lot numbers produced from this lot
    pub child_lots: Vec<String>,

    pub is_on_hold: bool,
    pub hold_reason: Option<String>,
    pub hold_date: Option<DateTime<Utc>>,
    pub released_date: Option<DateTime<Utc>>,
    pub released_by: Option<String>,
    pub notes: Option<String>,

    /// Optimistic concurrency token, bumped by every successful save
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lot {
    /// Build a new `pending` lot for a tenant from a validated create request
    pub fn new(tenant_id: Uuid, data: NewLot) -> Self {
        let now = fsq_common::time::now();
        Self {
            id: fsq_common::uuid_utils::generate(),
            tenant_id,
            quantity_remaining: data.quantity_remaining.unwrap_or(data.quantity),
            lot_number: data.lot_number,
            ingredient_id: data.ingredient_id,
            product_id: data.product_id,
            product_code: data.product_code,
            product_name: data.product_name,
            supplier_id: data.supplier_id,
            production_batch_id: data.production_batch_id,
            received_date: data.received_date,
            manufactured_date: data.manufactured_date,
            expiry_date: data.expiry_date,
            quantity: data.quantity,
            unit_of_measure: data.unit_of_measure,
            status: LotStatus::Pending,
            test_results: None,
            quality_score: None,
            parent_lots: Vec::new(),
            child_lots: Vec::new(),
            is_on_hold: false,
            hold_reason: None,
            hold_date: None,
            released_date: None,
            released_by: None,
            notes: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Edge list followed when tracing in `direction`
    pub fn related(&self, direction: TraceDirection) -> &[String] {
        match direction {
            TraceDirection::Forward => &self.child_lots,
            TraceDirection::Backward => &self.parent_lots,
        }
    }
}

/// Create request for a lot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewLot {
    pub lot_number: String,
    pub ingredient_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub production_batch_id: Option<Uuid>,
    pub received_date: Option<DateTime<Utc>>,
    pub manufactured_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub quantity: f64,
    pub unit_of_measure: String,
    /// Defaults to `quantity`
    pub quantity_remaining: Option<f64>,
}

impl NewLot {
    /// Minimal create request: number, quantity and unit
    pub fn new(lot_number: impl Into<String>, quantity: f64, unit_of_measure: impl Into<String>) -> Self {
        Self {
            lot_number: lot_number.into(),
            quantity,
            unit_of_measure: unit_of_measure.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let number_len = self.lot_number.trim().chars().count();
        if number_len == 0 || self.lot_number.chars().count() > MAX_LOT_NUMBER_LEN {
            return Err(Error::InvalidInput(format!(
                "lot_number must be 1-{} characters",
                MAX_LOT_NUMBER_LEN
            )));
        }
        if !self.quantity.is_finite() || self.quantity <= 0.0 {
            return Err(Error::InvalidInput("quantity must be greater than 0".to_string()));
        }
        let unit_len = self.unit_of_measure.trim().chars().count();
        if unit_len == 0 || self.unit_of_measure.chars().count() > MAX_UNIT_LEN {
            return Err(Error::InvalidInput(format!(
                "unit_of_measure must be 1-{} characters",
                MAX_UNIT_LEN
            )));
        }
        if let Some(remaining) = self.quantity_remaining {
            if !remaining.is_finite() || remaining < 0.0 {
                return Err(Error::InvalidInput(
                    "quantity_remaining must be a finite number >= 0".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Partial update of a lot
///
/// Genealogy lists are deliberately absent: they change only through
/// linking, which keeps both sides in step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LotUpdate {
    pub status: Option<LotStatus>,
    pub quantity_remaining: Option<f64>,
    pub test_results: Option<serde_json::Value>,
    pub quality_score: Option<f64>,
    pub is_on_hold: Option<bool>,
    pub hold_reason: Option<String>,
    pub released_by: Option<String>,
    pub notes: Option<String>,
}

impl LotUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(remaining) = self.quantity_remaining {
            if !remaining.is_finite() || remaining < 0.0 {
                return Err(Error::InvalidInput(
                    "quantity_remaining must be a finite number >= 0".to_string(),
                ));
            }
        }
        if let Some(score) = self.quality_score {
            if !(0.0..=100.0).contains(&score) {
                return Err(Error::InvalidInput("quality_score must be between 0 and 100".to_string()));
            }
        }
        Ok(())
    }

    /// Apply the set fields to `lot`
    pub fn apply(self, lot: &mut Lot) {
        if let Some(status) = self.status {
            lot.status = status;
        }
        if let Some(remaining) = self.quantity_remaining {
            lot.quantity_remaining = remaining;
        }
        if let Some(results) = self.test_results {
            lot.test_results = Some(results);
        }
        if let Some(score) = self.quality_score {
            lot.quality_score = Some(score);
        }
        if let Some(on_hold) = self.is_on_hold {
            lot.is_on_hold = on_hold;
        }
        if let Some(reason) = self.hold_reason {
            lot.hold_reason = Some(reason);
        }
        if let Some(released_by) = self.released_by {
            lot.released_by = Some(released_by);
        }
        if let Some(notes) = self.notes {
            lot.notes = Some(notes);
        }
    }
}

/// Optional filters for listing lots
#[derive(Debug, Clone, Default)]
pub struct LotFilter {
    pub status: Option<LotStatus>,
    pub supplier_id: Option<Uuid>,
    pub ingredient_id: Option<Uuid>,
    pub is_on_hold: Option<bool>,
}

impl LotFilter {
    pub fn matches(&self, lot: &Lot) -> bool {
        self.status.map_or(true, |s| lot.status == s)
            && self.supplier_id.map_or(true, |id| lot.supplier_id == Some(id))
            && self.ingredient_id.map_or(true, |id| lot.ingredient_id == Some(id))
            && self.is_on_hold.map_or(true, |h| lot.is_on_hold == h)
    }
}

/// Direction of a genealogy trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceDirection {
    /// Where did this lot go? (follows `child_lots`)
    Forward,
    /// Where did this lot come from? (follows `parent_lots`)
    Backward,
}

impl TraceDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceDirection::Forward => "forward",
            TraceDirection::Backward => "backward",
        }
    }
}

impl fmt::Display for TraceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a forward or backward trace
///
/// `traced_lots` is sound (every lot really is related) but only complete up
/// to `trace_depth` hops; `depth_limited` says whether the bound cut anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LotTraceResult {
    pub direction: TraceDirection,
    pub origin_lot_id: Uuid,
    pub origin_lot_number: String,
    pub traced_lots: Vec<Lot>,
    pub trace_depth: u32,
    pub total_lots: usize,
    /// Referenced lot numbers that no longer resolve in the tenant
    pub unresolved_lot_numbers: Vec<String>,
    /// True when a lot at the depth bound still had unexplored references
    pub depth_limited: bool,
}

impl LotTraceResult {
    pub fn contains_lot_number(&self, lot_number: &str) -> bool {
        self.traced_lots.iter().any(|l| l.lot_number == lot_number)
    }

    pub fn lot_numbers(&self) -> Vec<&str> {
        self.traced_lots.iter().map(|l| l.lot_number.as_str()).collect()
    }
}
