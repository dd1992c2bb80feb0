//! Return audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::batch::RowFailureReason;
use super::stock::{ensure_returnable, StockState};
use crate::error::{DomainError, DomainResult};
use crate::validation::validate_note;

/// Why supply was returned
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    UnwrappedUnused,
    Expired,
    Contaminated,
    Damaged,
}

impl ReturnReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnReason::UnwrappedUnused => "unwrapped_unused",
            ReturnReason::Expired => "expired",
            ReturnReason::Contaminated => "contaminated",
            ReturnReason::Damaged => "damaged",
        }
    }

    pub fn parse(value: &str) -> DomainResult<Self> {
        match value {
            "unwrapped_unused" => Ok(ReturnReason::UnwrappedUnused),
            "expired" => Ok(ReturnReason::Expired),
            "contaminated" => Ok(ReturnReason::Contaminated),
            "damaged" => Ok(ReturnReason::Damaged),
            other => Err(DomainError::validation(
                "reason",
                format!("Unknown return reason '{}'", other),
            )),
        }
    }
}

/// What a return record points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ReturnSource {
    /// Return of a line dispensed to a patient encounter
    SupplyItem(Uuid),
    /// Return straight from a cabinet scan
    StockUnit(i64),
}

impl ReturnSource {
    /// Rebuild from the two nullable reference columns
    pub fn from_columns(supply_item_id: Option<Uuid>, stock_unit_id: Option<i64>) -> DomainResult<Self> {
        match (supply_item_id, stock_unit_id) {
            (Some(item), None) => Ok(ReturnSource::SupplyItem(item)),
            (None, Some(unit)) => Ok(ReturnSource::StockUnit(unit)),
            _ => Err(DomainError::invalid_state(
                "return record must reference exactly one source",
            )),
        }
    }

    pub fn supply_item_id(&self) -> Option<Uuid> {
        match self {
            ReturnSource::SupplyItem(id) => Some(*id),
            ReturnSource::StockUnit(_) => None,
        }
    }

    pub fn stock_unit_id(&self) -> Option<i64> {
        match self {
            ReturnSource::StockUnit(id) => Some(*id),
            ReturnSource::SupplyItem(_) => None,
        }
    }
}

/// Immutable record of one return event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub id: Uuid,
    pub source: ReturnSource,
    pub qty: i32,
    pub reason: ReturnReason,
    pub note: Option<String>,
    pub returned_by: Uuid,
    pub returned_at: DateTime<Utc>,
}

/// One row of a cabinet-scan return
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReturnRow {
    pub stock_unit_id: i64,
    /// Legacy stock id of the scanned cabinet; the unit must sit in it when given
    #[serde(default)]
    pub stock_id: Option<i64>,
    pub reason: ReturnReason,
    pub note: Option<String>,
}

impl StockReturnRow {
    pub fn validate(&self) -> DomainResult<()> {
        validate_note(self.note.as_deref())
    }

    /// Decide whether the located unit, as `(stock_id, state)`, can be returned
    pub fn check_unit(&self, unit: Option<(i64, StockState)>) -> Result<(), RowFailureReason> {
        let (stock_id, state) = unit.ok_or(RowFailureReason::NotFound)?;
        if self.stock_id.is_some_and(|expected| expected != stock_id) {
            return Err(RowFailureReason::WrongCabinet);
        }
        if ensure_returnable(state).is_err() {
            return Err(RowFailureReason::AlreadyInTargetState);
        }
        Ok(())
    }
}
