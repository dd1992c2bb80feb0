//! Physical stock units held in cabinets

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// One physical unit in the legacy stock table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockUnit {
    pub id: i64,
    /// Legacy stock id of the cabinet holding this unit
    pub stock_id: i64,
    pub item_code: String,
    pub item_description: Option<String>,
    pub state: StockState,
    pub last_moved_by: Option<Uuid>,
    pub last_moved_at: Option<DateTime<Utc>>,
    pub version: i64,
}

/// Where a physical unit currently is
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockState {
    InCabinet,
    Dispensed,
    /// Sent back out of the cabinet with a return reason; terminal
    Returned,
}

impl StockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockState::InCabinet => "in_cabinet",
            StockState::Dispensed => "dispensed",
            StockState::Returned => "returned",
        }
    }

    pub fn parse(value: &str) -> DomainResult<Self> {
        match value {
            "in_cabinet" => Ok(StockState::InCabinet),
            "dispensed" => Ok(StockState::Dispensed),
            "returned" => Ok(StockState::Returned),
            other => Err(DomainError::validation(
                "state",
                format!("Unknown stock state '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for StockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockState::InCabinet => write!(f, "In Cabinet"),
            StockState::Dispensed => write!(f, "Dispensed"),
            StockState::Returned => write!(f, "Returned"),
        }
    }
}

/// Bulk movement applied to stock rows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockMovement {
    ReturnToCabinet,
    DispenseFromCabinet,
}

impl StockMovement {
    /// State a row must be in for the movement to apply
    pub fn required_state(&self) -> StockState {
        match self {
            StockMovement::ReturnToCabinet => StockState::Dispensed,
            StockMovement::DispenseFromCabinet => StockState::InCabinet,
        }
    }

    /// State a row ends up in
    pub fn target_state(&self) -> StockState {
        match self {
            StockMovement::ReturnToCabinet => StockState::InCabinet,
            StockMovement::DispenseFromCabinet => StockState::Dispensed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockMovement::ReturnToCabinet => "return_to_cabinet",
            StockMovement::DispenseFromCabinet => "dispense_from_cabinet",
        }
    }
}

/// Whether a unit may be sent out with a stock return
pub fn ensure_returnable(state: StockState) -> DomainResult<()> {
    if state == StockState::Returned {
        return Err(DomainError::invalid_state("stock unit already returned"));
    }
    Ok(())
}
