//! Supply usage ledger models
//!
//! Each [`SupplyUsageItem`] is one supply line dispensed within a patient
//! encounter. Its quantities live in a [`SupplyQuantities`] aggregate so the
//! `used + returned <= qty` invariant is checked in exactly one place.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Lifecycle status of a supply line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SupplyStatus {
    Verified,
    /// Cancelled by a bill correction; counters are frozen
    Discontinued,
}

impl SupplyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SupplyStatus::Verified => "verified",
            SupplyStatus::Discontinued => "discontinued",
        }
    }

    pub fn parse(value: &str) -> DomainResult<Self> {
        match value {
            "verified" => Ok(SupplyStatus::Verified),
            "discontinued" => Ok(SupplyStatus::Discontinued),
            other => Err(DomainError::validation(
                "status",
                format!("Unknown supply status '{}'", other),
            )),
        }
    }

    /// Only verified lines accept counter increments
    pub fn ensure_open(&self) -> DomainResult<()> {
        match self {
            SupplyStatus::Verified => Ok(()),
            SupplyStatus::Discontinued => Err(DomainError::invalid_state(
                "supply line is discontinued; its counters are frozen",
            )),
        }
    }
}

/// The patient encounter a supply line was dispensed to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Encounter {
    pub patient_id: String,
    pub episode_id: String,
    pub department_code: String,
    pub encounter_at: DateTime<Utc>,
}

/// Dispensed, used and returned quantities of one line
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SupplyQuantities {
    qty: i32,
    used_with_patient: i32,
    returned_to_cabinet: i32,
}

impl SupplyQuantities {
    /// Fresh line with nothing accounted for yet
    pub fn dispensed(qty: i32) -> DomainResult<Self> {
        Self::from_parts(qty, 0, 0)
    }

    /// Rebuild from stored counters, rejecting rows that break the invariant
    pub fn from_parts(qty: i32, used_with_patient: i32, returned_to_cabinet: i32) -> DomainResult<Self> {
        if qty <= 0 {
            return Err(DomainError::validation("qty", "Quantity must be positive"));
        }
        if used_with_patient < 0 || returned_to_cabinet < 0 {
            return Err(DomainError::validation("qty", "Counters cannot be negative"));
        }
        let accounted = used_with_patient
            .checked_add(returned_to_cabinet)
            .filter(|total| *total <= qty);
        if accounted.is_none() {
            return Err(DomainError::invalid_state(
                "used and returned quantities exceed dispensed quantity",
            ));
        }
        Ok(Self {
            qty,
            used_with_patient,
            returned_to_cabinet,
        })
    }

    pub fn qty(&self) -> i32 {
        self.qty
    }

    pub fn used_with_patient(&self) -> i32 {
        self.used_with_patient
    }

    pub fn returned_to_cabinet(&self) -> i32 {
        self.returned_to_cabinet
    }

    /// Dispensed amount not yet consumed or returned
    pub fn pending(&self) -> i32 {
        self.qty - self.used_with_patient - self.returned_to_cabinet
    }

    /// Account for `amount` units consumed with the patient
    pub fn record_used(&mut self, amount: i32) -> DomainResult<()> {
        self.check_increment(amount)?;
        self.used_with_patient += amount;
        Ok(())
    }

    /// Account for `amount` units returned unused to the cabinet
    pub fn record_returned(&mut self, amount: i32) -> DomainResult<()> {
        self.check_increment(amount)?;
        self.returned_to_cabinet += amount;
        Ok(())
    }

    fn check_increment(&self, amount: i32) -> DomainResult<()> {
        if amount <= 0 {
            return Err(DomainError::validation("qty", "Quantity must be positive"));
        }
        let pending = self.pending();
        if amount > pending {
            return Err(DomainError::QuantityExceeded {
                requested: amount,
                pending,
            });
        }
        Ok(())
    }
}

/// One supply line dispensed within a patient encounter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyUsageItem {
    pub id: Uuid,
    /// Bill/usage this line belongs to
    pub usage_id: Uuid,
    pub encounter: Encounter,
    pub item_code: String,
    pub item_description: Option<String>,
    /// Reference into the source order system
    pub requested_accession: Option<String>,
    pub qty: i32,
    pub qty_used_with_patient: i32,
    pub qty_returned_to_cabinet: i32,
    /// Computed on read, never stored
    pub qty_pending: i32,
    pub status: SupplyStatus,
    /// Business day the line is reported under
    pub print_date: NaiveDate,
    pub discontinued_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupplyUsageItem {
    pub fn quantities(&self) -> DomainResult<SupplyQuantities> {
        SupplyQuantities::from_parts(self.qty, self.qty_used_with_patient, self.qty_returned_to_cabinet)
    }
}

/// A supply line to be created
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewSupplyLine {
    pub item_code: String,
    pub item_description: Option<String>,
    pub requested_accession: Option<String>,
    pub qty: i32,
}

impl NewSupplyLine {
    pub fn validate(&self) -> DomainResult<()> {
        crate::validation::validate_not_blank("item_code", &self.item_code)?;
        crate::validation::validate_positive_quantity("qty", self.qty)?;
        Ok(())
    }
}

/// Filters for listing supply lines
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupplyItemFilter {
    pub usage_id: Option<Uuid>,
    pub patient_id: Option<String>,
    pub status: Option<SupplyStatus>,
    pub print_date: Option<NaiveDate>,
}
