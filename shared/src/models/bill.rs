//! Bill cancellation and rebilling across print dates

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::supply::{NewSupplyLine, SupplyStatus, SupplyUsageItem};
use crate::error::{DomainError, DomainResult};

/// Request to cancel lines of a bill and optionally rebill replacements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelBillRequest {
    pub supply_item_ids: Vec<Uuid>,
    pub old_print_date: NaiveDate,
    pub new_print_date: NaiveDate,
    #[serde(default)]
    pub new_items: Option<Vec<NewSupplyLine>>,
}

/// Validated cancellation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelBillPlan {
    pub discontinue: Vec<Uuid>,
    pub replacements: Vec<NewSupplyLine>,
    pub old_print_date: NaiveDate,
    pub new_print_date: NaiveDate,
}

impl CancelBillPlan {
    /// Check the request shape before anything is loaded.
    ///
    /// A same-day cancel must carry replacements; a cross-day cancel need not.
    pub fn from_request(request: CancelBillRequest) -> DomainResult<Self> {
        let mut discontinue = request.supply_item_ids;
        if discontinue.is_empty() {
            return Err(DomainError::validation(
                "supply_item_ids",
                "At least one supply item must be cancelled",
            ));
        }
        discontinue.sort();
        discontinue.dedup();

        let replacements = request.new_items.unwrap_or_default();
        if request.old_print_date == request.new_print_date && replacements.is_empty() {
            return Err(DomainError::validation(
                "new_items",
                "A same-day cancellation requires replacement items",
            ));
        }
        for line in &replacements {
            line.validate()?;
        }

        Ok(Self {
            discontinue,
            replacements,
            old_print_date: request.old_print_date,
            new_print_date: request.new_print_date,
        })
    }

    pub fn is_same_day(&self) -> bool {
        self.old_print_date == self.new_print_date
    }

    /// Check the locked lines against the request before discontinuing them
    pub fn check_lines(&self, usage_id: Uuid, lines: &[SupplyUsageItem]) -> DomainResult<()> {
        for id in &self.discontinue {
            let line = lines
                .iter()
                .find(|line| line.id == *id)
                .ok_or_else(|| DomainError::not_found(format!("Supply item {}", id)))?;
            if line.usage_id != usage_id {
                return Err(DomainError::validation(
                    "supply_item_ids",
                    format!("Supply item {} does not belong to usage {}", id, usage_id),
                ));
            }
            if line.status != SupplyStatus::Verified {
                return Err(DomainError::invalid_state(format!(
                    "Supply item {} is already discontinued",
                    id
                )));
            }
            if line.print_date != self.old_print_date {
                return Err(DomainError::validation(
                    "old_print_date",
                    format!(
                        "Supply item {} is printed on {}, not {}",
                        id, line.print_date, self.old_print_date
                    ),
                ));
            }
        }
        Ok(())
    }
}

/// Result of a cancellation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelBillOutcome {
    pub usage_id: Uuid,
    pub same_day: bool,
    pub discontinued: Vec<SupplyUsageItem>,
    pub replacements: Vec<SupplyUsageItem>,
}
