//! Cabinet-to-department assignment models and rules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Binding of one cabinet to one department
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CabinetDepartmentMapping {
    pub id: Uuid,
    pub cabinet_id: Uuid,
    pub department_id: i64,
    pub status: MappingStatus,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status carried on the mapping itself.
///
/// It does not affect exclusivity: an inactive mapping still holds its cabinet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MappingStatus {
    #[default]
    Active,
    Inactive,
}

impl MappingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingStatus::Active => "active",
            MappingStatus::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> DomainResult<Self> {
        match value {
            "active" => Ok(MappingStatus::Active),
            "inactive" => Ok(MappingStatus::Inactive),
            other => Err(DomainError::validation(
                "status",
                format!("Unknown mapping status '{}'", other),
            )),
        }
    }
}

/// Mapping row enriched for listing, with stock counts for the cabinet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingOverview {
    #[serde(flatten)]
    pub mapping: CabinetDepartmentMapping,
    pub cabinet_code: String,
    pub cabinet_name: Option<String>,
    pub department_name: String,
    /// Physical units currently in the cabinet
    pub in_cabinet_count: i64,
    /// Physical units dispensed out of the cabinet
    pub dispensed_count: i64,
}

/// Filters for listing mappings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingFilter {
    pub cabinet_id: Option<Uuid>,
    pub department_id: Option<i64>,
    pub status: Option<MappingStatus>,
    pub keyword: Option<String>,
}

impl MappingFilter {
    /// `%keyword%` pattern for ILIKE matching, ignoring blank keywords
    pub fn keyword_pattern(&self) -> Option<String> {
        crate::validation::contains_pattern(self.keyword.as_deref())
    }
}

/// Reject a new binding when any mapping already holds the cabinet
pub fn ensure_cabinet_free(existing_mappings: i64) -> DomainResult<()> {
    if existing_mappings > 0 {
        return Err(DomainError::CabinetAlreadyUsed);
    }
    Ok(())
}

/// What an update to a mapping does to cabinets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingUpdatePlan {
    /// Department, status or note change only
    SameCabinet { cabinet_id: Uuid },
    /// Mapping moves from one cabinet to another
    Swap { from: Uuid, to: Uuid },
}

impl MappingUpdatePlan {
    /// Decide the update kind.
    ///
    /// `other_mappings_on_target` counts mappings other than this one that
    /// reference the target cabinet; it is ignored for same-cabinet updates.
    pub fn decide(
        current_cabinet: Uuid,
        target_cabinet: Uuid,
        other_mappings_on_target: i64,
    ) -> DomainResult<Self> {
        if current_cabinet == target_cabinet {
            return Ok(MappingUpdatePlan::SameCabinet {
                cabinet_id: current_cabinet,
            });
        }
        ensure_cabinet_free(other_mappings_on_target)?;
        Ok(MappingUpdatePlan::Swap {
            from: current_cabinet,
            to: target_cabinet,
        })
    }

    pub fn is_swap(&self) -> bool {
        matches!(self, MappingUpdatePlan::Swap { .. })
    }
}

/// Lock order for a pair of cabinets touched by one update
pub fn cabinet_lock_order(current: Uuid, target: Uuid) -> Vec<Uuid> {
    let mut ids = vec![current, target];
    ids.sort();
    ids.dedup();
    ids
}
