//! Storage cabinet models

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// A physical storage cabinet holding dispensable stock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cabinet {
    pub id: Uuid,
    /// Human code (e.g., "HOSP-ICU-0007")
    pub code: String,
    pub name: Option<String>,
    pub cabinet_type: Option<String>,
    /// Legacy stock identifier used to join physical stock rows
    pub stock_id: i64,
    pub status: CabinetStatus,
    pub retired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Availability of a cabinet, always derived from its mappings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CabinetStatus {
    Available,
    Used,
}

impl CabinetStatus {
    /// The only rule that decides a cabinet's status: any mapping means USED.
    pub fn derive(mapping_count: i64) -> Self {
        if mapping_count > 0 {
            CabinetStatus::Used
        } else {
            CabinetStatus::Available
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CabinetStatus::Available => "available",
            CabinetStatus::Used => "used",
        }
    }

    pub fn parse(value: &str) -> DomainResult<Self> {
        match value {
            "available" => Ok(CabinetStatus::Available),
            "used" => Ok(CabinetStatus::Used),
            other => Err(DomainError::validation(
                "status",
                format!("Unknown cabinet status '{}'", other),
            )),
        }
    }
}

impl std::fmt::Display for CabinetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CabinetStatus::Available => write!(f, "Available"),
            CabinetStatus::Used => write!(f, "Used"),
        }
    }
}

/// Highest legacy stock id a cabinet may carry
pub const MAX_STOCK_ID: i64 = 999_999_999;

/// Explicit stock ids must lie in `1..=MAX_STOCK_ID`
pub fn validate_stock_id(stock_id: i64) -> DomainResult<()> {
    if !(1..=MAX_STOCK_ID).contains(&stock_id) {
        return Err(DomainError::validation(
            "stock_id",
            format!("Stock id must be between 1 and {}", MAX_STOCK_ID),
        ));
    }
    Ok(())
}

/// Next legacy stock id after the current maximum
pub fn next_stock_sequence(current_max: Option<i64>) -> DomainResult<i64> {
    current_max
        .unwrap_or(0)
        .checked_add(1)
        .filter(|next| *next <= MAX_STOCK_ID)
        .ok_or_else(|| DomainError::validation("stock_id", "Stock id sequence is exhausted"))
}

/// First sequence from `start` whose generated code is not already taken.
///
/// Explicit codes may occupy codes the generator would produce; those
/// sequences are skipped.
pub fn next_free_cabinet_code(
    hospital_prefix: &str,
    department_segment: Option<&str>,
    start: i64,
    width: usize,
    taken: &HashSet<String>,
) -> DomainResult<(i64, String)> {
    let mut sequence = start;
    loop {
        validate_stock_id(sequence)?;
        let code = generate_cabinet_code(hospital_prefix, department_segment, sequence, width);
        if !taken.contains(&code) {
            return Ok((sequence, code));
        }
        sequence = next_stock_sequence(Some(sequence))?;
    }
}

/// Generate a cabinet code: `{prefix}[-{DEPT}]-{sequence}`
pub fn generate_cabinet_code(
    hospital_prefix: &str,
    department_segment: Option<&str>,
    sequence: i64,
    width: usize,
) -> String {
    match department_segment {
        Some(dept) => format!("{}-{}-{:0width$}", hospital_prefix, dept, sequence, width = width),
        None => format!("{}-{:0width$}", hospital_prefix, sequence, width = width),
    }
}
