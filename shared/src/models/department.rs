//! Department master data (read-only)

use serde::{Deserialize, Serialize};

/// A hospital department
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Department {
    pub id: i64,
    pub name: String,
    /// Short reference code used when generating cabinet codes (e.g. "icu")
    pub ref_code: Option<String>,
}

impl Department {
    /// Uppercased reference code, or `None` when missing or blank
    pub fn code_segment(&self) -> Option<String> {
        self.ref_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_uppercase)
    }
}
