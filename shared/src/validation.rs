//! Validation utilities for the Medical Supply Inventory platform

use crate::error::{DomainError, DomainResult};

/// Longest free-text note accepted on mappings and returns
pub const MAX_NOTE_LENGTH: usize = 500;

/// Most rows accepted in one batch request
pub const MAX_BATCH_ROWS: usize = 500;

/// Validate that a quantity is strictly positive
pub fn validate_positive_quantity(field: &str, qty: i32) -> DomainResult<()> {
    if qty <= 0 {
        return Err(DomainError::validation(field, "Quantity must be positive"));
    }
    Ok(())
}

/// Validate that a required text field is not blank
pub fn validate_not_blank(field: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, format!("{} is required", field)));
    }
    Ok(())
}

/// Validate an optional free-text note
pub fn validate_note(note: Option<&str>) -> DomainResult<()> {
    match note {
        Some(text) if text.chars().count() > MAX_NOTE_LENGTH => Err(DomainError::validation(
            "note",
            format!("Note cannot exceed {} characters", MAX_NOTE_LENGTH),
        )),
        _ => Ok(()),
    }
}

/// Validate the size of a batch request
pub fn validate_batch_size(field: &str, len: usize) -> DomainResult<()> {
    if len == 0 {
        return Err(DomainError::validation(field, "At least one row is required"));
    }
    if len > MAX_BATCH_ROWS {
        return Err(DomainError::validation(
            field,
            format!("At most {} rows can be processed at once", MAX_BATCH_ROWS),
        ));
    }
    Ok(())
}

/// Trim an optional text value, mapping blanks to `None`
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Escape `\\`, `%` and `_` so a value matches literally under LIKE/ILIKE
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `%keyword%` ILIKE pattern with wildcards escaped; `None` for a blank keyword
pub fn contains_pattern(keyword: Option<&str>) -> Option<String> {
    keyword
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(|k| format!("%{}%", escape_like(k)))
}
