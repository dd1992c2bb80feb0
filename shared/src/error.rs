//! Domain rule violations

use thiserror::Error;

/// Result type for domain rule checks
pub type DomainResult<T> = Result<T, DomainError>;

/// A request that breaks a domain rule.
///
/// These are always reported back to the caller as a structured failure and
/// are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("cabinet already used")]
    CabinetAlreadyUsed,

    #[error("cabinet is still assigned to a department")]
    CabinetInUse,

    #[error("quantity {requested} exceeds pending quantity {pending}")]
    QuantityExceeded { requested: i32, pending: i32 },

    #[error("{0}")]
    InvalidState(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: impl Into<String>) -> Self {
        Self::NotFound(entity.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// Stable machine-readable code used in API responses
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation { .. } => "VALIDATION_ERROR",
            DomainError::NotFound(_) => "NOT_FOUND",
            DomainError::CabinetAlreadyUsed => "CABINET_ALREADY_USED",
            DomainError::CabinetInUse => "CABINET_IN_USE",
            DomainError::QuantityExceeded { .. } => "QUANTITY_EXCEEDED",
            DomainError::InvalidState(_) => "INVALID_STATE",
        }
    }
}
