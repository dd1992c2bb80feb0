//! Error handling for the Medical Supply Inventory backend
//!
//! Every error is rendered as the shared `ApiResponse` envelope: rule
//! violations carry a `message`, infrastructure failures an opaque `error`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::{ApiResponse, DomainError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Business rule errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),
}

/// Postgres SQLSTATE for unique violations
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or_default().to_string();
                return AppError::Conflict(conflict_message(&constraint));
            }
        }
        AppError::DatabaseError(err)
    }
}

fn conflict_message(constraint: &str) -> String {
    match constraint {
        "cabinet_department_mappings_cabinet_id_key" => "cabinet already used".to_string(),
        "cabinets_stock_id_key" => "stock id already assigned to another cabinet".to_string(),
        "cabinets_code_key" => "cabinet code already exists".to_string(),
        _ => "record was modified concurrently; reload and retry".to_string(),
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Domain(err) => match err {
                DomainError::Validation { .. } => StatusCode::BAD_REQUEST,
                DomainError::NotFound(_) => StatusCode::NOT_FOUND,
                DomainError::CabinetAlreadyUsed | DomainError::CabinetInUse => StatusCode::CONFLICT,
                DomainError::QuantityExceeded { .. } | DomainError::InvalidState(_) => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
            },
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Render into the response envelope
    pub fn to_envelope(&self) -> ApiResponse<()> {
        match self {
            AppError::Domain(err) => ApiResponse::rejected(err.code(), err.to_string()),
            AppError::Conflict(msg) => ApiResponse::rejected("CONFLICT", msg.clone()),
            AppError::DatabaseError(_) => {
                ApiResponse::failed("DATABASE_ERROR", "A database error occurred")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Rejected: {}", self);
        }

        (status, Json(self.to_envelope())).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
