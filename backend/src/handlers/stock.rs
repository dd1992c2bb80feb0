//! HTTP handlers for batch stock movements

use axum::{extract::State, Json};
use serde::Deserialize;
use shared::ApiResponse;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::batch::MovementReport;
use crate::services::BatchService;
use crate::AppState;

/// Rows to move in one request
#[derive(Debug, Deserialize)]
pub struct MoveRowsInput {
    pub row_ids: Vec<i64>,
}

/// Put dispensed rows back into their cabinet
pub async fn return_items_to_cabinet(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<MoveRowsInput>,
) -> AppResult<Json<ApiResponse<MovementReport>>> {
    let service = BatchService::new(state.db);
    let report = service
        .return_items_to_cabinet(input.row_ids, current_user.0.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// Dispense rows out of their cabinet
pub async fn dispense_items_from_cabinet(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<MoveRowsInput>,
) -> AppResult<Json<ApiResponse<MovementReport>>> {
    let service = BatchService::new(state.db);
    let report = service
        .dispense_items_from_cabinet(input.row_ids, current_user.0.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}
