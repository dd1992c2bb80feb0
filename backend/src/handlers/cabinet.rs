//! HTTP handlers for cabinet registry endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{ApiResponse, Cabinet};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::cabinet::{CabinetFilter, CreateCabinetInput};
use crate::services::CabinetService;
use crate::AppState;

fn service(state: &AppState) -> CabinetService {
    CabinetService::new(state.db.clone(), state.config.cabinet.clone())
}

/// Create a cabinet
pub async fn create_cabinet(
    State(state): State<AppState>,
    Json(input): Json<CreateCabinetInput>,
) -> AppResult<Json<ApiResponse<Cabinet>>> {
    let cabinet = service(&state).create_cabinet(input).await?;
    Ok(Json(ApiResponse::ok(cabinet)))
}

/// List cabinets
pub async fn list_cabinets(
    State(state): State<AppState>,
    Query(filter): Query<CabinetFilter>,
) -> AppResult<Json<ApiResponse<Vec<Cabinet>>>> {
    let cabinets = service(&state).list_cabinets(filter).await?;
    Ok(Json(ApiResponse::ok(cabinets)))
}

/// Get a cabinet by ID
pub async fn get_cabinet(
    State(state): State<AppState>,
    Path(cabinet_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Cabinet>>> {
    let cabinet = service(&state).get_cabinet(cabinet_id).await?;
    Ok(Json(ApiResponse::ok(cabinet)))
}

/// Retire a cabinet
pub async fn retire_cabinet(
    State(state): State<AppState>,
    Path(cabinet_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Cabinet>>> {
    let cabinet = service(&state).retire_cabinet(cabinet_id).await?;
    Ok(Json(ApiResponse::ok(cabinet)))
}
