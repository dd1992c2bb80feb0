//! HTTP handlers for cabinet-department mapping endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{ApiResponse, CabinetDepartmentMapping, MappingFilter, MappingOverview};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::assignment::{CreateMappingInput, UpdateMappingInput};
use crate::services::AssignmentService;
use crate::AppState;

/// Assign a cabinet to a department
pub async fn create_mapping(
    State(state): State<AppState>,
    Json(input): Json<CreateMappingInput>,
) -> AppResult<Json<ApiResponse<CabinetDepartmentMapping>>> {
    let service = AssignmentService::new(state.db);
    let mapping = service.create_mapping(input).await?;
    Ok(Json(ApiResponse::ok(mapping)))
}

/// List mappings with stock counts
pub async fn list_mappings(
    State(state): State<AppState>,
    Query(filter): Query<MappingFilter>,
) -> AppResult<Json<ApiResponse<Vec<MappingOverview>>>> {
    let service = AssignmentService::new(state.db);
    let mappings = service.list_mappings(filter).await?;
    Ok(Json(ApiResponse::ok(mappings)))
}

/// Get a mapping by ID
pub async fn get_mapping(
    State(state): State<AppState>,
    Path(mapping_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MappingOverview>>> {
    let service = AssignmentService::new(state.db);
    let mapping = service.get_mapping(mapping_id).await?;
    Ok(Json(ApiResponse::ok(mapping)))
}

/// Update a mapping
pub async fn update_mapping(
    State(state): State<AppState>,
    Path(mapping_id): Path<Uuid>,
    Json(input): Json<UpdateMappingInput>,
) -> AppResult<Json<ApiResponse<CabinetDepartmentMapping>>> {
    let service = AssignmentService::new(state.db);
    let mapping = service.update_mapping(mapping_id, input).await?;
    Ok(Json(ApiResponse::ok(mapping)))
}

/// Delete a mapping
pub async fn delete_mapping(
    State(state): State<AppState>,
    Path(mapping_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let service = AssignmentService::new(state.db);
    service.delete_mapping(mapping_id).await?;
    Ok(Json(ApiResponse::ok(())))
}
