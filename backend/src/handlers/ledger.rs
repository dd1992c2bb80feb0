//! HTTP handlers for supply ledger endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use shared::{ApiResponse, BatchReport, ReturnRecord, StockReturnRow, SupplyItemFilter, SupplyUsageItem};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ledger::{
    ItemReturnOutcome, RecordDispensedInput, RecordReturnInput, RecordUsedInput, ReturnFilter,
};
use crate::services::LedgerService;
use crate::AppState;

/// Record supply lines dispensed to an encounter
pub async fn record_dispensed_items(
    State(state): State<AppState>,
    Json(input): Json<RecordDispensedInput>,
) -> AppResult<Json<ApiResponse<Vec<SupplyUsageItem>>>> {
    let service = LedgerService::new(state.db);
    let items = service.record_dispensed_items(input).await?;
    Ok(Json(ApiResponse::ok(items)))
}

/// List supply lines
pub async fn list_supply_items(
    State(state): State<AppState>,
    Query(filter): Query<SupplyItemFilter>,
) -> AppResult<Json<ApiResponse<Vec<SupplyUsageItem>>>> {
    let service = LedgerService::new(state.db);
    let items = service.list_supply_items(filter).await?;
    Ok(Json(ApiResponse::ok(items)))
}

/// Get a supply line
pub async fn get_supply_item(
    State(state): State<AppState>,
    Path(supply_item_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<SupplyUsageItem>>> {
    let service = LedgerService::new(state.db);
    let item = service.get_supply_item(supply_item_id).await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// Record units used with the patient
pub async fn record_item_used(
    State(state): State<AppState>,
    Path(supply_item_id): Path<Uuid>,
    Json(input): Json<RecordUsedInput>,
) -> AppResult<Json<ApiResponse<SupplyUsageItem>>> {
    let service = LedgerService::new(state.db);
    let item = service
        .record_item_used_with_patient(supply_item_id, input.qty)
        .await?;
    Ok(Json(ApiResponse::ok(item)))
}

/// Return unused units of a line to the cabinet
pub async fn record_item_return(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supply_item_id): Path<Uuid>,
    Json(input): Json<RecordReturnInput>,
) -> AppResult<Json<ApiResponse<ItemReturnOutcome>>> {
    let service = LedgerService::new(state.db);
    let outcome = service
        .record_item_return(supply_item_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

/// Return physical units from a cabinet scan
pub async fn record_stock_returns(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(rows): Json<Vec<StockReturnRow>>,
) -> AppResult<Json<ApiResponse<BatchReport<i64, ReturnRecord>>>> {
    let service = LedgerService::new(state.db);
    let report = service
        .record_stock_returns(rows, current_user.0.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(report)))
}

/// List return records
pub async fn list_return_records(
    State(state): State<AppState>,
    Query(filter): Query<ReturnFilter>,
) -> AppResult<Json<ApiResponse<Vec<ReturnRecord>>>> {
    let service = LedgerService::new(state.db);
    let records = service.list_return_records(filter).await?;
    Ok(Json(ApiResponse::ok(records)))
}
