//! HTTP handlers for bill corrections

use axum::{
    extract::{Path, State},
    Json,
};
use shared::{ApiResponse, CancelBillOutcome, CancelBillRequest};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ReconcilerService;
use crate::AppState;

/// Cancel lines of a bill, optionally rebilling replacements
pub async fn cancel_bill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(usage_id): Path<Uuid>,
    Json(request): Json<CancelBillRequest>,
) -> AppResult<Json<ApiResponse<CancelBillOutcome>>> {
    tracing::info!(
        usage_id = %usage_id,
        user = current_user.0.name.as_deref().unwrap_or("unknown"),
        "Bill cancellation requested"
    );

    let service = ReconcilerService::new(state.db);
    let outcome = service
        .handle_cancel_bill(usage_id, current_user.0.user_id, request)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}
