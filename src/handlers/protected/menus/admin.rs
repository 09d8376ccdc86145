// handlers/protected/menus/admin.rs - Catalogue-wide menu operations

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::handlers::protected::{BatchStatusRequest, BatchStatusResponse};
use crate::middleware::{ApiResponse, ApiResult};
use crate::rbac::MenuStats;
use crate::routes::AppState;

/// GET /api/v1/menus/stats
pub async fn menu_stats(State(state): State<AppState>) -> ApiResult<MenuStats> {
    let stats = state.menus.stats().await?;
    Ok(ApiResponse::success(stats))
}

/// PUT /api/v1/menus/batch-status
pub async fn menu_batch_status(
    State(state): State<AppState>,
    payload: Result<Json<BatchStatusRequest>, JsonRejection>,
) -> ApiResult<BatchStatusResponse> {
    let Json(req) = payload?;
    let modified = state.menus.batch_set_status(&req.ids, req.status).await?;
    Ok(ApiResponse::success(BatchStatusResponse { modified }))
}
