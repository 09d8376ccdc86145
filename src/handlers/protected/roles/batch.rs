// handlers/protected/roles/batch.rs - PUT /api/v1/roles/batch-status handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};

use crate::handlers::protected::{BatchStatusRequest, BatchStatusResponse};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::routes::AppState;

use super::ensure_manageable;

pub async fn role_batch_status(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<BatchStatusRequest>, JsonRejection>,
) -> ApiResult<BatchStatusResponse> {
    let Json(req) = payload?;

    if !user.is_platform() {
        for role in state.roles.get_by_ids(&req.ids).await? {
            ensure_manageable(&user, &role)?;
        }
    }

    let modified = state.roles.batch_set_status(&req.ids, req.status).await?;
    Ok(ApiResponse::success(BatchStatusResponse { modified }))
}
