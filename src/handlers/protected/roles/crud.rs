// handlers/protected/roles/crud.rs - Single-role handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::rbac::{NewRole, RolePatch};
use crate::routes::AppState;
use crate::services::RoleInfo;

use super::{ensure_manageable, ensure_visible};

/// POST /api/v1/roles - tenant callers create roles in their own tenant
pub async fn role_create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<NewRole>, JsonRejection>,
) -> ApiResult<RoleInfo> {
    let Json(mut req) = payload?;

    if let Some(own) = user.tenant_scope() {
        let requested = req.tenant_id.trim();
        if !requested.is_empty() && requested != own {
            return Err(ApiError::forbidden("cannot create roles for another tenant"));
        }
        req.tenant_id = own.to_string();
    }

    let role = state.roles.create(req).await?;
    Ok(ApiResponse::created(role))
}

/// GET /api/v1/roles/:id
pub async fn role_show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<RoleInfo> {
    let info = state.roles.get(&id).await?;
    ensure_visible(&user, &info.role)?;
    Ok(ApiResponse::success(info))
}

/// PUT /api/v1/roles/:id - `menu_ids` in the body replace the grant set
pub async fn role_update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<RolePatch>, JsonRejection>,
) -> ApiResult<RoleInfo> {
    let Json(patch) = payload?;
    let existing = state.roles.get(&id).await?;
    ensure_manageable(&user, &existing.role)?;

    let info = state.roles.update(&id, patch).await?;
    Ok(ApiResponse::success(info))
}

/// DELETE /api/v1/roles/:id - detaches grants and user assignments
pub async fn role_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let existing = state.roles.get(&id).await?;
    ensure_manageable(&user, &existing.role)?;

    state.roles.delete(&id).await?;
    Ok(ApiResponse::<()>::no_content())
}
