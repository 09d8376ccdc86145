// handlers/protected/roles/permissions.rs - Role grants and holders

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::handlers::protected::RemovedResponse;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::rbac::MenuTreeNode;
use crate::routes::AppState;
use crate::services::RoleInfo;

use super::{ensure_manageable, ensure_visible};

#[derive(Debug, Deserialize)]
pub struct MenuIdsRequest {
    #[serde(default)]
    pub menu_ids: Vec<String>,
}

/// PUT /api/v1/roles/:id/permissions - replaces the whole grant set
pub async fn role_permissions_set(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<MenuIdsRequest>, JsonRejection>,
) -> ApiResult<RoleInfo> {
    let Json(req) = payload?;
    let existing = state.roles.get(&id).await?;
    ensure_manageable(&user, &existing.role)?;

    let info = state.roles.set_permissions(&id, &req.menu_ids).await?;
    Ok(ApiResponse::success(info))
}

/// DELETE /api/v1/roles/:id/permissions - revokes only the listed menus
pub async fn role_permissions_remove(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<MenuIdsRequest>, JsonRejection>,
) -> ApiResult<RemovedResponse> {
    let Json(req) = payload?;
    let existing = state.roles.get(&id).await?;
    ensure_manageable(&user, &existing.role)?;

    let removed = state.roles.remove_permissions(&id, &req.menu_ids).await?;
    Ok(ApiResponse::success(RemovedResponse { removed }))
}

/// GET /api/v1/roles/:id/menus - admin tree of everything the role grants
pub async fn role_menus(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Vec<MenuTreeNode>> {
    let existing = state.roles.get(&id).await?;
    ensure_visible(&user, &existing.role)?;

    let tree = state.access.granted_tree_for_roles(&[id]).await?;
    Ok(ApiResponse::success(tree))
}

/// GET /api/v1/roles/:id/users
pub async fn role_users(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Vec<String>> {
    let existing = state.roles.get(&id).await?;
    ensure_visible(&user, &existing.role)?;

    let users = state.roles.users(&id).await?;
    Ok(ApiResponse::success(users))
}
