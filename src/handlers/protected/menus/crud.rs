// handlers/protected/menus/crud.rs - Single-menu handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::middleware::{ApiResponse, ApiResult};
use crate::rbac::{MenuNode, MenuPatch, NewMenu};
use crate::routes::AppState;

/// POST /api/v1/menus
pub async fn menu_create(
    State(state): State<AppState>,
    payload: Result<Json<NewMenu>, JsonRejection>,
) -> ApiResult<MenuNode> {
    let Json(req) = payload?;
    let menu = state.menus.create(req).await?;
    Ok(ApiResponse::created(menu))
}

/// GET /api/v1/menus/:id
pub async fn menu_show(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<MenuNode> {
    let menu = state.menus.get(&id).await?;
    Ok(ApiResponse::success(menu))
}

/// PUT /api/v1/menus/:id
pub async fn menu_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<MenuPatch>, JsonRejection>,
) -> ApiResult<MenuNode> {
    let Json(patch) = payload?;
    let menu = state.menus.update(&id, patch).await?;
    Ok(ApiResponse::success(menu))
}

/// DELETE /api/v1/menus/:id - refused while the node still has children
pub async fn menu_delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.menus.delete(&id).await?;
    Ok(ApiResponse::<()>::no_content())
}
