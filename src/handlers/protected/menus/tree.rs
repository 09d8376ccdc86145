// handlers/protected/menus/tree.rs - Tree-shaped menu views

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension,
};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::rbac::{MenuFilter, MenuTreeNode, UserMenuNode};
use crate::routes::AppState;
use crate::services::MenuList;

/// GET /api/v1/menus - filtered admin tree plus the flat match count
pub async fn menu_list(
    State(state): State<AppState>,
    filter: Result<Query<MenuFilter>, QueryRejection>,
) -> ApiResult<MenuList> {
    let Query(filter) = filter?;
    let list = state.menus.list(&filter).await?;
    Ok(ApiResponse::success(list))
}

/// GET /api/v1/menus/tree (also mounted at /api/v1/menu/tree)
pub async fn menu_tree(
    State(state): State<AppState>,
    filter: Result<Query<MenuFilter>, QueryRejection>,
) -> ApiResult<Vec<MenuTreeNode>> {
    let Query(filter) = filter?;
    let tree = state.menus.tree(&filter).await?;
    Ok(ApiResponse::success(tree))
}

/// GET /api/v1/menus/user - navigation tree for the calling user.
///
/// Role ids carried in the token take precedence. Tokens without roles fall
/// back to the user's stored assignments.
pub async fn menu_user(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Vec<UserMenuNode>> {
    let tree = if user.role_ids.is_empty() {
        state.access.navigation_for_user(&user.user_id).await?
    } else {
        state.access.navigation_for_roles(&user.role_ids).await?
    };
    Ok(ApiResponse::success(tree))
}
