// handlers/protected/users/permissions.rs - Effective permission queries

use axum::extract::{rejection::QueryRejection, Path, Query, State};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::routes::AppState;
use crate::services::UserPermissions;

#[derive(Debug, Deserialize)]
pub struct CheckQuery {
    #[serde(default, alias = "permission_code")]
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct PermissionCheck {
    pub user_id: String,
    pub permission_code: String,
    pub has_permission: bool,
}

/// GET /api/v1/users/:id/permissions
pub async fn user_permissions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<UserPermissions> {
    let permissions = state.access.user_permissions(&user_id).await?;
    Ok(ApiResponse::success(permissions))
}

/// GET /api/v1/users/:id/permissions/check?code=...
pub async fn user_permission_check(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    query: Result<Query<CheckQuery>, QueryRejection>,
) -> ApiResult<PermissionCheck> {
    let Query(query) = query?;
    let code = query.code.trim();
    if code.is_empty() {
        return Err(ApiError::bad_request("query parameter 'code' is required"));
    }

    let has_permission = state.access.has_permission(&user_id, code).await?;
    Ok(ApiResponse::success(PermissionCheck {
        user_id,
        permission_code: code.to_string(),
        has_permission,
    }))
}
