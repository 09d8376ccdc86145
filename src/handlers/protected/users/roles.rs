// handlers/protected/users/roles.rs - A user's role set

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::protected::RemovedResponse;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::rbac::Role;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct RoleIdsRequest {
    #[serde(default)]
    pub role_ids: Vec<String>,
}

/// GET /api/v1/users/:id/roles - tenant callers only see roles visible to them
pub async fn user_roles_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<Role>> {
    let roles = state
        .access
        .roles_for_user(&user_id)
        .await?
        .into_iter()
        .filter(|role| user.can_access_tenant(&role.tenant_id))
        .collect();
    Ok(ApiResponse::success(roles))
}

/// PUT /api/v1/users/:id/roles - replaces the user's whole role set.
///
/// A tenant caller replaces only the part of the set it can see; roles of
/// other tenants already held by the user are carried over untouched.
pub async fn user_roles_put(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    payload: Result<Json<RoleIdsRequest>, JsonRejection>,
) -> ApiResult<Vec<Role>> {
    let Json(req) = payload?;

    if user.is_platform() {
        let roles = state.access.assign_roles(&user_id, &req.role_ids).await?;
        return Ok(ApiResponse::success(roles));
    }

    ensure_assignable(&state, &user, &req.role_ids).await?;
    let mut role_ids = req.role_ids;
    role_ids.extend(
        state
            .access
            .roles_for_user(&user_id)
            .await?
            .into_iter()
            .filter(|role| !user.can_access_tenant(&role.tenant_id))
            .map(|role| role.id),
    );

    let roles = state
        .access
        .assign_roles(&user_id, &role_ids)
        .await?
        .into_iter()
        .filter(|role| user.can_access_tenant(&role.tenant_id))
        .collect();
    Ok(ApiResponse::success(roles))
}

/// DELETE /api/v1/users/:id/roles - removes only the listed roles
pub async fn user_roles_delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(user_id): Path<String>,
    payload: Result<Json<RoleIdsRequest>, JsonRejection>,
) -> ApiResult<RemovedResponse> {
    let Json(req) = payload?;
    if !user.is_platform() {
        ensure_assignable(&state, &user, &req.role_ids).await?;
    }
    let removed = state.access.remove_roles(&user_id, &req.role_ids).await?;
    Ok(ApiResponse::success(RemovedResponse { removed }))
}

/// Tenant callers may only hand out or take back roles they can see
async fn ensure_assignable(
    state: &AppState,
    user: &AuthUser,
    role_ids: &[String],
) -> Result<(), ApiError> {
    let requested = state.roles.get_by_ids(role_ids).await?;
    match requested.iter().find(|r| !user.can_access_tenant(&r.tenant_id)) {
        Some(role) => Err(ApiError::forbidden(format!(
            "role {} belongs to another tenant",
            role.id
        ))),
        None => Ok(()),
    }
}
