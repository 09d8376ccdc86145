// handlers/protected/roles/list.rs - Role listings and statistics

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Extension,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::rbac::{Page, Role, RoleFilter, RoleStats};
use crate::routes::AppState;
use crate::services::RoleList;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    #[serde(alias = "company_id")]
    pub tenant_id: Option<String>,
}

/// GET /api/v1/roles - paged, sorted by sort_order then newest first
pub async fn role_list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    filter: Result<Query<RoleFilter>, QueryRejection>,
    paging: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<RoleList> {
    let Query(mut filter) = filter?;
    let Query(paging) = paging?;

    filter.visible_to = user.tenant_scope().map(str::to_string);
    let page = Page::new(
        paging.page,
        paging.page_size,
        state.default_page_size,
        state.max_page_size,
    );

    let list = state.roles.list(&filter, page).await?;
    Ok(ApiResponse::success(list))
}

/// GET /api/v1/roles/tenant/:tenant_id - enabled roles assignable within a tenant
pub async fn role_by_tenant(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(tenant_id): Path<String>,
) -> ApiResult<Vec<Role>> {
    if !user.can_manage_tenant(&tenant_id) {
        return Err(ApiError::forbidden("cannot list roles of another tenant"));
    }
    let roles = state.roles.by_tenant(&tenant_id).await?;
    Ok(ApiResponse::success(roles))
}

/// GET /api/v1/roles/stats - tenant callers always get their own tenant's numbers
pub async fn role_stats(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    query: Result<Query<StatsQuery>, QueryRejection>,
) -> ApiResult<RoleStats> {
    let Query(query) = query?;
    let tenant_id = match user.tenant_scope() {
        Some(own) => Some(own.to_string()),
        None => query.tenant_id,
    };

    let stats = state.roles.stats(tenant_id.as_deref()).await?;
    Ok(ApiResponse::success(stats))
}
