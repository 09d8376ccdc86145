// handlers/protected/roles/mod.rs - Role management handlers
//
// Tenant callers see their own roles plus platform roles, may only create or
// change roles of their own tenant, and get tenant-scoped statistics.

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::rbac::Role;

pub mod crud;        // POST /roles, GET|PUT|DELETE /roles/:id
pub mod list;        // GET /roles, GET /roles/tenant/:tenant_id, GET /roles/stats
pub mod batch;       // PUT /roles/batch-status
pub mod permissions; // PUT|DELETE /roles/:id/permissions, GET /roles/:id/menus, GET /roles/:id/users

pub use batch::role_batch_status;
pub use crud::{role_create, role_delete, role_show, role_update};
pub use list::{role_by_tenant, role_list, role_stats};
pub use permissions::{role_menus, role_permissions_remove, role_permissions_set, role_users};

/// Roles of other tenants are reported as missing rather than forbidden
fn ensure_visible(user: &AuthUser, role: &Role) -> Result<(), ApiError> {
    if user.can_access_tenant(&role.tenant_id) {
        Ok(())
    } else {
        Err(ApiError::not_found(format!("role not found: {}", role.id)))
    }
}

fn ensure_manageable(user: &AuthUser, role: &Role) -> Result<(), ApiError> {
    ensure_visible(user, role)?;
    if user.can_manage_tenant(&role.tenant_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("platform roles are read-only for tenant users"))
    }
}
