use async_trait::async_trait;

use super::error::RbacResult;
use super::types::{
    Grant, GrantType, MenuFilter, MenuNode, MenuStats, Page, Role, RoleFilter, RoleStats, Status,
};

/// Persistence for menu nodes. Uniqueness of `(parent_id, name)` and of
/// non-empty `permission_code` is backed by the storage layer as well.
#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn insert(&self, menu: MenuNode) -> RbacResult<MenuNode>;

    async fn get(&self, id: &str) -> RbacResult<Option<MenuNode>>;

    /// Overwrites every mutable column of an existing node
    async fn update(&self, menu: &MenuNode) -> RbacResult<()>;

    /// Returns false when no row matched
    async fn delete(&self, id: &str) -> RbacResult<bool>;

    /// Sorted by (parent_id, sort_order, creation order)
    async fn list(&self, filter: &MenuFilter) -> RbacResult<Vec<MenuNode>>;

    /// Sorted by (sort_order, creation order)
    async fn get_children(&self, parent_id: &str) -> RbacResult<Vec<MenuNode>>;

    async fn get_by_ids(&self, ids: &[String]) -> RbacResult<Vec<MenuNode>>;

    /// Returns the number of rows modified
    async fn batch_set_status(&self, ids: &[String], status: Status) -> RbacResult<u64>;

    async fn stats(&self) -> RbacResult<MenuStats>;

    async fn name_exists(
        &self,
        name: &str,
        parent_id: &str,
        exclude_id: Option<&str>,
    ) -> RbacResult<bool>;

    async fn permission_code_exists(&self, code: &str, exclude_id: Option<&str>)
        -> RbacResult<bool>;

    async fn has_children(&self, id: &str) -> RbacResult<bool>;
}

/// Persistence for role records. Grants live in the [`AssignmentIndex`].
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn insert(&self, role: Role) -> RbacResult<Role>;

    async fn get(&self, id: &str) -> RbacResult<Option<Role>>;

    async fn get_by_key(&self, key: &str) -> RbacResult<Option<Role>>;

    async fn get_by_ids(&self, ids: &[String]) -> RbacResult<Vec<Role>>;

    async fn update(&self, role: &Role) -> RbacResult<()>;

    async fn delete(&self, id: &str) -> RbacResult<bool>;

    /// Sorted by (sort_order asc, created_at desc), with the unpaged total
    async fn list(&self, filter: &RoleFilter, page: Page) -> RbacResult<(Vec<Role>, i64)>;

    /// Enabled roles owned by the tenant plus enabled platform roles
    async fn get_by_tenant(&self, tenant_id: &str) -> RbacResult<Vec<Role>>;

    async fn batch_set_status(&self, ids: &[String], status: Status) -> RbacResult<u64>;

    /// Breakdown by platform/tenant only when `tenant_id` is `None`
    async fn stats(&self, tenant_id: Option<&str>) -> RbacResult<RoleStats>;

    async fn key_exists(&self, key: &str, exclude_id: Option<&str>) -> RbacResult<bool>;

    async fn name_exists(
        &self,
        name: &str,
        tenant_id: &str,
        exclude_id: Option<&str>,
    ) -> RbacResult<bool>;
}

/// The user↔role and role↔permission relations
#[async_trait]
pub trait AssignmentIndex: Send + Sync {
    /// Replaces the user's entire role set
    async fn assign_roles_to_user(&self, user_id: &str, role_ids: &[String]) -> RbacResult<()>;

    async fn remove_roles_from_user(&self, user_id: &str, role_ids: &[String]) -> RbacResult<u64>;

    /// Drops every user assignment of the role
    async fn remove_role_from_all_users(&self, role_id: &str) -> RbacResult<u64>;

    /// Replaces the role's entire grant set
    async fn assign_permissions_to_role(&self, role_id: &str, grants: &[Grant]) -> RbacResult<()>;

    async fn remove_permissions_from_role(
        &self,
        role_id: &str,
        menu_ids: &[String],
    ) -> RbacResult<u64>;

    /// Rewrites the grant type on every grant of `menu_id`
    async fn retype_permission(&self, menu_id: &str, permission_type: GrantType) -> RbacResult<u64>;

    async fn get_roles_for_user(&self, user_id: &str) -> RbacResult<Vec<String>>;

    async fn get_users_for_role(&self, role_id: &str) -> RbacResult<Vec<String>>;

    /// Menu ids in assignment order
    async fn get_permissions_for_role(&self, role_id: &str) -> RbacResult<Vec<String>>;

    async fn get_roles_for_permission(&self, menu_id: &str) -> RbacResult<Vec<String>>;

    /// De-duplicated union of menu ids granted to the enabled roles among `role_ids`
    async fn get_permissions_for_roles(&self, role_ids: &[String]) -> RbacResult<Vec<String>>;

    /// De-duplicated union of menu ids granted through the user's enabled roles
    async fn get_effective_permissions_for_user(&self, user_id: &str) -> RbacResult<Vec<String>>;

    /// Whether an enabled menu carrying `permission_code` is granted through
    /// one of the user's enabled roles
    async fn has_permission(&self, user_id: &str, permission_code: &str) -> RbacResult<bool>;
}
