use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::rbac::tree::{build_tree, build_user_menu_tree, MenuTreeNode, UserMenuNode};
use crate::rbac::types::{dedup_ids, Role};
use crate::rbac::{AssignmentIndex, MenuStore, RbacError, RbacResult, RoleStore};

/// What a user may do, resolved through their enabled roles
#[derive(Debug, Clone, Serialize)]
pub struct UserPermissions {
    pub user_id: String,
    pub role_ids: Vec<String>,
    pub menu_ids: Vec<String>,
    /// Codes of the enabled granted menus, for client capability checks
    pub permission_codes: Vec<String>,
}

/// User↔role assignment and role→menu resolution
#[derive(Clone)]
pub struct AccessService {
    roles: Arc<dyn RoleStore>,
    menus: Arc<dyn MenuStore>,
    access: Arc<dyn AssignmentIndex>,
}

impl AccessService {
    pub fn new(
        roles: Arc<dyn RoleStore>,
        menus: Arc<dyn MenuStore>,
        access: Arc<dyn AssignmentIndex>,
    ) -> Self {
        Self { roles, menus, access }
    }

    /// Replaces the user's role set. Every id must name an existing role.
    pub async fn assign_roles(&self, user_id: &str, role_ids: &[String]) -> RbacResult<Vec<Role>> {
        let user_id = require_user(user_id)?;
        let roles = self.existing_roles(role_ids).await?;
        let ids: Vec<String> = roles.iter().map(|r| r.id.clone()).collect();

        self.access.assign_roles_to_user(user_id, &ids).await?;
        info!(user_id, roles = ids.len(), "User roles replaced");
        Ok(roles)
    }

    pub async fn remove_roles(&self, user_id: &str, role_ids: &[String]) -> RbacResult<u64> {
        let user_id = require_user(user_id)?;
        let ids = dedup_ids(role_ids);
        if ids.is_empty() {
            return Err(RbacError::invalid("role id list must not be empty"));
        }
        let removed = self.access.remove_roles_from_user(user_id, &ids).await?;
        info!(user_id, removed, "User roles removed");
        Ok(removed)
    }

    /// Assigned roles in assignment order, disabled ones included
    pub async fn roles_for_user(&self, user_id: &str) -> RbacResult<Vec<Role>> {
        let ids = self.access.get_roles_for_user(user_id).await?;
        let mut found: HashMap<String, Role> = self
            .roles
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|role| (role.id.clone(), role))
            .collect();
        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    /// Union of menu ids granted through the user's enabled roles
    pub async fn effective_permissions(&self, user_id: &str) -> RbacResult<Vec<String>> {
        self.access.get_effective_permissions_for_user(user_id).await
    }

    pub async fn user_permissions(&self, user_id: &str) -> RbacResult<UserPermissions> {
        let role_ids = self.access.get_roles_for_user(user_id).await?;
        let menu_ids = self.access.get_effective_permissions_for_user(user_id).await?;
        let permission_codes = self
            .menus
            .get_by_ids(&menu_ids)
            .await?
            .into_iter()
            .filter(|m| m.is_enabled() && !m.permission_code.is_empty())
            .map(|m| m.permission_code)
            .collect();

        Ok(UserPermissions {
            user_id: user_id.to_string(),
            role_ids,
            menu_ids,
            permission_codes,
        })
    }

    pub async fn has_permission(&self, user_id: &str, permission_code: &str) -> RbacResult<bool> {
        let granted = self.access.has_permission(user_id, permission_code).await?;
        debug!(user_id, permission_code, granted, "Permission check");
        Ok(granted)
    }

    /// End-user navigation tree for a role set. No roles means an empty tree.
    pub async fn navigation_for_roles(&self, role_ids: &[String]) -> RbacResult<Vec<UserMenuNode>> {
        let role_ids = dedup_ids(role_ids);
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let menu_ids = self.access.get_permissions_for_roles(&role_ids).await?;
        let nodes = self.menus.get_by_ids(&menu_ids).await?;
        Ok(build_user_menu_tree(&nodes, ""))
    }

    pub async fn navigation_for_user(&self, user_id: &str) -> RbacResult<Vec<UserMenuNode>> {
        let menu_ids = self.access.get_effective_permissions_for_user(user_id).await?;
        let nodes = self.menus.get_by_ids(&menu_ids).await?;
        Ok(build_user_menu_tree(&nodes, ""))
    }

    /// Administrative view of everything a role set grants, hidden and
    /// disabled nodes included
    pub async fn granted_tree_for_roles(&self, role_ids: &[String]) -> RbacResult<Vec<MenuTreeNode>> {
        let role_ids = dedup_ids(role_ids);
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let menu_ids = self.access.get_permissions_for_roles(&role_ids).await?;
        let nodes = self.menus.get_by_ids(&menu_ids).await?;
        Ok(build_tree(&nodes, ""))
    }

    async fn existing_roles(&self, role_ids: &[String]) -> RbacResult<Vec<Role>> {
        let ids = dedup_ids(role_ids);
        let mut found: HashMap<String, Role> = self
            .roles
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|role| (role.id.clone(), role))
            .collect();

        ids.iter()
            .map(|id| {
                found
                    .remove(id)
                    .ok_or_else(|| RbacError::invalid(format!("role {} does not exist", id)))
            })
            .collect()
    }
}

fn require_user(user_id: &str) -> RbacResult<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(RbacError::invalid("user id must not be empty"));
    }
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::types::{DataScope, MenuKind, MenuNode, NewMenu, NewRole, RolePatch, Status};
    use crate::rbac::MemoryStore;
    use crate::services::{MenuService, RoleService};

    struct Fixture {
        access: AccessService,
        roles: RoleService,
        menus: MenuService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            access: AccessService::new(store.clone(), store.clone(), store.clone()),
            roles: RoleService::new(store.clone(), store.clone(), store.clone()),
            menus: MenuService::new(store.clone(), store),
        }
    }

    async fn menu(fx: &Fixture, name: &str, parent: &str, kind: MenuKind, code: &str) -> MenuNode {
        fx.menus
            .create(NewMenu {
                id: None,
                parent_id: parent.into(),
                name: name.into(),
                kind,
                route: format!("/{}", name.to_lowercase()),
                component: String::new(),
                icon: String::new(),
                permission_code: code.into(),
                sort_order: 0,
                visible: true,
                status: None,
            })
            .await
            .unwrap()
    }

    async fn role(fx: &Fixture, key: &str, menu_ids: Vec<String>) -> Role {
        fx.roles
            .create(NewRole {
                id: None,
                name: format!("Role {}", key),
                key: key.into(),
                tenant_id: String::new(),
                sort_order: 0,
                data_scope: DataScope::All,
                menu_ids,
                status: None,
                remark: String::new(),
            })
            .await
            .unwrap()
            .role
    }

    #[tokio::test]
    async fn enabled_and_disabled_menu_scenario() {
        let fx = fixture();
        let m1 = menu(&fx, "Dashboard", "", MenuKind::Page, "").await;
        let m2 = menu(&fx, "Reports", "", MenuKind::Page, "").await;
        fx.menus
            .batch_set_status(&[m2.id.clone()], Status::Disabled)
            .await
            .unwrap();

        let r1 = role(&fx, "r1", vec![m1.id.clone(), m2.id.clone()]).await;
        fx.access.assign_roles("U1", &[r1.id.clone()]).await.unwrap();

        let mut effective = fx.access.effective_permissions("U1").await.unwrap();
        effective.sort();
        let mut expected = vec![m1.id.clone(), m2.id.clone()];
        expected.sort();
        assert_eq!(effective, expected);

        let nav = fx.access.navigation_for_user("U1").await.unwrap();
        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].menu_id, m1.id);

        let by_roles = fx.access.navigation_for_roles(&[r1.id.clone()]).await.unwrap();
        assert_eq!(by_roles, nav);

        // admin view keeps the disabled grant
        let granted = fx.access.granted_tree_for_roles(&[r1.id]).await.unwrap();
        assert_eq!(granted.len(), 2);
    }

    #[tokio::test]
    async fn aggregation_is_set_semantics() {
        let fx = fixture();
        let m1 = menu(&fx, "A", "", MenuKind::Page, "").await;
        let m2 = menu(&fx, "B", "", MenuKind::Page, "").await;
        let r1 = role(&fx, "r1", vec![m1.id.clone(), m2.id.clone()]).await;
        let r2 = role(&fx, "r2", vec![m2.id.clone(), m1.id.clone()]).await;

        fx.access
            .assign_roles("u", &[r1.id.clone(), r2.id.clone(), r1.id.clone()])
            .await
            .unwrap();
        let effective = fx.access.effective_permissions("u").await.unwrap();
        assert_eq!(effective.len(), 2);
        assert_eq!(fx.access.roles_for_user("u").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn disabled_role_grants_nothing() {
        let fx = fixture();
        let m1 = menu(&fx, "A", "", MenuKind::Page, "a:view").await;
        let r1 = role(&fx, "r1", vec![m1.id.clone()]).await;
        fx.access.assign_roles("u", &[r1.id.clone()]).await.unwrap();
        assert!(fx.access.has_permission("u", "a:view").await.unwrap());

        let patch = RolePatch {
            status: Some(Status::Disabled),
            menu_ids: vec![m1.id.clone()],
            ..Default::default()
        };
        fx.roles.update(&r1.id, patch).await.unwrap();

        assert!(fx.access.effective_permissions("u").await.unwrap().is_empty());
        assert!(!fx.access.has_permission("u", "a:view").await.unwrap());
        assert!(fx.access.navigation_for_user("u").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn navigation_prunes_hidden_directories_and_buttons() {
        let fx = fixture();
        let dir = menu(&fx, "System", "", MenuKind::Directory, "").await;
        let users = menu(&fx, "Users", &dir.id, MenuKind::Page, "user:list").await;
        let add = menu(&fx, "Add", &users.id, MenuKind::Button, "user:add").await;
        let r1 = role(&fx, "r1", vec![dir.id.clone(), users.id.clone(), add.id.clone()]).await;
        fx.access.assign_roles("u", &[r1.id.clone()]).await.unwrap();

        let nav = fx.access.navigation_for_user("u").await.unwrap();
        assert_eq!(nav.len(), 1);
        assert_eq!(nav[0].children.len(), 1);
        assert!(nav[0].children[0].children.is_empty());

        let perms = fx.access.user_permissions("u").await.unwrap();
        assert_eq!(perms.permission_codes.len(), 2);
        assert!(fx.access.has_permission("u", "user:add").await.unwrap());

        fx.menus
            .update(
                &dir.id,
                crate::rbac::types::MenuPatch { visible: Some(false), ..Default::default() },
            )
            .await
            .unwrap();
        assert!(fx.access.navigation_for_user("u").await.unwrap().is_empty());
        // hidden nodes still resolve for permission checks
        assert!(fx.access.has_permission("u", "user:list").await.unwrap());
    }

    #[tokio::test]
    async fn empty_role_set_resolves_to_empty_tree() {
        let fx = fixture();
        assert!(fx.access.navigation_for_roles(&[]).await.unwrap().is_empty());
        assert!(fx.access.navigation_for_user("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn assignment_validates_roles_and_user() {
        let fx = fixture();
        let err = fx.access.assign_roles("u", &["ROLE-NOPE".into()]).await.unwrap_err();
        assert!(matches!(err, RbacError::Invalid(_)));
        assert!(fx.access.assign_roles(" ", &[]).await.is_err());

        let r1 = role(&fx, "r1", Vec::new()).await;
        let r2 = role(&fx, "r2", Vec::new()).await;
        fx.access.assign_roles("u", &[r1.id.clone(), r2.id.clone()]).await.unwrap();
        assert_eq!(fx.access.remove_roles("u", &[r1.id.clone()]).await.unwrap(), 1);
        let left: Vec<String> = fx.access.roles_for_user("u").await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(left, vec![r2.id.clone()]);

        // replacing with an empty set clears everything
        fx.access.assign_roles("u", &[]).await.unwrap();
        assert!(fx.access.roles_for_user("u").await.unwrap().is_empty());
    }
}
