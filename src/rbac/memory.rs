//! In-process store backing all three store traits with one lock.
//!
//! Used by the test suites and by `STORAGE_BACKEND=memory`. It enforces the
//! same uniqueness rules the Postgres indexes do, and a whole-set
//! replacement happens under a single write guard so readers never observe
//! the intermediate empty set.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::error::{RbacError, RbacResult};
use super::store::{AssignmentIndex, MenuStore, RoleStore};
use super::types::{
    Grant, GrantType, MenuFilter, MenuKind, MenuNode, MenuStats, Page, Role, RoleFilter,
    RolePermission, RoleStats, Status, UserRole,
};

#[derive(Debug, Default)]
struct Tables {
    menus: Vec<MenuNode>,
    roles: Vec<Role>,
    user_roles: Vec<UserRole>,
    role_permissions: Vec<RolePermission>,
}

impl Tables {
    fn check_menu_unique(&self, menu: &MenuNode, exclude_id: Option<&str>) -> RbacResult<()> {
        let others = self
            .menus
            .iter()
            .filter(|m| Some(m.id.as_str()) != exclude_id);

        for other in others {
            if exclude_id.is_none() && other.id == menu.id {
                return Err(RbacError::Duplicate(format!("menu id {} already exists", menu.id)));
            }
            if other.parent_id == menu.parent_id && other.name == menu.name {
                return Err(RbacError::Duplicate(format!(
                    "menu name {} already exists under the same parent",
                    menu.name
                )));
            }
            if !menu.permission_code.is_empty() && other.permission_code == menu.permission_code {
                return Err(RbacError::Duplicate(format!(
                    "permission code {} already exists",
                    menu.permission_code
                )));
            }
        }
        Ok(())
    }

    fn check_role_unique(&self, role: &Role, exclude_id: Option<&str>) -> RbacResult<()> {
        let others = self
            .roles
            .iter()
            .filter(|r| Some(r.id.as_str()) != exclude_id);

        for other in others {
            if exclude_id.is_none() && other.id == role.id {
                return Err(RbacError::Duplicate(format!("role id {} already exists", role.id)));
            }
            if other.key == role.key {
                return Err(RbacError::Duplicate(format!("role key {} already exists", role.key)));
            }
            if other.tenant_id == role.tenant_id && other.name == role.name {
                return Err(RbacError::Duplicate(format!("role name {} already exists", role.name)));
            }
        }
        Ok(())
    }

    fn enabled_role(&self, role_id: &str) -> bool {
        self.roles.iter().any(|r| r.id == role_id && r.is_enabled())
    }

    fn permissions_for_roles(&self, role_ids: &[String]) -> Vec<String> {
        let wanted: HashSet<&str> = role_ids
            .iter()
            .map(String::as_str)
            .filter(|id| self.enabled_role(id))
            .collect();

        let mut seen = HashSet::new();
        self.role_permissions
            .iter()
            .filter(|grant| wanted.contains(grant.role_id.as_str()))
            .filter(|grant| seen.insert(grant.menu_id.as_str()))
            .map(|grant| grant.menu_id.clone())
            .collect()
    }

    fn roles_for_user(&self, user_id: &str) -> Vec<String> {
        self.user_roles
            .iter()
            .filter(|ur| ur.user_id == user_id)
            .map(|ur| ur.role_id.clone())
            .collect()
    }
}

/// Cloning shares the underlying tables
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) async fn grants_for_role(&self, role_id: &str) -> Vec<Grant> {
        let tables = self.inner.read().await;
        tables
            .role_permissions
            .iter()
            .filter(|rp| rp.role_id == role_id)
            .map(|rp| Grant { menu_id: rp.menu_id.clone(), permission_type: rp.permission_type })
            .collect()
    }
}

#[async_trait]
impl MenuStore for MemoryStore {
    async fn insert(&self, menu: MenuNode) -> RbacResult<MenuNode> {
        let mut tables = self.inner.write().await;
        tables.check_menu_unique(&menu, None)?;
        tables.menus.push(menu.clone());
        Ok(menu)
    }

    async fn get(&self, id: &str) -> RbacResult<Option<MenuNode>> {
        let tables = self.inner.read().await;
        Ok(tables.menus.iter().find(|m| m.id == id).cloned())
    }

    async fn update(&self, menu: &MenuNode) -> RbacResult<()> {
        let mut tables = self.inner.write().await;
        tables.check_menu_unique(menu, Some(&menu.id))?;
        let slot = tables
            .menus
            .iter_mut()
            .find(|m| m.id == menu.id)
            .ok_or_else(|| RbacError::menu_not_found(&menu.id))?;
        *slot = menu.clone();
        Ok(())
    }

    async fn delete(&self, id: &str) -> RbacResult<bool> {
        let mut tables = self.inner.write().await;
        let before = tables.menus.len();
        tables.menus.retain(|m| m.id != id);
        Ok(tables.menus.len() != before)
    }

    async fn list(&self, filter: &MenuFilter) -> RbacResult<Vec<MenuNode>> {
        let tables = self.inner.read().await;
        let mut menus: Vec<MenuNode> = tables
            .menus
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        // stable: equal keys keep insertion order
        menus.sort_by(|a, b| {
            a.parent_id
                .cmp(&b.parent_id)
                .then(a.sort_order.cmp(&b.sort_order))
        });
        Ok(menus)
    }

    async fn get_children(&self, parent_id: &str) -> RbacResult<Vec<MenuNode>> {
        let tables = self.inner.read().await;
        let mut children: Vec<MenuNode> = tables
            .menus
            .iter()
            .filter(|m| m.parent_id == parent_id)
            .cloned()
            .collect();
        children.sort_by_key(|m| m.sort_order);
        Ok(children)
    }

    async fn get_by_ids(&self, ids: &[String]) -> RbacResult<Vec<MenuNode>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let tables = self.inner.read().await;
        let mut menus: Vec<MenuNode> = tables
            .menus
            .iter()
            .filter(|m| wanted.contains(m.id.as_str()))
            .cloned()
            .collect();
        menus.sort_by(|a, b| {
            a.parent_id
                .cmp(&b.parent_id)
                .then(a.sort_order.cmp(&b.sort_order))
        });
        Ok(menus)
    }

    async fn batch_set_status(&self, ids: &[String], status: Status) -> RbacResult<u64> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let now = Utc::now();
        let mut tables = self.inner.write().await;
        let mut modified = 0;
        for menu in tables
            .menus
            .iter_mut()
            .filter(|m| wanted.contains(m.id.as_str()) && m.status != status)
        {
            menu.status = status;
            menu.updated_at = now;
            modified += 1;
        }
        Ok(modified)
    }

    async fn stats(&self) -> RbacResult<MenuStats> {
        let tables = self.inner.read().await;
        let mut stats = MenuStats {
            total_menus: tables.menus.len() as i64,
            ..MenuStats::default()
        };
        for menu in &tables.menus {
            match menu.status {
                Status::Enabled => stats.enabled_menus += 1,
                Status::Disabled => stats.disabled_menus += 1,
            }
            match menu.kind {
                MenuKind::Directory => stats.directory_menus += 1,
                MenuKind::Page => stats.page_menus += 1,
                MenuKind::Button => stats.button_menus += 1,
            }
        }
        Ok(stats)
    }

    async fn name_exists(
        &self,
        name: &str,
        parent_id: &str,
        exclude_id: Option<&str>,
    ) -> RbacResult<bool> {
        let tables = self.inner.read().await;
        Ok(tables.menus.iter().any(|m| {
            m.name == name && m.parent_id == parent_id && Some(m.id.as_str()) != exclude_id
        }))
    }

    async fn permission_code_exists(
        &self,
        code: &str,
        exclude_id: Option<&str>,
    ) -> RbacResult<bool> {
        if code.is_empty() {
            return Ok(false);
        }
        let tables = self.inner.read().await;
        Ok(tables
            .menus
            .iter()
            .any(|m| m.permission_code == code && Some(m.id.as_str()) != exclude_id))
    }

    async fn has_children(&self, id: &str) -> RbacResult<bool> {
        let tables = self.inner.read().await;
        Ok(tables.menus.iter().any(|m| m.parent_id == id))
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn insert(&self, role: Role) -> RbacResult<Role> {
        let mut tables = self.inner.write().await;
        tables.check_role_unique(&role, None)?;
        tables.roles.push(role.clone());
        Ok(role)
    }

    async fn get(&self, id: &str) -> RbacResult<Option<Role>> {
        let tables = self.inner.read().await;
        Ok(tables.roles.iter().find(|r| r.id == id).cloned())
    }

    async fn get_by_key(&self, key: &str) -> RbacResult<Option<Role>> {
        let tables = self.inner.read().await;
        Ok(tables.roles.iter().find(|r| r.key == key).cloned())
    }

    async fn get_by_ids(&self, ids: &[String]) -> RbacResult<Vec<Role>> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let tables = self.inner.read().await;
        Ok(tables
            .roles
            .iter()
            .filter(|r| wanted.contains(r.id.as_str()))
            .cloned()
            .collect())
    }

    async fn update(&self, role: &Role) -> RbacResult<()> {
        let mut tables = self.inner.write().await;
        tables.check_role_unique(role, Some(&role.id))?;
        let slot = tables
            .roles
            .iter_mut()
            .find(|r| r.id == role.id)
            .ok_or_else(|| RbacError::role_not_found(&role.id))?;
        *slot = role.clone();
        Ok(())
    }

    async fn delete(&self, id: &str) -> RbacResult<bool> {
        let mut tables = self.inner.write().await;
        let before = tables.roles.len();
        tables.roles.retain(|r| r.id != id);
        Ok(tables.roles.len() != before)
    }

    async fn list(&self, filter: &RoleFilter, page: Page) -> RbacResult<(Vec<Role>, i64)> {
        let tables = self.inner.read().await;
        let mut roles: Vec<Role> = tables
            .roles
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        roles.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then(b.created_at.cmp(&a.created_at))
        });

        let total = roles.len() as i64;
        let items = roles
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .collect();
        Ok((items, total))
    }

    async fn get_by_tenant(&self, tenant_id: &str) -> RbacResult<Vec<Role>> {
        let tables = self.inner.read().await;
        let mut roles: Vec<Role> = tables
            .roles
            .iter()
            .filter(|r| r.is_enabled() && r.visible_to_tenant(tenant_id))
            .cloned()
            .collect();
        roles.sort_by_key(|r| r.sort_order);
        Ok(roles)
    }

    async fn batch_set_status(&self, ids: &[String], status: Status) -> RbacResult<u64> {
        let wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let now = Utc::now();
        let mut tables = self.inner.write().await;
        let mut modified = 0;
        for role in tables
            .roles
            .iter_mut()
            .filter(|r| wanted.contains(r.id.as_str()) && r.status != status)
        {
            role.status = status;
            role.updated_at = now;
            modified += 1;
        }
        Ok(modified)
    }

    async fn stats(&self, tenant_id: Option<&str>) -> RbacResult<RoleStats> {
        let tables = self.inner.read().await;
        let scoped: Vec<&Role> = tables
            .roles
            .iter()
            .filter(|r| tenant_id.map_or(true, |t| r.tenant_id == t))
            .collect();

        let enabled = scoped.iter().filter(|r| r.is_enabled()).count() as i64;
        let mut stats = RoleStats {
            total_roles: scoped.len() as i64,
            enabled_roles: enabled,
            disabled_roles: scoped.len() as i64 - enabled,
            platform_roles: None,
            tenant_roles: None,
        };

        if tenant_id.is_none() {
            let platform = scoped.iter().filter(|r| r.is_platform()).count() as i64;
            stats.platform_roles = Some(platform);
            stats.tenant_roles = Some(scoped.len() as i64 - platform);
        }
        Ok(stats)
    }

    async fn key_exists(&self, key: &str, exclude_id: Option<&str>) -> RbacResult<bool> {
        let tables = self.inner.read().await;
        Ok(tables
            .roles
            .iter()
            .any(|r| r.key == key && Some(r.id.as_str()) != exclude_id))
    }

    async fn name_exists(
        &self,
        name: &str,
        tenant_id: &str,
        exclude_id: Option<&str>,
    ) -> RbacResult<bool> {
        let tables = self.inner.read().await;
        Ok(tables.roles.iter().any(|r| {
            r.name == name && r.tenant_id == tenant_id && Some(r.id.as_str()) != exclude_id
        }))
    }
}

#[async_trait]
impl AssignmentIndex for MemoryStore {
    async fn assign_roles_to_user(&self, user_id: &str, role_ids: &[String]) -> RbacResult<()> {
        let now = Utc::now();
        let mut tables = self.inner.write().await;
        tables.user_roles.retain(|ur| ur.user_id != user_id);

        let mut seen = HashSet::new();
        for role_id in role_ids.iter().filter(|id| seen.insert(id.as_str())) {
            tables.user_roles.push(UserRole {
                user_id: user_id.to_string(),
                role_id: role_id.clone(),
                created_at: now,
            });
        }
        Ok(())
    }

    async fn remove_roles_from_user(&self, user_id: &str, role_ids: &[String]) -> RbacResult<u64> {
        let mut tables = self.inner.write().await;
        let before = tables.user_roles.len();
        tables
            .user_roles
            .retain(|ur| !(ur.user_id == user_id && role_ids.contains(&ur.role_id)));
        Ok((before - tables.user_roles.len()) as u64)
    }

    async fn remove_role_from_all_users(&self, role_id: &str) -> RbacResult<u64> {
        let mut tables = self.inner.write().await;
        let before = tables.user_roles.len();
        tables.user_roles.retain(|ur| ur.role_id != role_id);
        Ok((before - tables.user_roles.len()) as u64)
    }

    async fn assign_permissions_to_role(&self, role_id: &str, grants: &[Grant]) -> RbacResult<()> {
        let now = Utc::now();
        let mut tables = self.inner.write().await;
        tables.role_permissions.retain(|rp| rp.role_id != role_id);

        let mut seen = HashSet::new();
        for grant in grants.iter().filter(|g| seen.insert((g.menu_id.as_str(), g.permission_type))) {
            tables.role_permissions.push(RolePermission {
                role_id: role_id.to_string(),
                menu_id: grant.menu_id.clone(),
                permission_type: grant.permission_type,
                created_at: now,
            });
        }
        Ok(())
    }

    async fn remove_permissions_from_role(
        &self,
        role_id: &str,
        menu_ids: &[String],
    ) -> RbacResult<u64> {
        let mut tables = self.inner.write().await;
        let before = tables.role_permissions.len();
        tables
            .role_permissions
            .retain(|rp| !(rp.role_id == role_id && menu_ids.contains(&rp.menu_id)));
        Ok((before - tables.role_permissions.len()) as u64)
    }

    async fn retype_permission(&self, menu_id: &str, permission_type: GrantType) -> RbacResult<u64> {
        let mut tables = self.inner.write().await;
        let mut changed = 0;
        for grant in tables
            .role_permissions
            .iter_mut()
            .filter(|rp| rp.menu_id == menu_id && rp.permission_type != permission_type)
        {
            grant.permission_type = permission_type;
            changed += 1;
        }
        Ok(changed)
    }

    async fn get_roles_for_user(&self, user_id: &str) -> RbacResult<Vec<String>> {
        let tables = self.inner.read().await;
        Ok(tables.roles_for_user(user_id))
    }

    async fn get_users_for_role(&self, role_id: &str) -> RbacResult<Vec<String>> {
        let tables = self.inner.read().await;
        Ok(tables
            .user_roles
            .iter()
            .filter(|ur| ur.role_id == role_id)
            .map(|ur| ur.user_id.clone())
            .collect())
    }

    async fn get_permissions_for_role(&self, role_id: &str) -> RbacResult<Vec<String>> {
        let tables = self.inner.read().await;
        let mut seen = HashSet::new();
        Ok(tables
            .role_permissions
            .iter()
            .filter(|rp| rp.role_id == role_id)
            .filter(|rp| seen.insert(rp.menu_id.as_str()))
            .map(|rp| rp.menu_id.clone())
            .collect())
    }

    async fn get_roles_for_permission(&self, menu_id: &str) -> RbacResult<Vec<String>> {
        let tables = self.inner.read().await;
        let mut seen = HashSet::new();
        Ok(tables
            .role_permissions
            .iter()
            .filter(|rp| rp.menu_id == menu_id)
            .filter(|rp| seen.insert(rp.role_id.as_str()))
            .map(|rp| rp.role_id.clone())
            .collect())
    }

    async fn get_permissions_for_roles(&self, role_ids: &[String]) -> RbacResult<Vec<String>> {
        let tables = self.inner.read().await;
        Ok(tables.permissions_for_roles(role_ids))
    }

    async fn get_effective_permissions_for_user(&self, user_id: &str) -> RbacResult<Vec<String>> {
        let tables = self.inner.read().await;
        let role_ids = tables.roles_for_user(user_id);
        Ok(tables.permissions_for_roles(&role_ids))
    }

    async fn has_permission(&self, user_id: &str, permission_code: &str) -> RbacResult<bool> {
        if permission_code.is_empty() {
            return Ok(false);
        }
        let tables = self.inner.read().await;
        let role_ids = tables.roles_for_user(user_id);
        let granted: HashSet<String> = tables.permissions_for_roles(&role_ids).into_iter().collect();

        Ok(tables.menus.iter().any(|m| {
            m.permission_code == permission_code && m.is_enabled() && granted.contains(&m.id)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::types::{DataScope, GrantType};

    fn menu(id: &str, parent: &str, name: &str) -> MenuNode {
        let now = Utc::now();
        MenuNode {
            id: id.into(),
            parent_id: parent.into(),
            name: name.into(),
            kind: MenuKind::Page,
            route: String::new(),
            component: String::new(),
            icon: String::new(),
            permission_code: String::new(),
            sort_order: 0,
            visible: true,
            status: Status::Enabled,
            created_at: now,
            updated_at: now,
        }
    }

    fn role(id: &str, key: &str, tenant: &str) -> Role {
        let now = Utc::now();
        Role {
            id: id.into(),
            name: format!("{} name", key),
            key: key.into(),
            tenant_id: tenant.into(),
            sort_order: 0,
            data_scope: DataScope::All,
            status: Status::Enabled,
            remark: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn grant(menu_id: &str) -> Grant {
        Grant { menu_id: menu_id.into(), permission_type: GrantType::Menu }
    }

    #[tokio::test]
    async fn menu_uniqueness_is_enforced_on_insert_and_update() {
        let store = MemoryStore::new();
        MenuStore::insert(&store, menu("a", "", "Users")).await.unwrap();
        MenuStore::insert(&store, menu("b", "", "Roles")).await.unwrap();
        // same name under a different parent is fine
        MenuStore::insert(&store, menu("c", "a", "Users")).await.unwrap();

        let err = MenuStore::insert(&store, menu("d", "", "Users")).await.unwrap_err();
        assert!(matches!(err, RbacError::Duplicate(_)));

        let renamed = menu("b", "", "Users");
        let err = MenuStore::update(&store, &renamed).await.unwrap_err();
        assert!(matches!(err, RbacError::Duplicate(_)));

        let mut coded = menu("e", "", "Audit");
        coded.permission_code = "audit:view".into();
        MenuStore::insert(&store, coded).await.unwrap();
        let mut clash = menu("f", "", "Audit 2");
        clash.permission_code = "audit:view".into();
        assert!(MenuStore::insert(&store, clash).await.is_err());
    }

    #[tokio::test]
    async fn role_key_is_global_and_name_is_per_tenant() {
        let store = MemoryStore::new();
        RoleStore::insert(&store, role("r1", "admin", "")).await.unwrap();

        let err = RoleStore::insert(&store, role("r2", "admin", "t1")).await.unwrap_err();
        assert!(matches!(err, RbacError::Duplicate(_)));

        let mut same_name = role("r3", "other", "t1");
        same_name.name = "admin name".into();
        RoleStore::insert(&store, same_name).await.unwrap();

        let mut clash = role("r4", "third", "t1");
        clash.name = "admin name".into();
        assert!(RoleStore::insert(&store, clash).await.is_err());
    }

    #[tokio::test]
    async fn replace_sets_are_whole_and_deduplicated() {
        let store = MemoryStore::new();
        let ids = vec!["r1".to_string(), "r2".to_string(), "r1".to_string()];
        store.assign_roles_to_user("u1", &ids).await.unwrap();
        assert_eq!(store.get_roles_for_user("u1").await.unwrap(), vec!["r1", "r2"]);

        store.assign_roles_to_user("u1", &["r3".to_string()]).await.unwrap();
        assert_eq!(store.get_roles_for_user("u1").await.unwrap(), vec!["r3"]);

        store
            .assign_permissions_to_role("r1", &[grant("m1"), grant("m2"), grant("m1")])
            .await
            .unwrap();
        assert_eq!(store.get_permissions_for_role("r1").await.unwrap(), vec!["m1", "m2"]);

        store.assign_permissions_to_role("r1", &[]).await.unwrap();
        assert!(store.get_permissions_for_role("r1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn disabled_roles_contribute_nothing() {
        let store = MemoryStore::new();
        RoleStore::insert(&store, role("r1", "a", "")).await.unwrap();
        let mut off = role("r2", "b", "");
        off.status = Status::Disabled;
        RoleStore::insert(&store, off).await.unwrap();

        store.assign_permissions_to_role("r1", &[grant("m1")]).await.unwrap();
        store.assign_permissions_to_role("r2", &[grant("m2")]).await.unwrap();
        store
            .assign_roles_to_user("u1", &["r1".to_string(), "r2".to_string()])
            .await
            .unwrap();

        let effective = store.get_effective_permissions_for_user("u1").await.unwrap();
        assert_eq!(effective, vec!["m1"]);
    }

    #[tokio::test]
    async fn has_permission_requires_enabled_menu_with_code() {
        let store = MemoryStore::new();
        let mut view = menu("m1", "", "View");
        view.permission_code = "user:view".into();
        let mut edit = menu("m2", "", "Edit");
        edit.permission_code = "user:edit".into();
        edit.status = Status::Disabled;
        MenuStore::insert(&store, view).await.unwrap();
        MenuStore::insert(&store, edit).await.unwrap();
        RoleStore::insert(&store, role("r1", "ops", "")).await.unwrap();
        store
            .assign_permissions_to_role("r1", &[grant("m1"), grant("m2")])
            .await
            .unwrap();
        store.assign_roles_to_user("u1", &["r1".to_string()]).await.unwrap();

        assert!(store.has_permission("u1", "user:view").await.unwrap());
        assert!(!store.has_permission("u1", "user:edit").await.unwrap());
        assert!(!store.has_permission("u2", "user:view").await.unwrap());
        assert!(!store.has_permission("u1", "").await.unwrap());
    }

    #[tokio::test]
    async fn role_stats_break_down_only_platform_wide() {
        let store = MemoryStore::new();
        RoleStore::insert(&store, role("r1", "a", "")).await.unwrap();
        RoleStore::insert(&store, role("r2", "b", "t1")).await.unwrap();
        RoleStore::batch_set_status(&store, &["r2".to_string()], Status::Disabled)
            .await
            .unwrap();

        let all = RoleStore::stats(&store, None).await.unwrap();
        assert_eq!(all.total_roles, 2);
        assert_eq!(all.disabled_roles, 1);
        assert_eq!(all.platform_roles, Some(1));
        assert_eq!(all.tenant_roles, Some(1));

        let scoped = RoleStore::stats(&store, Some("t1")).await.unwrap();
        assert_eq!(scoped.total_roles, 1);
        assert_eq!(scoped.platform_roles, None);
    }
}
