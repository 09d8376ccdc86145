use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::try_join_all;
use serde::Serialize;
use tracing::info;

use crate::rbac::types::{
    dedup_ids, generate_id, Grant, GrantType, NewRole, Page, Role, RoleFilter, RolePatch,
    RoleStats, Status,
};
use crate::rbac::{AssignmentIndex, MenuStore, RbacError, RbacResult, RoleStore};

const MIN_ROLE_TEXT: usize = 2;
const MAX_ROLE_TEXT: usize = 50;

/// A role together with the menu ids it grants, read from the assignment index
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleInfo {
    #[serde(flatten)]
    pub role: Role,
    pub menu_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleList {
    pub roles: Vec<RoleInfo>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

#[derive(Clone)]
pub struct RoleService {
    roles: Arc<dyn RoleStore>,
    menus: Arc<dyn MenuStore>,
    access: Arc<dyn AssignmentIndex>,
}

impl RoleService {
    pub fn new(
        roles: Arc<dyn RoleStore>,
        menus: Arc<dyn MenuStore>,
        access: Arc<dyn AssignmentIndex>,
    ) -> Self {
        Self { roles, menus, access }
    }

    pub async fn create(&self, req: NewRole) -> RbacResult<RoleInfo> {
        let name = req.name.trim().to_string();
        let key = req.key.trim().to_string();
        validate_text("role name", &name)?;
        validate_text("role key", &key)?;
        let tenant_id = req.tenant_id.trim().to_string();

        if self.roles.key_exists(&key, None).await? {
            return Err(RbacError::Duplicate(format!("role key {} already exists", key)));
        }
        if self.roles.name_exists(&name, &tenant_id, None).await? {
            return Err(RbacError::Duplicate(format!("role name {} already exists", name)));
        }
        let grants = self.resolve_grants(&req.menu_ids).await?;

        let now = Utc::now();
        let role = Role {
            id: req
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| generate_id("ROLE")),
            name,
            key,
            tenant_id,
            sort_order: req.sort_order,
            data_scope: req.data_scope,
            status: req.status.unwrap_or_default(),
            remark: req.remark,
            created_at: now,
            updated_at: now,
        };

        let role = self.roles.insert(role).await?;
        self.access.assign_permissions_to_role(&role.id, &grants).await?;

        info!(role_id = %role.id, role_key = %role.key, grants = grants.len(), "Role created");
        Ok(RoleInfo {
            menu_ids: grants.into_iter().map(|g| g.menu_id).collect(),
            role,
        })
    }

    pub async fn get(&self, id: &str) -> RbacResult<RoleInfo> {
        let role = self.require(id).await?;
        self.with_grants(role).await
    }

    pub async fn get_by_key(&self, key: &str) -> RbacResult<RoleInfo> {
        let role = self
            .roles
            .get_by_key(key)
            .await?
            .ok_or_else(|| RbacError::role_not_found(key))?;
        self.with_grants(role).await
    }

    /// Roles in the order of `ids`, skipping unknown ids
    pub async fn get_by_ids(&self, ids: &[String]) -> RbacResult<Vec<Role>> {
        let ids = dedup_ids(ids);
        let mut found: HashMap<String, Role> = self
            .roles
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|role| (role.id.clone(), role))
            .collect();
        Ok(ids.iter().filter_map(|id| found.remove(id)).collect())
    }

    /// Partial update; the supplied `menu_ids` always replace the grant set
    pub async fn update(&self, id: &str, patch: RolePatch) -> RbacResult<RoleInfo> {
        let existing = self.require(id).await?;
        let mut role = existing.clone();

        if let Some(key) = patch.key {
            let key = key.trim().to_string();
            validate_text("role key", &key)?;
            if key != existing.key && self.roles.key_exists(&key, Some(id)).await? {
                return Err(RbacError::Duplicate(format!("role key {} already exists", key)));
            }
            role.key = key;
        }
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            validate_text("role name", &name)?;
            if name != existing.name
                && self.roles.name_exists(&name, &existing.tenant_id, Some(id)).await?
            {
                return Err(RbacError::Duplicate(format!("role name {} already exists", name)));
            }
            role.name = name;
        }
        if let Some(sort_order) = patch.sort_order {
            role.sort_order = sort_order;
        }
        if let Some(scope) = patch.data_scope {
            role.data_scope = scope;
        }
        if let Some(status) = patch.status {
            role.status = status;
        }
        if let Some(remark) = patch.remark {
            role.remark = remark;
        }
        role.updated_at = Utc::now();

        let grants = self.resolve_grants(&patch.menu_ids).await?;
        self.roles.update(&role).await?;
        self.access.assign_permissions_to_role(id, &grants).await?;

        info!(role_id = %role.id, role_key = %role.key, grants = grants.len(), "Role updated");
        Ok(RoleInfo {
            menu_ids: grants.into_iter().map(|g| g.menu_id).collect(),
            role,
        })
    }

    /// Detaches grants and user assignments, then removes the record
    pub async fn delete(&self, id: &str) -> RbacResult<()> {
        let role = self.require(id).await?;

        self.access.assign_permissions_to_role(id, &[]).await?;
        let detached = self.access.remove_role_from_all_users(id).await?;
        if !self.roles.delete(id).await? {
            return Err(RbacError::role_not_found(id));
        }

        info!(role_id = %id, role_key = %role.key, detached_users = detached, "Role deleted");
        Ok(())
    }

    pub async fn list(&self, filter: &RoleFilter, page: Page) -> RbacResult<RoleList> {
        let (roles, total) = self.roles.list(filter, page).await?;
        let roles = try_join_all(roles.into_iter().map(|role| self.with_grants(role))).await?;

        Ok(RoleList {
            roles,
            total,
            page: page.page,
            page_size: page.page_size,
            total_pages: page.total_pages(total),
        })
    }

    /// Enabled roles a tenant may assign: its own plus platform roles
    pub async fn by_tenant(&self, tenant_id: &str) -> RbacResult<Vec<Role>> {
        self.roles.get_by_tenant(tenant_id).await
    }

    pub async fn batch_set_status(&self, ids: &[String], status: Status) -> RbacResult<u64> {
        let ids = dedup_ids(ids);
        if ids.is_empty() {
            return Err(RbacError::invalid("role id list must not be empty"));
        }
        let modified = self.roles.batch_set_status(&ids, status).await?;
        info!(requested = ids.len(), modified, status = status.as_str(), "Role status updated");
        Ok(modified)
    }

    pub async fn stats(&self, tenant_id: Option<&str>) -> RbacResult<RoleStats> {
        self.roles.stats(tenant_id.filter(|t| !t.is_empty())).await
    }

    pub async fn users(&self, id: &str) -> RbacResult<Vec<String>> {
        self.require(id).await?;
        self.access.get_users_for_role(id).await
    }

    /// Replaces the role's whole grant set
    pub async fn set_permissions(&self, id: &str, menu_ids: &[String]) -> RbacResult<RoleInfo> {
        let role = self.require(id).await?;
        let grants = self.resolve_grants(menu_ids).await?;
        self.access.assign_permissions_to_role(id, &grants).await?;

        info!(role_id = %id, grants = grants.len(), "Role permissions replaced");
        Ok(RoleInfo {
            menu_ids: grants.into_iter().map(|g| g.menu_id).collect(),
            role,
        })
    }

    pub async fn remove_permissions(&self, id: &str, menu_ids: &[String]) -> RbacResult<u64> {
        self.require(id).await?;
        let menu_ids = dedup_ids(menu_ids);
        if menu_ids.is_empty() {
            return Err(RbacError::invalid("menu id list must not be empty"));
        }
        let removed = self.access.remove_permissions_from_role(id, &menu_ids).await?;
        info!(role_id = %id, removed, "Role permissions removed");
        Ok(removed)
    }

    async fn require(&self, id: &str) -> RbacResult<Role> {
        self.roles
            .get(id)
            .await?
            .ok_or_else(|| RbacError::role_not_found(id))
    }

    async fn with_grants(&self, role: Role) -> RbacResult<RoleInfo> {
        let menu_ids = self.access.get_permissions_for_role(&role.id).await?;
        Ok(RoleInfo { role, menu_ids })
    }

    /// Typed grants for a menu id list; every id must name an existing menu
    async fn resolve_grants(&self, menu_ids: &[String]) -> RbacResult<Vec<Grant>> {
        let ids = dedup_ids(menu_ids);
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let kinds: HashMap<String, GrantType> = self
            .menus
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|menu| (menu.id, GrantType::for_kind(menu.kind)))
            .collect();

        ids.into_iter()
            .map(|menu_id| match kinds.get(&menu_id) {
                Some(&permission_type) => Ok(Grant { menu_id, permission_type }),
                None => Err(RbacError::invalid(format!("menu {} does not exist", menu_id))),
            })
            .collect()
    }
}

fn validate_text(field: &str, value: &str) -> RbacResult<()> {
    let len = value.chars().count();
    if !(MIN_ROLE_TEXT..=MAX_ROLE_TEXT).contains(&len) {
        return Err(RbacError::invalid(format!(
            "{} must be between {} and {} characters",
            field, MIN_ROLE_TEXT, MAX_ROLE_TEXT
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::types::{DataScope, MenuKind, MenuNode, NewMenu};
    use crate::rbac::MemoryStore;
    use crate::services::MenuService;

    struct Fixture {
        roles: RoleService,
        menus: MenuService,
        store: MemoryStore,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let shared = Arc::new(store.clone());
        Fixture {
            roles: RoleService::new(shared.clone(), shared.clone(), shared.clone()),
            menus: MenuService::new(shared.clone(), shared),
            store,
        }
    }

    fn new_role(name: &str, key: &str, tenant: &str) -> NewRole {
        NewRole {
            id: None,
            name: name.into(),
            key: key.into(),
            tenant_id: tenant.into(),
            sort_order: 0,
            data_scope: DataScope::Tenant,
            menu_ids: Vec::new(),
            status: None,
            remark: String::new(),
        }
    }

    async fn page_menu(menus: &MenuService, name: &str, kind: MenuKind) -> MenuNode {
        menus
            .create(NewMenu {
                id: None,
                parent_id: String::new(),
                name: name.into(),
                kind,
                route: String::new(),
                component: String::new(),
                icon: String::new(),
                permission_code: String::new(),
                sort_order: 0,
                visible: true,
                status: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn create_writes_grants_with_types() {
        let fx = fixture();
        let page = page_menu(&fx.menus, "Users", MenuKind::Page).await;
        let button = page_menu(&fx.menus, "Export", MenuKind::Button).await;

        let mut req = new_role("Operators", "ops", "");
        req.menu_ids = vec![page.id.clone(), button.id.clone(), page.id.clone()];
        let info = fx.roles.create(req).await.unwrap();

        assert!(info.role.id.starts_with("ROLE"));
        assert_eq!(info.menu_ids, vec![page.id.clone(), button.id.clone()]);
        assert_eq!(fx.roles.get(&info.role.id).await.unwrap().menu_ids, info.menu_ids);
        assert_eq!(
            fx.store.get_roles_for_permission(&button.id).await.unwrap(),
            vec![info.role.id.clone()]
        );
    }

    #[tokio::test]
    async fn create_rejects_duplicates_unknown_menus_and_short_text() {
        let fx = fixture();
        fx.roles.create(new_role("Admins", "admin", "")).await.unwrap();

        let err = fx.roles.create(new_role("Other", "admin", "t1")).await.unwrap_err();
        assert!(matches!(err, RbacError::Duplicate(_)));

        let err = fx.roles.create(new_role("Admins", "admin2", "")).await.unwrap_err();
        assert!(matches!(err, RbacError::Duplicate(_)));

        // same name in another tenant is allowed
        fx.roles.create(new_role("Admins", "admin3", "t1")).await.unwrap();

        let mut req = new_role("Ghosts", "ghost", "");
        req.menu_ids = vec!["MENU-NOPE".into()];
        assert!(matches!(fx.roles.create(req).await.unwrap_err(), RbacError::Invalid(_)));
        assert!(fx.roles.get_by_key("ghost").await.unwrap_err().is_not_found());

        let err = fx.roles.create(new_role("X", "x1", "")).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_creates_on_one_key_admit_a_single_winner() {
        let fx = fixture();
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let roles = fx.roles.clone();
                tokio::spawn(async move {
                    roles.create(new_role(&format!("Racer {}", i), "racer", "")).await
                })
            })
            .collect();

        let mut created = 0;
        let mut duplicates = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(RbacError::Duplicate(_)) => duplicates += 1,
                Err(err) => panic!("unexpected error: {}", err),
            }
        }
        assert_eq!(created, 1);
        assert_eq!(duplicates, 15);
        assert!(fx.roles.get_by_key("racer").await.is_ok());
    }

    #[tokio::test]
    async fn update_replaces_grants_and_rechecks_changed_fields() {
        let fx = fixture();
        let m1 = page_menu(&fx.menus, "One", MenuKind::Page).await;
        let m2 = page_menu(&fx.menus, "Two", MenuKind::Page).await;
        let mut req = new_role("Editors", "editor", "");
        req.menu_ids = vec![m1.id.clone()];
        let role = fx.roles.create(req).await.unwrap().role;
        fx.roles.create(new_role("Viewers", "viewer", "")).await.unwrap();

        let patch = RolePatch {
            name: Some("Editors".into()),
            menu_ids: vec![m2.id.clone()],
            ..Default::default()
        };
        let info = fx.roles.update(&role.id, patch).await.unwrap();
        assert_eq!(info.menu_ids, vec![m2.id.clone()]);

        let patch = RolePatch { key: Some("viewer".into()), ..Default::default() };
        assert!(matches!(fx.roles.update(&role.id, patch).await.unwrap_err(), RbacError::Duplicate(_)));
        // failed update leaves grants alone
        assert_eq!(fx.roles.get(&role.id).await.unwrap().menu_ids, vec![m2.id]);
    }

    #[tokio::test]
    async fn delete_detaches_grants_and_users() {
        let fx = fixture();
        let m1 = page_menu(&fx.menus, "One", MenuKind::Page).await;
        let mut req = new_role("Temp", "temp", "");
        req.menu_ids = vec![m1.id.clone()];
        let role = fx.roles.create(req).await.unwrap().role;
        fx.store.assign_roles_to_user("u1", &[role.id.clone()]).await.unwrap();

        fx.roles.delete(&role.id).await.unwrap();
        assert!(fx.store.get_roles_for_user("u1").await.unwrap().is_empty());
        assert!(fx.store.get_roles_for_permission(&m1.id).await.unwrap().is_empty());
        assert!(fx.roles.delete(&role.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn list_pages_and_reports_totals() {
        let fx = fixture();
        for i in 0..5 {
            let mut req = new_role(&format!("Role {}", i), &format!("key{}", i), "t1");
            req.sort_order = 5 - i;
            fx.roles.create(req).await.unwrap();
        }

        let filter = RoleFilter { tenant_id: Some("t1".into()), ..Default::default() };
        let list = fx.roles.list(&filter, Page::new(Some(2), Some(2), 10, 100)).await.unwrap();
        assert_eq!(list.total, 5);
        assert_eq!(list.total_pages, 3);
        assert_eq!(list.roles.len(), 2);
        // sort_order ascending: key4(1), key3(2) | key2(3), key1(4) | key0(5)
        assert_eq!(list.roles[0].role.key, "key2");
        assert_eq!(list.roles[1].role.key, "key1");
    }

    #[tokio::test]
    async fn tenant_pickers_include_enabled_platform_roles() {
        let fx = fixture();
        fx.roles.create(new_role("Platform", "platform", "")).await.unwrap();
        fx.roles.create(new_role("Local", "local", "t1")).await.unwrap();
        let foreign = fx.roles.create(new_role("Foreign", "foreign", "t2")).await.unwrap();
        let mut off = new_role("Off", "off", "t1");
        off.status = Some(Status::Disabled);
        fx.roles.create(off).await.unwrap();

        let keys: Vec<String> = fx.roles.by_tenant("t1").await.unwrap().into_iter().map(|r| r.key).collect();
        assert_eq!(keys.len(), 2);
        assert!(keys.contains(&"platform".to_string()));
        assert!(keys.contains(&"local".to_string()));

        let found = fx
            .roles
            .get_by_ids(&[foreign.role.id.clone(), "missing".into()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
