use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use crate::rbac::tree::{build_tree, is_descendant, MenuTreeNode};
use crate::rbac::types::{
    dedup_ids, generate_id, GrantType, MenuFilter, MenuKind, MenuNode, MenuPatch, MenuStats,
    NewMenu, Status,
};
use crate::rbac::{AssignmentIndex, MenuStore, RbacError, RbacResult};

const MAX_MENU_NAME: usize = 50;

/// Filtered admin tree plus the flat number of matching nodes
#[derive(Debug, Clone, Serialize)]
pub struct MenuList {
    pub menus: Vec<MenuTreeNode>,
    pub total: i64,
}

/// Menu administration: validation and tree-shape invariants on top of
/// the menu store.
#[derive(Clone)]
pub struct MenuService {
    menus: Arc<dyn MenuStore>,
    access: Arc<dyn AssignmentIndex>,
}

impl MenuService {
    pub fn new(menus: Arc<dyn MenuStore>, access: Arc<dyn AssignmentIndex>) -> Self {
        Self { menus, access }
    }

    pub async fn create(&self, req: NewMenu) -> RbacResult<MenuNode> {
        let name = req.name.trim().to_string();
        validate_name(&name)?;
        let parent_id = req.parent_id.trim().to_string();
        let permission_code = req.permission_code.trim().to_string();

        if !parent_id.is_empty() {
            self.require_container(&parent_id).await?;
        }
        if self.menus.name_exists(&name, &parent_id, None).await? {
            return Err(RbacError::Duplicate(format!(
                "menu name {} already exists under the same parent",
                name
            )));
        }
        if self.menus.permission_code_exists(&permission_code, None).await? {
            return Err(RbacError::Duplicate(format!(
                "permission code {} already exists",
                permission_code
            )));
        }

        let now = Utc::now();
        let menu = MenuNode {
            id: req
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| generate_id("MENU")),
            parent_id,
            name,
            kind: req.kind,
            route: req.route,
            component: req.component,
            icon: req.icon,
            permission_code,
            sort_order: req.sort_order,
            visible: req.visible,
            status: req.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let menu = self.menus.insert(menu).await?;
        info!(menu_id = %menu.id, menu_name = %menu.name, kind = menu.kind.as_str(), "Menu created");
        Ok(menu)
    }

    pub async fn get(&self, id: &str) -> RbacResult<MenuNode> {
        self.menus
            .get(id)
            .await?
            .ok_or_else(|| RbacError::menu_not_found(id))
    }

    pub async fn update(&self, id: &str, patch: MenuPatch) -> RbacResult<MenuNode> {
        let existing = self.get(id).await?;
        let mut menu = existing.clone();

        if let Some(parent_id) = patch.parent_id {
            menu.parent_id = parent_id.trim().to_string();
        }
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            validate_name(&name)?;
            menu.name = name;
        }
        if let Some(code) = patch.permission_code {
            menu.permission_code = code.trim().to_string();
        }
        if let Some(kind) = patch.kind {
            menu.kind = kind;
        }

        if menu.parent_id != existing.parent_id && !menu.parent_id.is_empty() {
            self.check_reparent(id, &menu.parent_id).await?;
        }
        if menu.kind == MenuKind::Button
            && existing.kind != MenuKind::Button
            && self.menus.has_children(id).await?
        {
            return Err(RbacError::invalid("a menu with children cannot become a button"));
        }
        if (menu.name != existing.name || menu.parent_id != existing.parent_id)
            && self.menus.name_exists(&menu.name, &menu.parent_id, Some(id)).await?
        {
            return Err(RbacError::Duplicate(format!(
                "menu name {} already exists under the same parent",
                menu.name
            )));
        }
        if menu.permission_code != existing.permission_code
            && self
                .menus
                .permission_code_exists(&menu.permission_code, Some(id))
                .await?
        {
            return Err(RbacError::Duplicate(format!(
                "permission code {} already exists",
                menu.permission_code
            )));
        }

        if let Some(route) = patch.route {
            menu.route = route;
        }
        if let Some(component) = patch.component {
            menu.component = component;
        }
        if let Some(icon) = patch.icon {
            menu.icon = icon;
        }
        if let Some(sort_order) = patch.sort_order {
            menu.sort_order = sort_order;
        }
        if let Some(visible) = patch.visible {
            menu.visible = visible;
        }
        if let Some(status) = patch.status {
            menu.status = status;
        }
        menu.updated_at = Utc::now();

        self.menus.update(&menu).await?;
        let grant_type = GrantType::for_kind(menu.kind);
        if grant_type != GrantType::for_kind(existing.kind) {
            let retyped = self.access.retype_permission(id, grant_type).await?;
            debug!(menu_id = %id, retyped, "Grant type follows menu kind");
        }
        info!(menu_id = %menu.id, menu_name = %menu.name, "Menu updated");
        Ok(menu)
    }

    /// Refuses while children exist; clears the node's grants first
    pub async fn delete(&self, id: &str) -> RbacResult<()> {
        let menu = self.get(id).await?;
        if self.menus.has_children(id).await? {
            return Err(RbacError::HasChildren(format!(
                "menu {} has child menus, delete them first",
                menu.name
            )));
        }

        let menu_ids = [id.to_string()];
        for role_id in self.access.get_roles_for_permission(id).await? {
            self.access
                .remove_permissions_from_role(&role_id, &menu_ids)
                .await?;
        }

        if !self.menus.delete(id).await? {
            return Err(RbacError::menu_not_found(id));
        }
        info!(menu_id = %id, menu_name = %menu.name, "Menu deleted");
        Ok(())
    }

    pub async fn list(&self, filter: &MenuFilter) -> RbacResult<MenuList> {
        let nodes = self.menus.list(filter).await?;
        Ok(MenuList {
            total: nodes.len() as i64,
            menus: build_tree(&nodes, ""),
        })
    }

    pub async fn tree(&self, filter: &MenuFilter) -> RbacResult<Vec<MenuTreeNode>> {
        Ok(self.list(filter).await?.menus)
    }

    pub async fn children(&self, parent_id: &str) -> RbacResult<Vec<MenuNode>> {
        self.menus.get_children(parent_id).await
    }

    pub async fn batch_set_status(&self, ids: &[String], status: Status) -> RbacResult<u64> {
        let ids = dedup_ids(ids);
        if ids.is_empty() {
            return Err(RbacError::invalid("menu id list must not be empty"));
        }
        let modified = self.menus.batch_set_status(&ids, status).await?;
        info!(requested = ids.len(), modified, status = status.as_str(), "Menu status updated");
        Ok(modified)
    }

    pub async fn stats(&self) -> RbacResult<MenuStats> {
        self.menus.stats().await
    }

    async fn require_container(&self, parent_id: &str) -> RbacResult<MenuNode> {
        let parent = self
            .menus
            .get(parent_id)
            .await?
            .ok_or_else(|| RbacError::invalid(format!("parent menu {} does not exist", parent_id)))?;
        if parent.kind == MenuKind::Button {
            return Err(RbacError::invalid("a button cannot contain child menus"));
        }
        Ok(parent)
    }

    async fn check_reparent(&self, id: &str, new_parent: &str) -> RbacResult<()> {
        if new_parent == id {
            return Err(RbacError::Cycle("a menu cannot be its own parent".to_string()));
        }
        self.require_container(new_parent).await?;

        let all = self.menus.list(&MenuFilter::default()).await?;
        if is_descendant(&all, id, new_parent) {
            return Err(RbacError::Cycle(
                "a menu cannot be moved under one of its descendants".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> RbacResult<()> {
    let len = name.chars().count();
    if len == 0 || len > MAX_MENU_NAME {
        return Err(RbacError::invalid(format!(
            "menu name must be between 1 and {} characters",
            MAX_MENU_NAME
        )));
    }
    Ok(())
}
