use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Enable/disable flag shared by menus and roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Status {
    #[default]
    #[serde(rename = "enable", alias = "enabled")]
    Enabled,
    #[serde(rename = "disable", alias = "disabled")]
    Disabled,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Enabled => "enable",
            Status::Disabled => "disable",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "enable" | "enabled" => Some(Status::Enabled),
            "disable" | "disabled" => Some(Status::Disabled),
            _ => None,
        }
    }
}

/// Menu node kind. Buttons are capability markers and never carry children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MenuKind {
    #[serde(rename = "directory")]
    Directory,
    #[serde(rename = "menu", alias = "page")]
    Page,
    #[serde(rename = "button")]
    Button,
}

impl MenuKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MenuKind::Directory => "directory",
            MenuKind::Page => "menu",
            MenuKind::Button => "button",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "directory" => Some(MenuKind::Directory),
            "menu" | "page" => Some(MenuKind::Page),
            "button" => Some(MenuKind::Button),
            _ => None,
        }
    }
}

/// Declared row-visibility breadth for holders of a role. Not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataScope {
    #[serde(rename = "all")]
    All,
    #[serde(rename = "tenant", alias = "company")]
    Tenant,
    #[serde(rename = "self")]
    Own,
}

impl DataScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataScope::All => "all",
            DataScope::Tenant => "tenant",
            DataScope::Own => "self",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(DataScope::All),
            "tenant" | "company" => Some(DataScope::Tenant),
            "self" => Some(DataScope::Own),
            _ => None,
        }
    }
}

/// Distinguishes menu-level from button-level grants in `role_permissions`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantType {
    Menu,
    Button,
}

impl GrantType {
    pub fn for_kind(kind: MenuKind) -> Self {
        match kind {
            MenuKind::Button => GrantType::Button,
            MenuKind::Directory | MenuKind::Page => GrantType::Menu,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::Menu => "menu",
            GrantType::Button => "button",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "menu" => Some(GrantType::Menu),
            "button" => Some(GrantType::Button),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuNode {
    #[serde(rename = "menu_id")]
    pub id: String,
    /// Empty for root nodes
    pub parent_id: String,
    #[serde(rename = "menu_name")]
    pub name: String,
    #[serde(rename = "menu_type")]
    pub kind: MenuKind,
    #[serde(rename = "route_path")]
    pub route: String,
    pub component: String,
    pub icon: String,
    /// Empty when the node carries no capability code
    pub permission_code: String,
    pub sort_order: i32,
    pub visible: bool,
    pub status: Status,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MenuNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.status == Status::Enabled
    }

    /// Whether the node belongs in an end-user navigation tree
    pub fn is_navigable(&self) -> bool {
        self.is_enabled() && self.visible && self.kind != MenuKind::Button
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMenu {
    /// Caller-supplied identity, used by fixtures. Generated when absent.
    #[serde(default, rename = "menu_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub parent_id: String,
    #[serde(rename = "menu_name")]
    pub name: String,
    #[serde(rename = "menu_type")]
    pub kind: MenuKind,
    #[serde(default, rename = "route_path")]
    pub route: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub permission_code: String,
    #[serde(default)]
    pub sort_order: i32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub status: Option<Status>,
}

fn default_visible() -> bool {
    true
}

/// Partial menu update. `parent_id: Some("")` moves the node to the root.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuPatch {
    pub parent_id: Option<String>,
    #[serde(rename = "menu_name")]
    pub name: Option<String>,
    #[serde(rename = "menu_type")]
    pub kind: Option<MenuKind>,
    #[serde(rename = "route_path")]
    pub route: Option<String>,
    pub component: Option<String>,
    pub icon: Option<String>,
    pub permission_code: Option<String>,
    pub sort_order: Option<i32>,
    pub visible: Option<bool>,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuFilter {
    /// Case-insensitive substring
    #[serde(rename = "menu_name")]
    pub name: Option<String>,
    #[serde(rename = "menu_type")]
    pub kind: Option<MenuKind>,
    pub status: Option<Status>,
    pub visible: Option<bool>,
    /// Case-insensitive substring
    pub permission_code: Option<String>,
}

impl MenuFilter {
    pub fn matches(&self, menu: &MenuNode) -> bool {
        if let Some(name) = &self.name {
            if !contains_ignore_case(&menu.name, name) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if menu.kind != kind {
                return false;
            }
        }
        if let Some(status) = self.status {
            if menu.status != status {
                return false;
            }
        }
        if let Some(visible) = self.visible {
            if menu.visible != visible {
                return false;
            }
        }
        if let Some(code) = &self.permission_code {
            if !contains_ignore_case(&menu.permission_code, code) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuStats {
    pub total_menus: i64,
    pub enabled_menus: i64,
    pub disabled_menus: i64,
    pub directory_menus: i64,
    pub page_menus: i64,
    pub button_menus: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "role_id")]
    pub id: String,
    #[serde(rename = "role_name")]
    pub name: String,
    #[serde(rename = "role_key")]
    pub key: String,
    /// Empty for platform-wide roles
    pub tenant_id: String,
    pub sort_order: i32,
    pub data_scope: DataScope,
    pub status: Status,
    pub remark: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn is_platform(&self) -> bool {
        self.tenant_id.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.status == Status::Enabled
    }

    /// Platform roles are visible to every tenant
    pub fn visible_to_tenant(&self, tenant_id: &str) -> bool {
        self.is_platform() || self.tenant_id == tenant_id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRole {
    #[serde(default, rename = "role_id")]
    pub id: Option<String>,
    #[serde(rename = "role_name")]
    pub name: String,
    #[serde(rename = "role_key")]
    pub key: String,
    #[serde(default, alias = "company_id")]
    pub tenant_id: String,
    #[serde(default)]
    pub sort_order: i32,
    pub data_scope: DataScope,
    #[serde(default)]
    pub menu_ids: Vec<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub remark: String,
}

/// Partial role update. `menu_ids` always replaces the whole grant set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RolePatch {
    #[serde(rename = "role_name")]
    pub name: Option<String>,
    #[serde(rename = "role_key")]
    pub key: Option<String>,
    pub sort_order: Option<i32>,
    pub data_scope: Option<DataScope>,
    pub status: Option<Status>,
    pub remark: Option<String>,
    #[serde(default)]
    pub menu_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleFilter {
    #[serde(rename = "role_name")]
    pub name: Option<String>,
    #[serde(rename = "role_key")]
    pub key: Option<String>,
    #[serde(alias = "company_id")]
    pub tenant_id: Option<String>,
    pub data_scope: Option<DataScope>,
    pub status: Option<Status>,
    /// Restricts to roles of this tenant plus platform roles. Set from the
    /// caller identity, never from the query string.
    #[serde(skip)]
    pub visible_to: Option<String>,
}

impl RoleFilter {
    pub fn matches(&self, role: &Role) -> bool {
        if let Some(name) = &self.name {
            if !contains_ignore_case(&role.name, name) {
                return false;
            }
        }
        if let Some(key) = &self.key {
            if !contains_ignore_case(&role.key, key) {
                return false;
            }
        }
        if let Some(tenant_id) = &self.tenant_id {
            if &role.tenant_id != tenant_id {
                return false;
            }
        }
        if let Some(scope) = self.data_scope {
            if role.data_scope != scope {
                return false;
            }
        }
        if let Some(status) = self.status {
            if role.status != status {
                return false;
            }
        }
        if let Some(tenant_id) = &self.visible_to {
            if !role.visible_to_tenant(tenant_id) {
                return false;
            }
        }
        true
    }
}

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub fn new(page: Option<u32>, page_size: Option<u32>, default_size: u32, max_size: u32) -> Self {
        let page = page.filter(|p| *p > 0).unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s > 0)
            .unwrap_or(default_size)
            .clamp(1, max_size.max(1));
        Self { page, page_size }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.page_size as i64
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        let size = self.page_size as i64;
        (total + size - 1) / size
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleStats {
    pub total_roles: i64,
    pub enabled_roles: i64,
    pub disabled_roles: i64,
    /// Only reported to platform-wide callers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_roles: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_roles: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: String,
    pub role_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RolePermission {
    pub role_id: String,
    pub menu_id: String,
    pub permission_type: GrantType,
    pub created_at: DateTime<Utc>,
}

/// A grant to be written by a whole-set replacement
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grant {
    pub menu_id: String,
    pub permission_type: GrantType,
}

/// Opaque identifier: prefix, unix seconds, 8 random hex digits
pub fn generate_id(prefix: &str) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}{}{}",
        prefix,
        Utc::now().timestamp(),
        random[..8].to_uppercase()
    )
}

/// Order-preserving de-duplication, dropping empty ids
pub fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_kind_use_wire_names() {
        assert_eq!(serde_json::to_value(Status::Disabled).unwrap(), "disable");
        assert_eq!(serde_json::to_value(MenuKind::Page).unwrap(), "menu");
        let scope: DataScope = serde_json::from_value(serde_json::json!("company")).unwrap();
        assert_eq!(scope, DataScope::Tenant);
        assert_eq!(DataScope::parse("self"), Some(DataScope::Own));
    }

    #[test]
    fn page_clamps_and_counts() {
        let page = Page::new(Some(0), Some(500), 10, 100);
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 100);

        let page = Page::new(Some(3), None, 10, 100);
        assert_eq!(page.offset(), 20);
        assert_eq!(page.total_pages(21), 3);
        assert_eq!(page.total_pages(0), 0);
    }

    #[test]
    fn zero_default_page_size_still_pages() {
        let page = Page::new(None, None, 0, 100);
        assert_eq!(page.page_size, 1);
        assert_eq!(page.total_pages(3), 3);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let ids = vec!["b".to_string(), "a".to_string(), "b".to_string(), String::new()];
        assert_eq!(dedup_ids(&ids), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn generated_ids_carry_prefix_and_differ() {
        let a = generate_id("MENU");
        let b = generate_id("MENU");
        assert!(a.starts_with("MENU"));
        assert_ne!(a, b);
    }
}
