use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::database::manager::DatabaseError;
use crate::rbac::types::{MenuKind, MenuNode, Status};

/// Column list shared by every menu SELECT
pub const MENU_COLUMNS: &str = "menu_id, parent_id, menu_name, menu_type, route_path, component, \
     icon, permission_code, sort_order, visible, status, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct MenuRow {
    pub menu_id: String,
    pub parent_id: String,
    pub menu_name: String,
    pub menu_type: String,
    pub route_path: String,
    pub component: String,
    pub icon: String,
    pub permission_code: String,
    pub sort_order: i32,
    pub visible: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<MenuRow> for MenuNode {
    type Error = DatabaseError;

    fn try_from(row: MenuRow) -> Result<Self, Self::Error> {
        let kind = MenuKind::parse(&row.menu_type).ok_or_else(|| DatabaseError::Decode {
            table: "menus",
            message: format!("unknown menu_type '{}' on {}", row.menu_type, row.menu_id),
        })?;
        let status = Status::parse(&row.status).ok_or_else(|| DatabaseError::Decode {
            table: "menus",
            message: format!("unknown status '{}' on {}", row.status, row.menu_id),
        })?;

        Ok(MenuNode {
            id: row.menu_id,
            parent_id: row.parent_id,
            name: row.menu_name,
            kind,
            route: row.route_path,
            component: row.component,
            icon: row.icon,
            permission_code: row.permission_code,
            sort_order: row.sort_order,
            visible: row.visible,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Converts fetched rows, failing on the first undecodable one
pub fn into_menus(rows: Vec<MenuRow>) -> Result<Vec<MenuNode>, DatabaseError> {
    rows.into_iter().map(MenuNode::try_from).collect()
}

#[derive(Debug, Clone, FromRow)]
pub struct MenuStatsRow {
    pub total_menus: i64,
    pub enabled_menus: i64,
    pub disabled_menus: i64,
    pub directory_menus: i64,
    pub page_menus: i64,
    pub button_menus: i64,
}

impl From<MenuStatsRow> for crate::rbac::types::MenuStats {
    fn from(row: MenuStatsRow) -> Self {
        Self {
            total_menus: row.total_menus,
            enabled_menus: row.enabled_menus,
            disabled_menus: row.disabled_menus,
            directory_menus: row.directory_menus,
            page_menus: row.page_menus,
            button_menus: row.button_menus,
        }
    }
}
