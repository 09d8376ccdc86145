use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::database::manager::DatabaseError;
use crate::rbac::types::{DataScope, Role, Status};

pub const ROLE_COLUMNS: &str = "role_id, role_name, role_key, tenant_id, sort_order, data_scope, \
     status, remark, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct RoleRow {
    pub role_id: String,
    pub role_name: String,
    pub role_key: String,
    pub tenant_id: String,
    pub sort_order: i32,
    pub data_scope: String,
    pub status: String,
    pub remark: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for Role {
    type Error = DatabaseError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        let data_scope = DataScope::parse(&row.data_scope).ok_or_else(|| DatabaseError::Decode {
            table: "roles",
            message: format!("unknown data_scope '{}' on {}", row.data_scope, row.role_id),
        })?;
        let status = Status::parse(&row.status).ok_or_else(|| DatabaseError::Decode {
            table: "roles",
            message: format!("unknown status '{}' on {}", row.status, row.role_id),
        })?;

        Ok(Role {
            id: row.role_id,
            name: row.role_name,
            key: row.role_key,
            tenant_id: row.tenant_id,
            sort_order: row.sort_order,
            data_scope,
            status,
            remark: row.remark,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

pub fn into_roles(rows: Vec<RoleRow>) -> Result<Vec<Role>, DatabaseError> {
    rows.into_iter().map(Role::try_from).collect()
}

/// Aggregate row produced by the role statistics query
#[derive(Debug, Clone, FromRow)]
pub struct RoleStatsRow {
    pub total_roles: i64,
    pub enabled_roles: i64,
    pub disabled_roles: i64,
    pub platform_roles: i64,
    pub tenant_roles: i64,
}
