use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{contains_pattern, timed, write_error};
use crate::database::models::{into_roles, RoleRow, RoleStatsRow, ROLE_COLUMNS};
use crate::rbac::error::{RbacError, RbacResult};
use crate::rbac::store::RoleStore;
use crate::rbac::types::{Page, Role, RoleFilter, RoleStats, Status};

const TABLE: &str = "roles";

#[derive(Debug, Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RoleFilter) {
    if let Some(name) = &filter.name {
        builder.push(" AND role_name ILIKE ").push_bind(contains_pattern(name));
    }
    if let Some(key) = &filter.key {
        builder.push(" AND role_key ILIKE ").push_bind(contains_pattern(key));
    }
    if let Some(tenant_id) = &filter.tenant_id {
        builder.push(" AND tenant_id = ").push_bind(tenant_id.clone());
    }
    if let Some(scope) = filter.data_scope {
        builder.push(" AND data_scope = ").push_bind(scope.as_str());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(tenant_id) = &filter.visible_to {
        builder
            .push(" AND (tenant_id = '' OR tenant_id = ")
            .push_bind(tenant_id.clone())
            .push(")");
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    async fn insert(&self, role: Role) -> RbacResult<Role> {
        timed(
            TABLE,
            "insert",
            sqlx::query(
                "INSERT INTO roles (role_id, role_name, role_key, tenant_id, sort_order, data_scope,
                 status, remark, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
            )
            .bind(&role.id)
            .bind(&role.name)
            .bind(&role.key)
            .bind(&role.tenant_id)
            .bind(role.sort_order)
            .bind(role.data_scope.as_str())
            .bind(role.status.as_str())
            .bind(&role.remark)
            .bind(role.created_at)
            .bind(role.updated_at)
            .execute(&self.pool),
        )
        .await
        .map_err(write_error)?;

        Ok(role)
    }

    async fn get(&self, id: &str) -> RbacResult<Option<Role>> {
        let sql = format!("SELECT {} FROM roles WHERE role_id = $1", ROLE_COLUMNS);
        let row = timed(
            TABLE,
            "get",
            sqlx::query_as::<_, RoleRow>(&sql).bind(id).fetch_optional(&self.pool),
        )
        .await?;
        Ok(row.map(Role::try_from).transpose()?)
    }

    async fn get_by_key(&self, key: &str) -> RbacResult<Option<Role>> {
        let sql = format!("SELECT {} FROM roles WHERE role_key = $1", ROLE_COLUMNS);
        let row = timed(
            TABLE,
            "get_by_key",
            sqlx::query_as::<_, RoleRow>(&sql).bind(key).fetch_optional(&self.pool),
        )
        .await?;
        Ok(row.map(Role::try_from).transpose()?)
    }

    async fn get_by_ids(&self, ids: &[String]) -> RbacResult<Vec<Role>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM roles WHERE role_id = ANY($1) ORDER BY sort_order, seq",
            ROLE_COLUMNS
        );
        let rows = timed(
            TABLE,
            "get_by_ids",
            sqlx::query_as::<_, RoleRow>(&sql).bind(ids).fetch_all(&self.pool),
        )
        .await?;
        Ok(into_roles(rows)?)
    }

    async fn update(&self, role: &Role) -> RbacResult<()> {
        let result = timed(
            TABLE,
            "update",
            sqlx::query(
                "UPDATE roles SET role_name = $2, role_key = $3, sort_order = $4, data_scope = $5,
                 status = $6, remark = $7, updated_at = $8
                 WHERE role_id = $1",
            )
            .bind(&role.id)
            .bind(&role.name)
            .bind(&role.key)
            .bind(role.sort_order)
            .bind(role.data_scope.as_str())
            .bind(role.status.as_str())
            .bind(&role.remark)
            .bind(role.updated_at)
            .execute(&self.pool),
        )
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(RbacError::role_not_found(&role.id));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> RbacResult<bool> {
        let result = timed(
            TABLE,
            "delete",
            sqlx::query("DELETE FROM roles WHERE role_id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &RoleFilter, page: Page) -> RbacResult<(Vec<Role>, i64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM roles WHERE TRUE");
        push_filter(&mut count, filter);
        let total = timed(
            TABLE,
            "count",
            count.build_query_scalar::<i64>().fetch_one(&self.pool),
        )
        .await?;

        let mut select = QueryBuilder::new(format!("SELECT {} FROM roles WHERE TRUE", ROLE_COLUMNS));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY sort_order ASC, created_at DESC, seq ASC LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows = timed(
            TABLE,
            "list",
            select.build_query_as::<RoleRow>().fetch_all(&self.pool),
        )
        .await?;
        Ok((into_roles(rows)?, total))
    }

    async fn get_by_tenant(&self, tenant_id: &str) -> RbacResult<Vec<Role>> {
        let sql = format!(
            "SELECT {} FROM roles
             WHERE status = 'enable' AND (tenant_id = $1 OR tenant_id = '')
             ORDER BY sort_order, seq",
            ROLE_COLUMNS
        );
        let rows = timed(
            TABLE,
            "get_by_tenant",
            sqlx::query_as::<_, RoleRow>(&sql).bind(tenant_id).fetch_all(&self.pool),
        )
        .await?;
        Ok(into_roles(rows)?)
    }

    async fn batch_set_status(&self, ids: &[String], status: Status) -> RbacResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = timed(
            TABLE,
            "batch_set_status",
            sqlx::query(
                "UPDATE roles SET status = $1, updated_at = now()
                 WHERE role_id = ANY($2) AND status <> $1",
            )
                .bind(status.as_str())
                .bind(ids)
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self, tenant_id: Option<&str>) -> RbacResult<RoleStats> {
        let row = timed(
            TABLE,
            "stats",
            sqlx::query_as::<_, RoleStatsRow>(
                "SELECT COUNT(*) AS total_roles,
                        COUNT(*) FILTER (WHERE status = 'enable') AS enabled_roles,
                        COUNT(*) FILTER (WHERE status = 'disable') AS disabled_roles,
                        COUNT(*) FILTER (WHERE tenant_id = '') AS platform_roles,
                        COUNT(*) FILTER (WHERE tenant_id <> '') AS tenant_roles
                 FROM roles
                 WHERE ($1::text IS NULL OR tenant_id = $1)",
            )
            .bind(tenant_id)
            .fetch_one(&self.pool),
        )
        .await?;

        let breakdown = tenant_id.is_none();
        Ok(RoleStats {
            total_roles: row.total_roles,
            enabled_roles: row.enabled_roles,
            disabled_roles: row.disabled_roles,
            platform_roles: breakdown.then_some(row.platform_roles),
            tenant_roles: breakdown.then_some(row.tenant_roles),
        })
    }

    async fn key_exists(&self, key: &str, exclude_id: Option<&str>) -> RbacResult<bool> {
        let exists = timed(
            TABLE,
            "key_exists",
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM roles
                 WHERE role_key = $1 AND ($2::text IS NULL OR role_id <> $2))",
            )
            .bind(key)
            .bind(exclude_id)
            .fetch_one(&self.pool),
        )
        .await?;
        Ok(exists)
    }

    async fn name_exists(
        &self,
        name: &str,
        tenant_id: &str,
        exclude_id: Option<&str>,
    ) -> RbacResult<bool> {
        let exists = timed(
            TABLE,
            "name_exists",
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM roles
                 WHERE role_name = $1 AND tenant_id = $2 AND ($3::text IS NULL OR role_id <> $3))",
            )
            .bind(name)
            .bind(tenant_id)
            .bind(exclude_id)
            .fetch_one(&self.pool),
        )
        .await?;
        Ok(exists)
    }
}
