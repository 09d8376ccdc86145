use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{contains_pattern, timed, write_error};
use crate::database::models::{into_menus, MenuRow, MenuStatsRow, MENU_COLUMNS};
use crate::rbac::error::{RbacError, RbacResult};
use crate::rbac::store::MenuStore;
use crate::rbac::types::{MenuFilter, MenuNode, MenuStats, Status};

const TABLE: &str = "menus";

#[derive(Debug, Clone)]
pub struct PgMenuStore {
    pool: PgPool,
}

impl PgMenuStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &MenuFilter) {
    if let Some(name) = &filter.name {
        builder.push(" AND menu_name ILIKE ").push_bind(contains_pattern(name));
    }
    if let Some(kind) = filter.kind {
        builder.push(" AND menu_type = ").push_bind(kind.as_str());
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(visible) = filter.visible {
        builder.push(" AND visible = ").push_bind(visible);
    }
    if let Some(code) = &filter.permission_code {
        builder
            .push(" AND permission_code ILIKE ")
            .push_bind(contains_pattern(code));
    }
}

#[async_trait]
impl MenuStore for PgMenuStore {
    async fn insert(&self, menu: MenuNode) -> RbacResult<MenuNode> {
        timed(
            TABLE,
            "insert",
            sqlx::query(
                "INSERT INTO menus (menu_id, parent_id, menu_name, menu_type, route_path, component,
                 icon, permission_code, sort_order, visible, status, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
            )
            .bind(&menu.id)
            .bind(&menu.parent_id)
            .bind(&menu.name)
            .bind(menu.kind.as_str())
            .bind(&menu.route)
            .bind(&menu.component)
            .bind(&menu.icon)
            .bind(&menu.permission_code)
            .bind(menu.sort_order)
            .bind(menu.visible)
            .bind(menu.status.as_str())
            .bind(menu.created_at)
            .bind(menu.updated_at)
            .execute(&self.pool),
        )
        .await
        .map_err(write_error)?;

        Ok(menu)
    }

    async fn get(&self, id: &str) -> RbacResult<Option<MenuNode>> {
        let sql = format!("SELECT {} FROM menus WHERE menu_id = $1", MENU_COLUMNS);
        let row = timed(
            TABLE,
            "get",
            sqlx::query_as::<_, MenuRow>(&sql).bind(id).fetch_optional(&self.pool),
        )
        .await?;

        Ok(row.map(MenuNode::try_from).transpose()?)
    }

    async fn update(&self, menu: &MenuNode) -> RbacResult<()> {
        let result = timed(
            TABLE,
            "update",
            sqlx::query(
                "UPDATE menus SET parent_id = $2, menu_name = $3, menu_type = $4, route_path = $5,
                 component = $6, icon = $7, permission_code = $8, sort_order = $9, visible = $10,
                 status = $11, updated_at = $12
                 WHERE menu_id = $1",
            )
            .bind(&menu.id)
            .bind(&menu.parent_id)
            .bind(&menu.name)
            .bind(menu.kind.as_str())
            .bind(&menu.route)
            .bind(&menu.component)
            .bind(&menu.icon)
            .bind(&menu.permission_code)
            .bind(menu.sort_order)
            .bind(menu.visible)
            .bind(menu.status.as_str())
            .bind(menu.updated_at)
            .execute(&self.pool),
        )
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(RbacError::menu_not_found(&menu.id));
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> RbacResult<bool> {
        let result = timed(
            TABLE,
            "delete",
            sqlx::query("DELETE FROM menus WHERE menu_id = $1")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, filter: &MenuFilter) -> RbacResult<Vec<MenuNode>> {
        let mut builder = QueryBuilder::new(format!("SELECT {} FROM menus WHERE TRUE", MENU_COLUMNS));
        push_filter(&mut builder, filter);
        builder.push(" ORDER BY parent_id, sort_order, seq");

        let rows = timed(
            TABLE,
            "list",
            builder.build_query_as::<MenuRow>().fetch_all(&self.pool),
        )
        .await?;
        Ok(into_menus(rows)?)
    }

    async fn get_children(&self, parent_id: &str) -> RbacResult<Vec<MenuNode>> {
        let sql = format!(
            "SELECT {} FROM menus WHERE parent_id = $1 ORDER BY sort_order, seq",
            MENU_COLUMNS
        );
        let rows = timed(
            TABLE,
            "get_children",
            sqlx::query_as::<_, MenuRow>(&sql).bind(parent_id).fetch_all(&self.pool),
        )
        .await?;
        Ok(into_menus(rows)?)
    }

    async fn get_by_ids(&self, ids: &[String]) -> RbacResult<Vec<MenuNode>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {} FROM menus WHERE menu_id = ANY($1) ORDER BY parent_id, sort_order, seq",
            MENU_COLUMNS
        );
        let rows = timed(
            TABLE,
            "get_by_ids",
            sqlx::query_as::<_, MenuRow>(&sql).bind(ids).fetch_all(&self.pool),
        )
        .await?;
        Ok(into_menus(rows)?)
    }

    async fn batch_set_status(&self, ids: &[String], status: Status) -> RbacResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }
        let result = timed(
            TABLE,
            "batch_set_status",
            sqlx::query(
                "UPDATE menus SET status = $1, updated_at = now()
                 WHERE menu_id = ANY($2) AND status <> $1",
            )
                .bind(status.as_str())
                .bind(ids)
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> RbacResult<MenuStats> {
        let row = timed(
            TABLE,
            "stats",
            sqlx::query_as::<_, MenuStatsRow>(
                "SELECT COUNT(*) AS total_menus,
                        COUNT(*) FILTER (WHERE status = 'enable') AS enabled_menus,
                        COUNT(*) FILTER (WHERE status = 'disable') AS disabled_menus,
                        COUNT(*) FILTER (WHERE menu_type = 'directory') AS directory_menus,
                        COUNT(*) FILTER (WHERE menu_type = 'menu') AS page_menus,
                        COUNT(*) FILTER (WHERE menu_type = 'button') AS button_menus
                 FROM menus",
            )
            .fetch_one(&self.pool),
        )
        .await?;
        Ok(row.into())
    }

    async fn name_exists(
        &self,
        name: &str,
        parent_id: &str,
        exclude_id: Option<&str>,
    ) -> RbacResult<bool> {
        let exists = timed(
            TABLE,
            "name_exists",
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM menus
                 WHERE menu_name = $1 AND parent_id = $2 AND ($3::text IS NULL OR menu_id <> $3))",
            )
            .bind(name)
            .bind(parent_id)
            .bind(exclude_id)
            .fetch_one(&self.pool),
        )
        .await?;
        Ok(exists)
    }

    async fn permission_code_exists(
        &self,
        code: &str,
        exclude_id: Option<&str>,
    ) -> RbacResult<bool> {
        if code.is_empty() {
            return Ok(false);
        }
        let exists = timed(
            TABLE,
            "permission_code_exists",
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (SELECT 1 FROM menus
                 WHERE permission_code = $1 AND ($2::text IS NULL OR menu_id <> $2))",
            )
            .bind(code)
            .bind(exclude_id)
            .fetch_one(&self.pool),
        )
        .await?;
        Ok(exists)
    }

    async fn has_children(&self, id: &str) -> RbacResult<bool> {
        let exists = timed(
            TABLE,
            "has_children",
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM menus WHERE parent_id = $1)")
                .bind(id)
                .fetch_one(&self.pool),
        )
        .await?;
        Ok(exists)
    }
}
