use async_trait::async_trait;
use sqlx::PgPool;

use super::{timed, write_error};
use crate::rbac::error::RbacResult;
use crate::rbac::store::AssignmentIndex;
use crate::rbac::types::{dedup_ids, Grant, GrantType};

/// Both relations live here; whole-set replacement runs in one transaction.
#[derive(Debug, Clone)]
pub struct PgAssignmentIndex {
    pool: PgPool,
}

impl PgAssignmentIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn menu_ids(&self, op: &'static str, sql: &str, key: &str) -> RbacResult<Vec<String>> {
        let ids = timed(
            "role_permissions",
            op,
            sqlx::query_scalar::<_, String>(sql).bind(key).fetch_all(&self.pool),
        )
        .await?;
        Ok(ids)
    }
}

#[async_trait]
impl AssignmentIndex for PgAssignmentIndex {
    async fn assign_roles_to_user(&self, user_id: &str, role_ids: &[String]) -> RbacResult<()> {
        let role_ids = dedup_ids(role_ids);
        timed("user_roles", "replace", async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            if !role_ids.is_empty() {
                sqlx::query(
                    "INSERT INTO user_roles (user_id, role_id)
                     SELECT $1, r.role_id FROM unnest($2::text[]) WITH ORDINALITY AS r(role_id, ord)
                     ORDER BY r.ord",
                )
                .bind(user_id)
                .bind(&role_ids)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await
        })
        .await
        .map_err(write_error)
    }

    async fn remove_roles_from_user(&self, user_id: &str, role_ids: &[String]) -> RbacResult<u64> {
        if role_ids.is_empty() {
            return Ok(0);
        }
        let result = timed(
            "user_roles",
            "remove",
            sqlx::query("DELETE FROM user_roles WHERE user_id = $1 AND role_id = ANY($2)")
                .bind(user_id)
                .bind(role_ids)
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected())
    }

    async fn remove_role_from_all_users(&self, role_id: &str) -> RbacResult<u64> {
        let result = timed(
            "user_roles",
            "remove_role",
            sqlx::query("DELETE FROM user_roles WHERE role_id = $1")
                .bind(role_id)
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected())
    }

    async fn assign_permissions_to_role(&self, role_id: &str, grants: &[Grant]) -> RbacResult<()> {
        let menu_ids: Vec<String> = grants.iter().map(|g| g.menu_id.clone()).collect();
        let types: Vec<String> = grants
            .iter()
            .map(|g| g.permission_type.as_str().to_string())
            .collect();

        timed("role_permissions", "replace", async {
            let mut tx = self.pool.begin().await?;
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
                .bind(role_id)
                .execute(&mut *tx)
                .await?;
            if !menu_ids.is_empty() {
                sqlx::query(
                    "INSERT INTO role_permissions (role_id, menu_id, permission_type)
                     SELECT $1, g.menu_id, g.permission_type
                     FROM unnest($2::text[], $3::text[]) WITH ORDINALITY AS g(menu_id, permission_type, ord)
                     ORDER BY g.ord
                     ON CONFLICT (role_id, menu_id, permission_type) DO NOTHING",
                )
                .bind(role_id)
                .bind(&menu_ids)
                .bind(&types)
                .execute(&mut *tx)
                .await?;
            }
            tx.commit().await
        })
        .await
        .map_err(write_error)
    }

    async fn remove_permissions_from_role(
        &self,
        role_id: &str,
        menu_ids: &[String],
    ) -> RbacResult<u64> {
        if menu_ids.is_empty() {
            return Ok(0);
        }
        let result = timed(
            "role_permissions",
            "remove",
            sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND menu_id = ANY($2)")
                .bind(role_id)
                .bind(menu_ids)
                .execute(&self.pool),
        )
        .await?;
        Ok(result.rows_affected())
    }

    async fn retype_permission(&self, menu_id: &str, permission_type: GrantType) -> RbacResult<u64> {
        let result = timed(
            "role_permissions",
            "retype",
            sqlx::query(
                "UPDATE role_permissions SET permission_type = $2
                 WHERE menu_id = $1 AND permission_type <> $2",
            )
            .bind(menu_id)
            .bind(permission_type.as_str())
            .execute(&self.pool),
        )
        .await
        .map_err(write_error)?;
        Ok(result.rows_affected())
    }

    async fn get_roles_for_user(&self, user_id: &str) -> RbacResult<Vec<String>> {
        let ids = timed(
            "user_roles",
            "roles_for_user",
            sqlx::query_scalar::<_, String>(
                "SELECT role_id FROM user_roles WHERE user_id = $1 ORDER BY seq",
            )
            .bind(user_id)
            .fetch_all(&self.pool),
        )
        .await?;
        Ok(ids)
    }

    async fn get_users_for_role(&self, role_id: &str) -> RbacResult<Vec<String>> {
        let ids = timed(
            "user_roles",
            "users_for_role",
            sqlx::query_scalar::<_, String>(
                "SELECT user_id FROM user_roles WHERE role_id = $1 ORDER BY seq",
            )
            .bind(role_id)
            .fetch_all(&self.pool),
        )
        .await?;
        Ok(ids)
    }

    async fn get_permissions_for_role(&self, role_id: &str) -> RbacResult<Vec<String>> {
        self.menu_ids(
            "permissions_for_role",
            "SELECT menu_id FROM role_permissions WHERE role_id = $1
             GROUP BY menu_id ORDER BY MIN(seq)",
            role_id,
        )
        .await
    }

    async fn get_roles_for_permission(&self, menu_id: &str) -> RbacResult<Vec<String>> {
        let ids = timed(
            "role_permissions",
            "roles_for_permission",
            sqlx::query_scalar::<_, String>(
                "SELECT role_id FROM role_permissions WHERE menu_id = $1
                 GROUP BY role_id ORDER BY MIN(seq)",
            )
            .bind(menu_id)
            .fetch_all(&self.pool),
        )
        .await?;
        Ok(ids)
    }

    async fn get_permissions_for_roles(&self, role_ids: &[String]) -> RbacResult<Vec<String>> {
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = timed(
            "role_permissions",
            "permissions_for_roles",
            sqlx::query_scalar::<_, String>(
                "SELECT rp.menu_id FROM role_permissions rp
                 JOIN roles r ON r.role_id = rp.role_id
                 WHERE rp.role_id = ANY($1) AND r.status = 'enable'
                 GROUP BY rp.menu_id ORDER BY MIN(rp.seq)",
            )
            .bind(role_ids)
            .fetch_all(&self.pool),
        )
        .await?;
        Ok(ids)
    }

    async fn get_effective_permissions_for_user(&self, user_id: &str) -> RbacResult<Vec<String>> {
        self.menu_ids(
            "effective_permissions",
            "SELECT rp.menu_id FROM user_roles ur
             JOIN roles r ON r.role_id = ur.role_id
             JOIN role_permissions rp ON rp.role_id = ur.role_id
             WHERE ur.user_id = $1 AND r.status = 'enable'
             GROUP BY rp.menu_id ORDER BY MIN(rp.seq)",
            user_id,
        )
        .await
    }

    async fn has_permission(&self, user_id: &str, permission_code: &str) -> RbacResult<bool> {
        if permission_code.is_empty() {
            return Ok(false);
        }
        let granted = timed(
            "role_permissions",
            "has_permission",
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS (
                    SELECT 1 FROM user_roles ur
                    JOIN roles r ON r.role_id = ur.role_id
                    JOIN role_permissions rp ON rp.role_id = ur.role_id
                    JOIN menus m ON m.menu_id = rp.menu_id
                    WHERE ur.user_id = $1 AND r.status = 'enable'
                      AND m.status = 'enable' AND m.permission_code = $2
                 )",
            )
            .bind(user_id)
            .bind(permission_code)
            .fetch_one(&self.pool),
        )
        .await?;
        Ok(granted)
    }
}
