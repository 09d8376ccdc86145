//! Idempotent schema bootstrap for the RBAC tables.

use sqlx::PgPool;
use tracing::info;

use crate::database::manager::DatabaseError;

/// Statements run in order; every one is safe to re-run
const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS menus (
        menu_id          TEXT PRIMARY KEY,
        parent_id        TEXT NOT NULL DEFAULT '',
        menu_name        TEXT NOT NULL,
        menu_type        TEXT NOT NULL,
        route_path       TEXT NOT NULL DEFAULT '',
        component        TEXT NOT NULL DEFAULT '',
        icon             TEXT NOT NULL DEFAULT '',
        permission_code  TEXT NOT NULL DEFAULT '',
        sort_order       INTEGER NOT NULL DEFAULT 0,
        visible          BOOLEAN NOT NULL DEFAULT TRUE,
        status           TEXT NOT NULL DEFAULT 'enable',
        seq              BIGSERIAL,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT menus_parent_name_key UNIQUE (parent_id, menu_name)
    )"#,
    r#"CREATE UNIQUE INDEX IF NOT EXISTS menus_permission_code_key
        ON menus (permission_code) WHERE permission_code <> ''"#,
    r#"CREATE INDEX IF NOT EXISTS menus_parent_id_idx ON menus (parent_id)"#,
    r#"CREATE TABLE IF NOT EXISTS roles (
        role_id     TEXT PRIMARY KEY,
        role_name   TEXT NOT NULL,
        role_key    TEXT NOT NULL,
        tenant_id   TEXT NOT NULL DEFAULT '',
        sort_order  INTEGER NOT NULL DEFAULT 0,
        data_scope  TEXT NOT NULL,
        status      TEXT NOT NULL DEFAULT 'enable',
        remark      TEXT NOT NULL DEFAULT '',
        seq         BIGSERIAL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT roles_role_key_key UNIQUE (role_key),
        CONSTRAINT roles_tenant_name_key UNIQUE (tenant_id, role_name)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS roles_tenant_id_idx ON roles (tenant_id)"#,
    r#"CREATE TABLE IF NOT EXISTS user_roles (
        user_id     TEXT NOT NULL,
        role_id     TEXT NOT NULL,
        seq         BIGSERIAL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT user_roles_pair_key UNIQUE (user_id, role_id)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS user_roles_user_id_idx ON user_roles (user_id)"#,
    r#"CREATE INDEX IF NOT EXISTS user_roles_role_id_idx ON user_roles (role_id)"#,
    r#"CREATE TABLE IF NOT EXISTS role_permissions (
        role_id          TEXT NOT NULL,
        menu_id          TEXT NOT NULL,
        permission_type  TEXT NOT NULL,
        seq              BIGSERIAL,
        created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
        CONSTRAINT role_permissions_triple_key UNIQUE (role_id, menu_id, permission_type)
    )"#,
    r#"CREATE INDEX IF NOT EXISTS role_permissions_role_id_idx ON role_permissions (role_id)"#,
    r#"CREATE INDEX IF NOT EXISTS role_permissions_menu_id_idx ON role_permissions (menu_id)"#,
];

/// Creates tables and indexes inside one transaction
pub async fn migrate(pool: &PgPool) -> Result<(), DatabaseError> {
    let mut tx = pool.begin().await?;
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    }
    tx.commit().await?;

    info!(statements = STATEMENTS.len(), "Schema is up to date");
    Ok(())
}

pub fn statement_count() -> usize {
    STATEMENTS.len()
}
