//! sqlx-backed stores. Each one is built with an explicit pool handle.

mod assignments;
mod menus;
mod roles;

pub use assignments::PgAssignmentIndex;
pub use menus::PgMenuStore;
pub use roles::PgRoleStore;

use std::future::Future;
use std::time::Instant;

use tracing::{debug, warn};

use super::error::RbacError;
use crate::config::config;

const UNIQUE_VIOLATION: &str = "23505";

/// Runs a query future, logging its duration and warning when slow
pub(crate) async fn timed<T, F>(table: &'static str, op: &'static str, query: F) -> Result<T, sqlx::Error>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    let started = Instant::now();
    let result = query.await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let settings = &config().database;
    if settings.enable_query_logging {
        debug!(table, op, elapsed_ms, ok = result.is_ok(), "query");
    }
    if settings.enable_slow_query_warning && elapsed_ms > settings.slow_query_threshold_ms {
        warn!(table, op, elapsed_ms, "Slow query");
    }
    result
}

/// Maps a unique-index violation raised by a racing writer onto `Duplicate`
pub(crate) fn write_error(err: sqlx::Error) -> RbacError {
    if let sqlx::Error::Database(db) = &err {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return RbacError::Duplicate(duplicate_message(db.constraint()));
        }
    }
    RbacError::from(err)
}

fn duplicate_message(constraint: Option<&str>) -> String {
    match constraint {
        Some("menus_pkey") => "menu id already exists",
        Some("menus_parent_name_key") => "menu name already exists under the same parent",
        Some("menus_permission_code_key") => "permission code already exists",
        Some("roles_pkey") => "role id already exists",
        Some("roles_role_key_key") => "role key already exists",
        Some("roles_tenant_name_key") => "role name already exists",
        _ => "record already exists",
    }
    .to_string()
}

/// Substring pattern for ILIKE with wildcards in the needle escaped
pub(crate) fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("user"), "%user%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn constraint_names_map_to_messages() {
        assert_eq!(duplicate_message(Some("roles_role_key_key")), "role key already exists");
        assert_eq!(duplicate_message(None), "record already exists");
    }
}
