pub mod migrate;
pub mod seed;
pub mod serve;
pub mod token;

use crate::config::AppConfig;
use crate::database::DatabaseManager;

/// Postgres connection for commands that always talk to the database,
/// whatever `STORAGE_BACKEND` says
pub(crate) async fn connect(
    config: &AppConfig,
    database_url: Option<String>,
) -> anyhow::Result<DatabaseManager> {
    let mut database = config.database.clone();
    if database_url.is_some() {
        database.url = database_url;
    }
    Ok(DatabaseManager::connect(&database).await?)
}
