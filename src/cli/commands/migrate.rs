use clap::Args;
use serde_json::json;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::schema;

#[derive(Args)]
pub struct MigrateArgs {
    #[arg(long, help = "Database URL override")]
    pub database_url: Option<String>,
}

pub async fn handle(args: MigrateArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let manager = super::connect(config(), args.database_url).await?;
    schema::migrate(manager.pool()).await?;
    manager.close().await;

    output_success(
        &output_format,
        "Schema is up to date",
        Some(json!({ "statements": schema::statement_count() })),
    )
}
