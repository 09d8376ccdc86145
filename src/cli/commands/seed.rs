use std::path::PathBuf;

use clap::Args;

use crate::cli::utils::{output_fields, output_success};
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::schema;
use crate::fixtures::SeedDocument;
use crate::routes::AppState;

#[derive(Args)]
pub struct SeedArgs {
    #[arg(help = "Fixture YAML file (defaults to the bundled catalogue)")]
    pub file: Option<PathBuf>,

    #[arg(long, help = "Database URL override")]
    pub database_url: Option<String>,

    #[arg(long, help = "Skip the schema bootstrap before seeding")]
    pub no_migrate: bool,
}

pub async fn handle(args: SeedArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let document = match &args.file {
        Some(path) => SeedDocument::from_path(path)?,
        None => SeedDocument::builtin()?,
    };

    let config = config();
    let manager = super::connect(config, args.database_url).await?;
    if !args.no_migrate {
        schema::migrate(manager.pool()).await?;
    }

    let state = AppState::postgres(manager.clone(), &config.security.jwt_secret);
    let report = document.apply(&state.menus, &state.roles).await?;
    manager.close().await;

    output_fields(
        &output_format,
        &[
            ("menus created", report.menus_created.to_string()),
            ("menus skipped", report.menus_skipped.to_string()),
            ("roles created", report.roles_created.to_string()),
            ("roles skipped", report.roles_skipped.to_string()),
        ],
    );
    output_success(
        &output_format,
        "Fixtures applied",
        Some(serde_json::to_value(&report)?),
    )
}
