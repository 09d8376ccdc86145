pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "backoffice")]
#[command(about = "Backoffice CLI - schema, fixtures, tokens and server for the RBAC API")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Create the RBAC tables and indexes (idempotent)")]
    Migrate(commands::migrate::MigrateArgs),

    #[command(about = "Load menus and roles from a YAML fixture (idempotent)")]
    Seed(commands::seed::SeedArgs),

    #[command(about = "Mint a bearer token for local development")]
    Token(commands::token::TokenArgs),

    #[command(about = "Run the HTTP API server")]
    Serve(commands::serve::ServeArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Migrate(args) => commands::migrate::handle(args, output_format).await,
        Commands::Seed(args) => commands::seed::handle(args, output_format).await,
        Commands::Token(args) => commands::token::handle(args, output_format).await,
        Commands::Serve(args) => commands::serve::handle(args, output_format).await,
    }
}
