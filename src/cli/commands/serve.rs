use clap::Args;

use crate::cli::OutputFormat;
use crate::config::config;
use crate::server;

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long, help = "Port override (defaults to BACKOFFICE_API_PORT or 3000)")]
    pub port: Option<u16>,
}

pub async fn handle(args: ServeArgs, _output_format: OutputFormat) -> anyhow::Result<()> {
    server::serve(config(), args.port).await
}
