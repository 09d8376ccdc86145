use backoffice_api::{config, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    server::init_tracing();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Backoffice API in {:?} mode", config.environment);

    server::serve(config, None).await
}
