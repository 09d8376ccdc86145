//! HTTP server bootstrap shared by the server binary and `backoffice serve`

use anyhow::Context;
use tracing::{info, warn};

use crate::config::{AppConfig, StorageBackend};
use crate::database::schema;
use crate::routes::{app_from_config, AppState};

/// Builds state for the configured backend and serves until the process exits
pub async fn serve(config: &AppConfig, port: Option<u16>) -> anyhow::Result<()> {
    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set before the server can verify tokens");
    }

    let state = AppState::from_config(config)
        .await
        .context("failed to initialise storage")?;

    if let Some(db) = &state.db {
        schema::migrate(db.pool())
            .await
            .context("schema bootstrap failed")?;
    }
    if config.api.storage == StorageBackend::Memory {
        warn!("Using in-memory storage; data is lost on restart");
    }

    let app = app_from_config(state, config);

    let port = port.unwrap_or(config.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!(
        "Backoffice API listening on http://{} ({:?}, {:?} storage)",
        bind_addr, config.environment, config.api.storage
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

/// `tracing_subscriber::fmt` with `RUST_LOG`, defaulting to `info`
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
