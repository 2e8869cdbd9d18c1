mod app;
mod config;
mod db;
mod errors;
mod logging;
mod models;
mod routes;
mod services;
mod state;
mod store;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::logging::LoggingConfig;
use crate::state::AppState;
use crate::store::StorageHandle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    logging::init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env().context("invalid configuration")?;

    let storage = StorageHandle::new();
    // No retry here: a failed start exits non-zero and the supervisor decides.
    storage.initialize(&config.storage).await?;

    let state = AppState {
        storage,
        numeric_policy: config.numeric_policy,
    };
    let app = app::create_app(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!("🚀 Stock analysis API running at http://{}/", config.bind_addr);
    axum::serve(listener, app)
        .await?;

    Ok(())
}
