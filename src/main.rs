mod app;
mod auth;
mod config;
mod errors;
mod logging;
mod models;
mod routes;
mod state;
mod storage;

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::auth::TokenVerifier;
use crate::config::{AppConfig, StorageBackend};
use crate::state::AppState;
use crate::storage::{MemoryStore, PostgresStore, Storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    // Initialize logging before anything else can log
    logging::init_logging(&config.logging).map_err(|e| anyhow::anyhow!(e))?;

    let store: Arc<dyn Storage> = match config.storage {
        StorageBackend::Postgres => {
            let store = PostgresStore::connect(&config.database)
                .await
                .context("Failed to connect to Postgres")?;
            store.init().await.context("Failed to create account table")?;
            Arc::new(store)
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage, accounts will not survive a restart");
            Arc::new(MemoryStore::new())
        }
    };

    let verifier = config.jwt_secret.as_deref().map(TokenVerifier::new);
    if verifier.is_some() {
        info!("Bearer token authentication enabled for /account routes");
    }

    let app = app::create_app(AppState::new(store), verifier);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("🚀 Account API running at http://{}/", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
