//! FishClaim API Server
//!
//! Author: hephaex@gmail.com

use fishclaim_api::{create_router, state::AppState, store::PgStore};
use fishclaim_core::config::{AppConfig, LoggingConfig};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fishclaim_api={},audit=info,tower_http=info",
            logging.level
        ))
    });

    if logging.json_format {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env()?;

    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = match config.database.url.clone() {
        Some(url) => {
            let store = PgStore::connect(&url, &config.database).await?;
            store.ensure_schema().await?;
            tracing::info!("Using PostgreSQL storage");
            AppState::with_store(config, store, "postgres")
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory storage");
            AppState::in_memory(config)
        }
    };

    let app = create_router(Arc::new(state));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("FishClaim API Server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
