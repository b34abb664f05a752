//! Safar API Server
//!
//! Serves transaction reversal over HTTP, backed by PostgreSQL.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use safar_api::{AppState, create_router};
use safar_core::reversal::{ReversalEngine, ReversalOptions};
use safar_db::{SeaOrmReversalStore, connect};
use safar_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "safar=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let options = ReversalOptions::from(&config.reversal);
    info!(family_recompute = ?options.family_recompute, "Reversal engine configured");
    let engine = ReversalEngine::with_options(Arc::new(SeaOrmReversalStore::new(db)), options);

    let app = create_router(AppState {
        engine: Arc::new(engine),
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
