use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use scoreboard::api;
use scoreboard::config::{AppConfig, StoreBackend};
use scoreboard::store::{MemoryStore, RedisStore, UserStore};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .pretty()
        .init();

    let config = AppConfig::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        cors_origin = %config.cors_origin,
        "loaded configuration"
    );

    let store: Arc<dyn UserStore> = match &config.store {
        StoreBackend::Redis { uri } => Arc::new(RedisStore::connect(uri).await?),
        StoreBackend::Memory => {
            warn!("using in-memory store, data is lost on shutdown");
            Arc::new(MemoryStore::new())
        }
    };

    let cors_origin = HeaderValue::from_str(&config.cors_origin)
        .context("SCOREBOARD_CORS_ORIGIN is not a valid header value")?;
    let app = api::router(api::AppState::new(store), cors_origin);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "starting http server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
