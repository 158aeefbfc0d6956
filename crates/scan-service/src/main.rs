//! MRI Scan Service
//!
//! Upload, classify and list MRI scans over HTTP

use anyhow::{Context, Result};
use scan_service::{create_router, AppState, Config, MemoryStore, RedisStore, StorageBackend, Store};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "scan_service=debug,scan_inference=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting MRI Scan Service");
    info!("Storage backend: {:?}", config.storage);
    info!("Model path: {}", config.model_path.display());
    info!("Media root: {}", config.media_root.display());

    config.ensure_directories()?;

    // Initialize storage
    let store: Arc<dyn Store> = match config.storage {
        StorageBackend::Redis => {
            info!("Redis URL: {}", config.redis_url);
            Arc::new(
                RedisStore::new(&config.redis_url)
                    .await
                    .context("Failed to initialize storage")?,
            )
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };

    // Create application state; the model itself loads on first upload
    let state = AppState::from_config(&config, store);

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("MRI Scan Service running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
