//! MRI Scan Service
//!
//! Lets logged-in users upload MRI scans, classifies each scan with the tumor
//! model from `scan-inference`, and keeps the results for listing.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod media;
pub mod models;
pub mod pages;
pub mod storage;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use config::{Config, StorageBackend};
pub use handlers::AppState;
pub use media::MediaStore;
pub use models::{ScanRecord, User};
pub use storage::{MemoryStore, RedisStore, Store};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let media = ServeDir::new(state.media.root());
    let body_limit = state.max_upload_bytes;
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/", get(handlers::index_handler))
        .route("/upload", post(handlers::upload_handler))
        .route("/records/{id}", get(handlers::record_handler))
        .route(
            "/signup",
            get(handlers::signup_page).post(handlers::signup_handler),
        )
        .route(
            "/login",
            get(handlers::login_page).post(handlers::login_handler),
        )
        .route("/logout", post(handlers::logout_handler))
        .nest_service(media::MEDIA_URL, media)
        .with_state(shared_state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
}
