//! Report API
//!
//! Read-only HTTP views over the analysis records the scan pipeline
//! persists: analyzed image collections, the per-image context record, and
//! paginated finding records. This service never writes.

pub mod config;
pub mod handlers;
pub mod storage;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use handlers::AppState;
pub use storage::{FindingsPage, ReportStore};

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/images", get(handlers::list_images_handler))
        .route(
            "/api/images/:collection/context",
            get(handlers::get_context_handler),
        )
        .route(
            "/api/images/:collection/findings",
            get(handlers::get_findings_handler),
        )
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
