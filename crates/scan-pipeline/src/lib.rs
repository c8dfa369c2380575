//! Scan Pipeline
//!
//! Ingestion service for container image vulnerability analysis. Receives
//! image lists from the inventory agent, drives pull/launch/scan per image,
//! enriches every referenced CVE from the NVD, generates risk narratives
//! through a text-generation service and persists the results per image.

pub mod config;
pub mod driver;
pub mod handlers;
pub mod llm;
pub mod nvd;
pub mod pipeline;
pub mod runtime;
pub mod storage;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use driver::BatchDriver;
pub use handlers::AppState;
pub use llm::{LlmClient, NarrativeRole, NarrativeService};
pub use nvd::{NvdClient, VulnerabilityLookup};
pub use pipeline::Pipeline;
pub use runtime::{ContainerRuntime, DockerRuntime};
pub use storage::{RecordSink, Storage};

/// Create the ingestion API router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/upload-image", post(handlers::upload_images_handler))
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
