//! API request handlers for the ingestion endpoint

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::driver::BatchDriver;

/// Fixed acknowledgment returned once a batch has been fully attempted.
/// It carries no per-image outcome; callers consult logs or record counts.
pub const BATCH_ACK_MESSAGE: &str = "Analysis completed successfully!";

/// Shared application state.
///
/// The mutex serializes concurrent ingestion events: the endpoint is meant
/// to be invoked by one inventory-collection event at a time, and a second
/// request waits rather than interleaving batches.
pub struct AppState {
    pub driver: Mutex<BatchDriver>,
}

/// Inbound ingestion contract: a list of image names
#[derive(Debug, Deserialize)]
pub struct UploadImagesRequest {
    pub images: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadImagesResponse {
    pub message: String,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "scan-pipeline"
    }))
}

/// Receive an image list and run the full batch before acknowledging
pub async fn upload_images_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UploadImagesRequest>,
) -> Json<UploadImagesResponse> {
    info!("Received {} image(s): {:?}", payload.images.len(), payload.images);

    let mut driver = state.driver.lock().await;
    driver.process_images(&payload.images).await;

    Json(UploadImagesResponse {
        message: BATCH_ACK_MESSAGE.to_string(),
    })
}
