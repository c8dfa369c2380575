//! API request handlers for the report views

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::storage::ReportStore;

/// Shared application state
pub struct AppState {
    pub store: Mutex<ReportStore>,
}

/// API Error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn not_found(message: String) -> Self {
        ApiError {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.message
        });

        (self.status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

/// List of analyzed image collections
#[derive(Debug, Serialize)]
pub struct ImagesListResponse {
    pub images: Vec<String>,
    pub total: usize,
}

/// Pagination query for the findings view
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

/// One page of finding records
#[derive(Debug, Serialize)]
pub struct FindingsResponse {
    pub collection: String,
    pub page: usize,
    pub total_pages: usize,
    pub total_findings: usize,
    pub findings: Vec<Value>,
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "report-api"
    }))
}

/// List every analyzed image collection
pub async fn list_images_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ImagesListResponse>, ApiError> {
    info!("Listing analyzed image collections");

    let mut store = state.store.lock().await;
    let images = store.list_collections().await?;
    let total = images.len();

    Ok(Json(ImagesListResponse { images, total }))
}

/// The per-image context record (the model's analysis of the image itself)
pub async fn get_context_handler(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
) -> Result<Json<Value>, ApiError> {
    info!("Reading context record for collection: {}", collection);

    let mut store = state.store.lock().await;
    let record = store.context_record(&collection).await?;

    match record {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::not_found(format!(
            "No context record for collection: {collection}"
        ))),
    }
}

/// Paginated finding records for one image collection
pub async fn get_findings_handler(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<FindingsResponse>, ApiError> {
    let page = query.page.unwrap_or(1);
    info!(
        "Reading findings page {} for collection: {}",
        page, collection
    );

    let mut store = state.store.lock().await;

    if !store.collection_exists(&collection).await? {
        return Err(ApiError::not_found(format!(
            "Unknown collection: {collection}"
        )));
    }

    let findings_page = store.findings_page(&collection, page).await?;

    Ok(Json(FindingsResponse {
        collection,
        page: findings_page.page,
        total_pages: findings_page.total_pages,
        total_findings: findings_page.total_findings,
        findings: findings_page.findings,
    }))
}
