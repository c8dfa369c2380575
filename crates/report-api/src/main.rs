//! Report API service
//!
//! Read-only views over persisted image analysis records

use anyhow::{Context, Result};
use report_api::{create_router, AppState, Config, ReportStore};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "report_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Report API");
    info!("Redis URL: {}", config.redis_url);

    // Initialize the read-only store
    let store = ReportStore::new(&config.redis_url)
        .await
        .context("Failed to initialize store")?;

    // Create application state
    let state = AppState {
        store: Mutex::new(store),
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Report API running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
