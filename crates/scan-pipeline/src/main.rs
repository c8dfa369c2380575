//! Scan Pipeline service
//!
//! Ingestion API + vulnerability report processing pipeline

use anyhow::{Context, Result};
use scan_pipeline::{
    create_router, AppState, BatchDriver, Config, DockerRuntime, LlmClient, NvdClient, Pipeline,
    Storage,
};
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scan_pipeline=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration
    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Scan Pipeline");
    info!("Redis URL: {}", config.redis_url);
    info!("Report directory: {}", config.report_dir.display());
    info!("Scan timeout: {}s", config.scan_timeout.as_secs());

    config
        .ensure_directories()
        .context("Failed to prepare report directory")?;

    // Service handles, opened once at startup and injected into the pipeline
    let storage = Storage::new(&config.redis_url)
        .await
        .context("Failed to initialize storage")?;

    let lookup = NvdClient::new(config.nvd_api_key.clone());

    let narratives = LlmClient::new(
        config.llm_base_url.clone(),
        config.llm_api_key.clone(),
        config.llm_model.clone(),
    );

    let pipeline = Pipeline::new(Box::new(lookup), Box::new(narratives), Box::new(storage));

    let driver = BatchDriver::new(
        Box::new(DockerRuntime),
        pipeline,
        config.report_dir.clone(),
        config.scan_timeout,
    );

    // Create application state
    let state = AppState {
        driver: Mutex::new(driver),
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Scan Pipeline running on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
