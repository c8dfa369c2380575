//! Configuration management for the scan pipeline
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Ingestion API host
    pub host: String,

    /// Ingestion API port
    pub port: u16,

    /// Redis URL for the analysis record store
    pub redis_url: String,

    /// Base URL of the OpenAI-compatible text-generation service
    pub llm_base_url: String,

    /// Credential for the text-generation service
    pub llm_api_key: String,

    /// Model name sent with every generation request
    pub llm_model: String,

    /// Optional NVD API key (unauthenticated lookups are rate-limited harder)
    pub nvd_api_key: Option<String>,

    /// Directory for scratch scanner reports
    pub report_dir: PathBuf,

    /// Ceiling for one scanner invocation; a scan may take minutes
    pub scan_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("PIPELINE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("PIPELINE_PORT")
                .unwrap_or_else(|_| "8081".to_string())
                .parse()
                .context("Invalid PIPELINE_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            llm_base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),

            llm_api_key: env::var("LLM_API_KEY").unwrap_or_default(),

            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),

            nvd_api_key: env::var("NVD_API_KEY").ok(),

            report_dir: env::var("REPORT_DIR")
                .unwrap_or_else(|_| "./reports".to_string())
                .into(),

            scan_timeout: Duration::from_secs(
                env::var("SCAN_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "600".to_string())
                    .parse()
                    .context("Invalid SCAN_TIMEOUT_SECS")?,
            ),
        };

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("PIPELINE_PORT must be greater than 0");
        }

        if self.llm_model.is_empty() {
            anyhow::bail!("LLM_MODEL must not be empty");
        }

        if self.scan_timeout.is_zero() {
            anyhow::bail!("SCAN_TIMEOUT_SECS must be greater than 0");
        }

        Ok(())
    }

    /// Get the ingestion API address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Ensure the scratch report directory exists
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.report_dir).with_context(|| {
            format!(
                "Failed to create report directory: {}",
                self.report_dir.display()
            )
        })?;

        Ok(())
    }
}
