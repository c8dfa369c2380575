//! Configuration for the inventory agent

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the scan pipeline ingestion service
    pub pipeline_url: String,

    /// Interval between scheduled collections
    pub collect_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            pipeline_url: env::var("PIPELINE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8081".to_string()),

            collect_interval: Duration::from_secs(
                env::var("COLLECT_INTERVAL_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .context("Invalid COLLECT_INTERVAL_SECS")?,
            ),
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline_url.is_empty() {
            anyhow::bail!("PIPELINE_URL must not be empty");
        }

        if self.collect_interval.is_zero() {
            anyhow::bail!("COLLECT_INTERVAL_SECS must be greater than 0");
        }

        Ok(())
    }

    /// Ingestion endpoint the image list is forwarded to
    pub fn upload_url(&self) -> String {
        format!("{}/upload-image", self.pipeline_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        env::remove_var("PIPELINE_URL");
        env::remove_var("COLLECT_INTERVAL_SECS");

        let config = Config::from_env().expect("Failed to load config");

        assert_eq!(config.pipeline_url, "http://127.0.0.1:8081");
        assert_eq!(config.collect_interval, Duration::from_secs(3600));
    }

    #[test]
    fn test_upload_url_trims_trailing_slash() {
        let config = Config {
            pipeline_url: "http://pipeline:8081/".to_string(),
            collect_interval: Duration::from_secs(60),
        };

        assert_eq!(config.upload_url(), "http://pipeline:8081/upload-image");
    }

    #[test]
    fn test_validate_zero_interval() {
        let config = Config {
            pipeline_url: "http://127.0.0.1:8081".to_string(),
            collect_interval: Duration::from_secs(0),
        };

        assert!(config.validate().is_err());
    }
}
