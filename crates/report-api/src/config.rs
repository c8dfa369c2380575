//! Configuration for the report API

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Redis URL for the analysis record store
    pub redis_url: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            host: env::var("REPORT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("REPORT_PORT")
                .unwrap_or_else(|_| "8082".to_string())
                .parse()
                .context("Invalid REPORT_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
        };

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("REPORT_PORT must be greater than 0");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        env::remove_var("REPORT_HOST");
        env::remove_var("REPORT_PORT");
        env::remove_var("REDIS_URL");

        let config = Config::from_env().expect("Failed to load config");

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8082);
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
    }

    #[test]
    fn test_validate_invalid_port() {
        let config = Config {
            host: "0.0.0.0".to_string(),
            port: 0,
            redis_url: "redis://127.0.0.1:6379".to_string(),
        };

        assert!(config.validate().is_err());
    }
}
