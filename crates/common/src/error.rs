use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid scan report: {0}")]
    InvalidReport(String),

    #[error("Identifier '{0}' does not match the CVE naming scheme")]
    InvalidIdentifier(String),

    #[error("Enrichment failed for '{id}': {reason}")]
    Enrichment { id: String, reason: String },

    #[error("Narrative generation error: {0}")]
    Narrative(String),

    #[error("Unexpected response shape from {service}: {reason}")]
    ResponseShape { service: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
