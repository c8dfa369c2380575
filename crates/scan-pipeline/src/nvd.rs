//! Client for the NVD vulnerability lookup service

use async_trait::async_trait;
use dockwatch_common::{Error, Result};
use serde_json::Value;
use tracing::debug;

/// NVD REST API 2.0 endpoint
pub const DEFAULT_NVD_BASE_URL: &str = "https://services.nvd.nist.gov/rest/json/cves/2.0";

/// Fields stripped from a detail record before narrative generation.
/// Configuration lists, reference lists and platform enumerations dominate
/// the record size without adding analytical value.
const TRIMMED_FIELDS: [&str; 3] = ["configurations", "references", "cpe"];

/// Resolves a validated CVE identifier to authoritative vulnerability detail.
#[async_trait]
pub trait VulnerabilityLookup: Send + Sync {
    /// Fetch the detail record for one identifier.
    ///
    /// `Ok(None)` means the service answered but knows nothing about the
    /// identifier; errors cover transport failures and unexpected response
    /// shapes. Either way the caller skips the identifier.
    async fn fetch_detail(&self, cve_id: &str) -> Result<Option<Value>>;
}

/// Client for interacting with the NVD
pub struct NvdClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl NvdClient {
    /// Create a client against the public NVD endpoint
    pub fn new(api_key: Option<String>) -> Self {
        Self::with_base_url(DEFAULT_NVD_BASE_URL.to_string(), api_key)
    }

    /// Create a client against a custom endpoint
    pub fn with_base_url(base_url: String, api_key: Option<String>) -> Self {
        Self {
            base_url,
            api_key,
            client: reqwest::Client::new(),
        }
    }

    fn enrichment_error(cve_id: &str, reason: impl ToString) -> Error {
        Error::Enrichment {
            id: cve_id.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl VulnerabilityLookup for NvdClient {
    async fn fetch_detail(&self, cve_id: &str) -> Result<Option<Value>> {
        debug!("Fetching CVE detail from NVD: {}", cve_id);

        let mut request = self.client.get(&self.base_url).query(&[("cveId", cve_id)]);
        if let Some(key) = &self.api_key {
            request = request.header("apiKey", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Self::enrichment_error(cve_id, e))?;

        if !response.status().is_success() {
            return Err(Self::enrichment_error(
                cve_id,
                format!("lookup service returned status {}", response.status()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| Self::enrichment_error(cve_id, format!("invalid response body: {e}")))?;

        // The response is list-like; the first element is the detail record.
        let Some(entries) = body.get("vulnerabilities").and_then(Value::as_array) else {
            return Err(Self::enrichment_error(
                cve_id,
                "response has no 'vulnerabilities' list",
            ));
        };

        Ok(entries.first().cloned())
    }
}

/// Strip oversized sub-fields from a detail record before it is handed to
/// narrative generation, bounding request size.
pub fn trim_for_analysis(detail: &Value) -> Value {
    let mut trimmed = detail.clone();

    if let Some(map) = trimmed.as_object_mut() {
        for field in TRIMMED_FIELDS {
            map.remove(field);
        }

        // NVD 2.0 nests the record under a 'cve' object; trim there as well.
        if let Some(inner) = map.get_mut("cve").and_then(Value::as_object_mut) {
            for field in TRIMMED_FIELDS {
                inner.remove(field);
            }
        }
    }

    trimmed
}
