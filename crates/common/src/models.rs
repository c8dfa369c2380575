//! Shared data models for scan reports and persisted analysis records

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Report key holding the scanned artifact name.
pub const ARTIFACT_NAME_KEY: &str = "ArtifactName";

/// Report key holding the nested findings substructure.
pub const RESULTS_KEY: &str = "Results";

/// The raw scanner output for one image.
///
/// The report schema is owned by the external scanner and varies across
/// scanner versions, so the document is kept as untyped JSON with accessors
/// for the fields the pipeline depends on.
#[derive(Debug, Clone)]
pub struct ScanReport {
    document: Value,
    artifact_name: String,
}

impl ScanReport {
    /// Wrap a parsed scanner document, verifying it names its artifact.
    pub fn from_value(document: Value) -> Result<Self> {
        let artifact_name = document
            .get(ARTIFACT_NAME_KEY)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                Error::InvalidReport(format!("missing or empty '{ARTIFACT_NAME_KEY}' field"))
            })?;

        Ok(Self {
            document,
            artifact_name,
        })
    }

    /// The artifact name exactly as reported by the scanner.
    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    /// Storage collection key for this image: path and tag separators are
    /// replaced so the name is safe to embed in a key.
    pub fn collection_name(&self) -> String {
        normalize_image_name(&self.artifact_name)
    }

    /// Image metadata: the report without its findings substructure.
    pub fn metadata(&self) -> Value {
        match &self.document {
            Value::Object(map) => {
                let filtered = map
                    .iter()
                    .filter(|(key, _)| key.as_str() != RESULTS_KEY)
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Value::Object(filtered)
            }
            other => other.clone(),
        }
    }

    /// The full report document, findings included.
    pub fn as_value(&self) -> &Value {
        &self.document
    }
}

/// Replace `/` and `:` with `_` so an image reference can serve as a
/// storage key or a scratch file name.
pub fn normalize_image_name(image: &str) -> String {
    image.replace(['/', ':'], "_")
}

/// Key of the index set naming every analyzed collection.
pub const COLLECTIONS_INDEX_KEY: &str = "collections:all";

/// Key of the document list holding one collection's records.
pub fn collection_key(collection: &str) -> String {
    format!("report:{collection}")
}

/// The single per-image context document: the model's summary of the image
/// configuration and environment.
///
/// Field names are the stored wire contract consumed by the report views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRecord {
    #[serde(rename = "analise_do_container")]
    pub container_analysis: Value,
}

impl ContextRecord {
    pub fn new(container_analysis: Value) -> Self {
        Self { container_analysis }
    }
}

/// One enriched finding: the authoritative vulnerability detail plus the
/// model-generated risk narrative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindingRecord {
    pub cve: Value,
    #[serde(rename = "relatorio")]
    pub narrative: Value,
}

impl FindingRecord {
    pub fn new(cve: Value, narrative: Value) -> Self {
        Self { cve, narrative }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scan_report_requires_artifact_name() {
        assert!(ScanReport::from_value(json!({})).is_err());
        assert!(ScanReport::from_value(json!({ "ArtifactName": "" })).is_err());
        assert!(ScanReport::from_value(json!({ "ArtifactName": 42 })).is_err());

        let report = ScanReport::from_value(json!({ "ArtifactName": "app:1.0" })).unwrap();
        assert_eq!(report.artifact_name(), "app:1.0");
    }

    #[test]
    fn test_collection_name_normalization() {
        let report =
            ScanReport::from_value(json!({ "ArtifactName": "registry.io/team/app:2.0" })).unwrap();
        assert_eq!(report.collection_name(), "registry.io_team_app_2.0");

        assert_eq!(normalize_image_name("app:1.0"), "app_1.0");
        assert_eq!(normalize_image_name("plain"), "plain");
    }

    #[test]
    fn test_metadata_excludes_results() {
        let report = ScanReport::from_value(json!({
            "ArtifactName": "app:1.0",
            "Metadata": { "OS": { "Family": "debian" } },
            "Results": [ { "VulnerabilityID": "CVE-2023-0001" } ]
        }))
        .unwrap();

        let metadata = report.metadata();
        assert!(metadata.get("Results").is_none());
        assert_eq!(metadata["ArtifactName"], "app:1.0");
        assert_eq!(metadata["Metadata"]["OS"]["Family"], "debian");

        // The original document is untouched.
        assert!(report.as_value().get("Results").is_some());
    }

    #[test]
    fn test_record_wire_field_names() {
        let context = ContextRecord::new(json!({ "choices": [] }));
        let value = serde_json::to_value(&context).unwrap();
        assert!(value.get("analise_do_container").is_some());

        let finding = FindingRecord::new(json!({ "id": "CVE-2023-0001" }), json!({}));
        let value = serde_json::to_value(&finding).unwrap();
        assert!(value.get("cve").is_some());
        assert!(value.get("relatorio").is_some());
    }
}
