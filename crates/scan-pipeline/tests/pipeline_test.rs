//! Integration tests for the report processing pipeline and per-image driver
//!
//! External collaborators (NVD, text generation, Redis, docker/trivy) are
//! replaced with scripted in-memory implementations of the trait seams, so
//! these tests exercise the orchestration and failure-isolation logic only.

use async_trait::async_trait;
use dockwatch_common::{
    extract_vulnerability_ids, ContextRecord, Error, FindingRecord, Result, ScanReport,
};
use scan_pipeline::{
    BatchDriver, ContainerRuntime, NarrativeRole, NarrativeService, Pipeline, RecordSink,
    VulnerabilityLookup,
};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory record sink capturing (collection, document) pairs
#[derive(Clone, Default)]
struct MemorySink {
    records: Arc<Mutex<Vec<(String, Value)>>>,
}

impl MemorySink {
    fn contexts(&self, collection: &str) -> Vec<Value> {
        self.documents_with_key(collection, "analise_do_container")
    }

    fn findings(&self, collection: &str) -> Vec<Value> {
        self.documents_with_key(collection, "cve")
    }

    fn collections(&self) -> HashSet<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|(collection, _)| collection.clone())
            .collect()
    }

    fn documents_with_key(&self, collection: &str, key: &str) -> Vec<Value> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|(c, doc)| c == collection && doc.get(key).is_some())
            .map(|(_, doc)| doc.clone())
            .collect()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn insert_context(&mut self, collection: &str, record: &ContextRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .push((collection.to_string(), serde_json::to_value(record)?));
        Ok(())
    }

    async fn insert_finding(&mut self, collection: &str, record: &FindingRecord) -> Result<()> {
        self.records
            .lock()
            .unwrap()
            .push((collection.to_string(), serde_json::to_value(record)?));
        Ok(())
    }
}

/// Lookup stub returning a synthetic detail record, with scripted failures
#[derive(Clone, Default)]
struct ScriptedLookup {
    failures: HashSet<String>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLookup {
    fn failing_for(ids: &[&str]) -> Self {
        Self {
            failures: ids.iter().map(|id| id.to_string()).collect(),
            calls: Arc::default(),
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VulnerabilityLookup for ScriptedLookup {
    async fn fetch_detail(&self, cve_id: &str) -> Result<Option<Value>> {
        self.calls.lock().unwrap().push(cve_id.to_string());

        if self.failures.contains(cve_id) {
            return Err(Error::Enrichment {
                id: cve_id.to_string(),
                reason: "scripted lookup failure".to_string(),
            });
        }

        Ok(Some(json!({
            "VulnerabilityID": cve_id,
            "cve": { "id": cve_id },
            "references": [ { "url": "https://example.com" } ]
        })))
    }
}

/// Narrative stub; can be scripted to fail the risk-analysis role only
#[derive(Clone, Default)]
struct StubNarratives {
    fail_risk_analysis: bool,
}

#[async_trait]
impl NarrativeService for StubNarratives {
    async fn generate(&self, role: NarrativeRole, _payload: &Value) -> Result<Value> {
        if self.fail_risk_analysis && role == NarrativeRole::RiskAnalysis {
            return Err(Error::Narrative("scripted generation failure".to_string()));
        }

        Ok(json!({
            "choices": [
                { "message": { "role": "assistant", "content": format!("{} narrative", role.label()) } }
            ]
        }))
    }
}

/// Runtime fake writing scripted reports instead of invoking docker/trivy
#[derive(Default)]
struct FakeRuntime {
    fail_pull: HashSet<String>,
    fail_scan: HashSet<String>,
    reports: HashMap<String, Value>,
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn pull_image(&self, image: &str) -> Result<()> {
        if self.fail_pull.contains(image) {
            return Err(anyhow::anyhow!("scripted pull failure for {image}").into());
        }
        Ok(())
    }

    async fn launch_container(&self, _image: &str) -> Result<()> {
        Ok(())
    }

    async fn scan_image(&self, image: &str, output_path: &Path, _timeout: Duration) -> Result<()> {
        if self.fail_scan.contains(image) {
            // A failed scan can still leave a partial output file behind.
            std::fs::write(output_path, "{ \"partial\":")?;
            return Err(anyhow::anyhow!("scripted scan failure for {image}").into());
        }

        let report = self
            .reports
            .get(image)
            .unwrap_or_else(|| panic!("no scripted report for {image}"));
        std::fs::write(output_path, serde_json::to_string(report).unwrap())?;
        Ok(())
    }
}

fn pipeline_with(
    lookup: ScriptedLookup,
    narratives: StubNarratives,
    sink: MemorySink,
) -> Pipeline {
    Pipeline::new(Box::new(lookup), Box::new(narratives), Box::new(sink))
}

fn report_with_ids(artifact: &str, ids: &[&str]) -> Value {
    let vulnerabilities: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "VulnerabilityID": id, "Severity": "HIGH" }))
        .collect();

    json!({
        "ArtifactName": artifact,
        "Metadata": { "OS": { "Family": "debian", "Name": "12" } },
        "Results": [ { "Target": artifact, "Vulnerabilities": vulnerabilities } ]
    })
}

fn scan_report(artifact: &str, ids: &[&str]) -> ScanReport {
    ScanReport::from_value(report_with_ids(artifact, ids)).unwrap()
}

#[tokio::test]
async fn context_record_written_for_report_without_findings() {
    let sink = MemorySink::default();
    let mut pipeline = pipeline_with(
        ScriptedLookup::default(),
        StubNarratives::default(),
        sink.clone(),
    );

    let report = scan_report("app:1.0", &[]);
    pipeline
        .process_report(&report, Path::new("/tmp/app_1.0.json"))
        .await
        .unwrap();

    assert_eq!(sink.contexts("app_1.0").len(), 1);
    assert!(sink.findings("app_1.0").is_empty());
}

#[tokio::test]
async fn fetch_failure_is_isolated_to_one_identifier() {
    let sink = MemorySink::default();
    let lookup = ScriptedLookup::failing_for(&["CVE-2023-0002"]);
    let mut pipeline = pipeline_with(lookup.clone(), StubNarratives::default(), sink.clone());

    let report = scan_report("app:1.0", &["CVE-2023-0001", "CVE-2023-0002", "CVE-2023-0003"]);
    pipeline
        .process_report(&report, Path::new("/tmp/app_1.0.json"))
        .await
        .unwrap();

    // All three were attempted; only the failing one is missing.
    assert_eq!(lookup.calls().len(), 3);
    assert_eq!(sink.contexts("app_1.0").len(), 1);

    let findings = sink.findings("app_1.0");
    assert_eq!(findings.len(), 2);
    for finding in &findings {
        assert_ne!(finding["cve"]["VulnerabilityID"], "CVE-2023-0002");
    }
}

#[tokio::test]
async fn invalid_identifier_never_reaches_the_lookup() {
    let sink = MemorySink::default();
    let lookup = ScriptedLookup::default();
    let mut pipeline = pipeline_with(lookup.clone(), StubNarratives::default(), sink.clone());

    // lowercase prefix and a 1-digit suffix: fails validation
    let report = scan_report("app:1.0", &["cve-2023-1"]);
    pipeline
        .process_report(&report, Path::new("/tmp/app_1.0.json"))
        .await
        .unwrap();

    assert!(lookup.calls().is_empty());
    assert_eq!(sink.contexts("app_1.0").len(), 1);
    assert!(sink.findings("app_1.0").is_empty());
}

#[tokio::test]
async fn narrative_failure_skips_identifier_but_keeps_context() {
    let sink = MemorySink::default();
    let narratives = StubNarratives {
        fail_risk_analysis: true,
    };
    let mut pipeline = pipeline_with(ScriptedLookup::default(), narratives, sink.clone());

    let report = scan_report("app:1.0", &["CVE-2023-0001"]);
    pipeline
        .process_report(&report, Path::new("/tmp/app_1.0.json"))
        .await
        .unwrap();

    assert_eq!(sink.contexts("app_1.0").len(), 1);
    assert!(sink.findings("app_1.0").is_empty());
}

#[tokio::test]
async fn finding_cve_field_round_trips_through_extraction() {
    let sink = MemorySink::default();
    let mut pipeline = pipeline_with(
        ScriptedLookup::default(),
        StubNarratives::default(),
        sink.clone(),
    );

    let report = scan_report("app:1.0", &["CVE-2023-0042"]);
    pipeline
        .process_report(&report, Path::new("/tmp/app_1.0.json"))
        .await
        .unwrap();

    let findings = sink.findings("app_1.0");
    assert_eq!(findings.len(), 1);

    // Re-extracting from the stored detail yields the producing identifier.
    let ids = extract_vulnerability_ids(&findings[0]["cve"]);
    assert_eq!(ids.len(), 1);
    assert!(ids.contains("CVE-2023-0042"));
}

#[tokio::test]
async fn pull_failure_skips_image_without_blocking_the_batch() {
    let scratch = tempfile::tempdir().unwrap();
    let sink = MemorySink::default();

    let runtime = FakeRuntime {
        fail_pull: HashSet::from(["app:1.0".to_string()]),
        fail_scan: HashSet::new(),
        reports: HashMap::from([(
            "app:2.0".to_string(),
            // Two occurrences of the same identifier plus a distinct one
            json!({
                "ArtifactName": "app:2.0",
                "Metadata": { "OS": { "Family": "alpine" } },
                "Results": [
                    { "Vulnerabilities": [ { "VulnerabilityID": "CVE-2023-0001" } ] },
                    { "Vulnerabilities": [
                        { "VulnerabilityID": "CVE-2023-0001" },
                        { "VulnerabilityID": "CVE-2023-0002" }
                    ] }
                ]
            }),
        )]),
    };

    let pipeline = pipeline_with(
        ScriptedLookup::default(),
        StubNarratives::default(),
        sink.clone(),
    );
    let mut driver = BatchDriver::new(
        Box::new(runtime),
        pipeline,
        scratch.path().to_path_buf(),
        Duration::from_secs(600),
    );

    driver
        .process_images(&["app:1.0".to_string(), "app:2.0".to_string()])
        .await;

    // The failed image produced nothing at all.
    assert!(!sink.collections().contains("app_1.0"));
    assert!(!scratch.path().join("app_1.0.json").exists());

    // The duplicate identifier collapsed to one finding.
    assert_eq!(sink.contexts("app_2.0").len(), 1);
    assert_eq!(sink.findings("app_2.0").len(), 2);

    // The scratch file was consumed and deleted.
    assert!(!scratch.path().join("app_2.0.json").exists());
}

#[tokio::test]
async fn scanner_failure_leaves_no_records_and_no_scratch_file() {
    let scratch = tempfile::tempdir().unwrap();
    let sink = MemorySink::default();

    let runtime = FakeRuntime {
        fail_pull: HashSet::new(),
        fail_scan: HashSet::from(["app:1.0".to_string()]),
        reports: HashMap::new(),
    };

    let pipeline = pipeline_with(
        ScriptedLookup::default(),
        StubNarratives::default(),
        sink.clone(),
    );
    let mut driver = BatchDriver::new(
        Box::new(runtime),
        pipeline,
        scratch.path().to_path_buf(),
        Duration::from_secs(600),
    );

    driver.process_images(&["app:1.0".to_string()]).await;

    assert!(sink.collections().is_empty());
    assert!(!scratch.path().join("app_1.0.json").exists());
}

#[tokio::test]
async fn malformed_report_is_contained_to_its_image() {
    let scratch = tempfile::tempdir().unwrap();
    let sink = MemorySink::default();

    let runtime = FakeRuntime {
        fail_pull: HashSet::new(),
        fail_scan: HashSet::new(),
        reports: HashMap::from([
            // Missing ArtifactName: parse succeeds, report validation fails
            ("bad:1.0".to_string(), json!({ "Results": [] })),
            ("good:1.0".to_string(), report_with_ids("good:1.0", &["CVE-2023-0001"])),
        ]),
    };

    let pipeline = pipeline_with(
        ScriptedLookup::default(),
        StubNarratives::default(),
        sink.clone(),
    );
    let mut driver = BatchDriver::new(
        Box::new(runtime),
        pipeline,
        scratch.path().to_path_buf(),
        Duration::from_secs(600),
    );

    driver
        .process_images(&["bad:1.0".to_string(), "good:1.0".to_string()])
        .await;

    assert!(!sink.collections().contains("bad_1.0"));
    assert_eq!(sink.contexts("good_1.0").len(), 1);
    assert_eq!(sink.findings("good_1.0").len(), 1);
}
