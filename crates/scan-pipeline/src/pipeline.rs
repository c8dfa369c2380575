//! Batch orchestrator: turns one scan report into persisted analysis records
//!
//! The defining property is per-identifier failure isolation. Every
//! identifier runs through validate, fetch, trim, narrate, persist on its
//! own; a failure at any sub-step logs and moves on to the next identifier.
//! There is no rollback: partial persistence within one image is an accepted
//! outcome of an external-service outage.

use crate::llm::{NarrativeRole, NarrativeService};
use crate::nvd::{trim_for_analysis, VulnerabilityLookup};
use crate::storage::RecordSink;
use dockwatch_common::{
    extract_vulnerability_ids, validate_cve_id, ContextRecord, FindingRecord, Result, ScanReport,
};
use std::path::Path;
use tracing::{error, info, warn};

/// The report processing pipeline with its injected service handles
pub struct Pipeline {
    lookup: Box<dyn VulnerabilityLookup>,
    narratives: Box<dyn NarrativeService>,
    sink: Box<dyn RecordSink>,
}

impl Pipeline {
    pub fn new(
        lookup: Box<dyn VulnerabilityLookup>,
        narratives: Box<dyn NarrativeService>,
        sink: Box<dyn RecordSink>,
    ) -> Self {
        Self {
            lookup,
            narratives,
            sink,
        }
    }

    /// Process one full scan report.
    ///
    /// `report_path` identifies the scratch file the report came from and is
    /// used only for logging. An error here means the image context itself
    /// could not be produced or stored; per-identifier failures never
    /// surface as an error.
    pub async fn process_report(&mut self, report: &ScanReport, report_path: &Path) -> Result<()> {
        let metadata = report.metadata();

        info!(
            "Generating context narrative for image: {}",
            report.artifact_name()
        );
        let context = self
            .narratives
            .generate(NarrativeRole::ContextSummary, &metadata)
            .await?;

        let collection = report.collection_name();

        // The context record is stored before any finding work so it exists
        // even if every identifier afterwards fails.
        self.sink
            .insert_context(&collection, &ContextRecord::new(context))
            .await?;
        info!("Context record stored in collection '{}'", collection);

        let ids = extract_vulnerability_ids(report.as_value());
        info!(
            "Extracted {} unique vulnerability identifier(s) from the report",
            ids.len()
        );

        for cve_id in &ids {
            self.process_identifier(&collection, cve_id).await;
        }

        info!(
            "Finished analysis and storage for report file: {}",
            report_path.display()
        );
        Ok(())
    }

    /// Run one identifier through enrichment and persistence. Logs and
    /// returns on any failure; never aborts the batch.
    async fn process_identifier(&mut self, collection: &str, raw_id: &str) {
        info!("Starting detail lookup and analysis for: {}", raw_id);

        let Some(cve_id) = validate_cve_id(raw_id) else {
            warn!(
                "'{}' does not match the expected CVE format. Skipping analysis.",
                raw_id.trim()
            );
            return;
        };

        let detail = match self.lookup.fetch_detail(cve_id).await {
            Ok(Some(detail)) => detail,
            Ok(None) => {
                warn!("No detail available for '{}'. Skipping.", cve_id);
                return;
            }
            Err(e) => {
                warn!("Detail lookup failed for '{}': {}. Skipping.", cve_id, e);
                return;
            }
        };

        let trimmed = trim_for_analysis(&detail);

        let narrative = match self
            .narratives
            .generate(NarrativeRole::RiskAnalysis, &trimmed)
            .await
        {
            Ok(narrative) => narrative,
            Err(e) => {
                warn!(
                    "Narrative generation failed for '{}': {}. Skipping.",
                    cve_id, e
                );
                return;
            }
        };

        let record = FindingRecord::new(detail, narrative);
        if let Err(e) = self.sink.insert_finding(collection, &record).await {
            error!(
                "Failed to store finding record for '{}' in '{}': {}",
                cve_id, collection, e
            );
            return;
        }

        info!(
            "Finding record for '{}' stored in collection '{}'",
            cve_id, collection
        );
    }
}
