//! Per-image driver: pull, launch, scan, process — one image at a time
//!
//! Images in a batch are independent: any failure, including an unexpected
//! one, is logged and the driver moves to the next image. The batch always
//! runs to the end of the list.

use crate::pipeline::Pipeline;
use crate::runtime::ContainerRuntime;
use dockwatch_common::models::normalize_image_name;
use dockwatch_common::{Result, ScanReport};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Drives the scan-and-process cycle for each image in a batch
pub struct BatchDriver {
    runtime: Box<dyn ContainerRuntime>,
    pipeline: Pipeline,
    report_dir: PathBuf,
    scan_timeout: Duration,
}

impl BatchDriver {
    pub fn new(
        runtime: Box<dyn ContainerRuntime>,
        pipeline: Pipeline,
        report_dir: PathBuf,
        scan_timeout: Duration,
    ) -> Self {
        Self {
            runtime,
            pipeline,
            report_dir,
            scan_timeout,
        }
    }

    /// Attempt every image in the batch. Individual outcomes are visible
    /// only in the logs and in the persisted record counts.
    pub async fn process_images(&mut self, images: &[String]) {
        for image in images {
            if let Err(e) = self.process_image(image).await {
                error!("Unexpected error while processing image {}: {}", image, e);
            }
        }

        info!("Image batch fully attempted.");
    }

    /// Scratch file path for one image's raw scanner output.
    pub fn report_path(&self, image: &str) -> PathBuf {
        self.report_dir
            .join(format!("{}.json", normalize_image_name(image)))
    }

    async fn process_image(&mut self, image: &str) -> Result<()> {
        if let Err(e) = self.runtime.pull_image(image).await {
            error!("Failed to pull image {}: {}", image, e);
            return Ok(());
        }
        info!("Image {} pulled.", image);

        // The launch outcome is recorded but the container is not tracked
        // further; the scan below targets the image reference.
        if let Err(e) = self.runtime.launch_container(image).await {
            error!("Failed to launch container from {}: {}", image, e);
            return Ok(());
        }

        let report_path = self.report_path(image);
        match self
            .runtime
            .scan_image(image, &report_path, self.scan_timeout)
            .await
        {
            Ok(()) => {
                info!(
                    "Scan finished for {}. Report saved at {}",
                    image,
                    report_path.display()
                );

                let outcome = self.consume_report(image, &report_path).await;

                // The scratch file has served its purpose either way.
                if let Err(e) = tokio::fs::remove_file(&report_path).await {
                    warn!(
                        "Could not remove scratch report {}: {}",
                        report_path.display(),
                        e
                    );
                }

                outcome
            }
            Err(e) => {
                error!("Scanner failed for image {}: {}", image, e);

                // A failed scan may still have left a partial output file.
                let _ = tokio::fs::remove_file(&report_path).await;
                Ok(())
            }
        }
    }

    async fn consume_report(&mut self, image: &str, report_path: &Path) -> Result<()> {
        let raw = tokio::fs::read_to_string(report_path).await?;
        let document: Value = serde_json::from_str(&raw)?;
        let report = ScanReport::from_value(document)?;

        if let Err(e) = self.pipeline.process_report(&report, report_path).await {
            error!("Report processing failed for {}: {}", image, e);
        }

        Ok(())
    }
}
