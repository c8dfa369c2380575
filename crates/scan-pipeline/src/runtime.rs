//! Container runtime operations: image pull, container launch, image scan
//!
//! Each operation shells out to the corresponding external tool. The trait
//! seam keeps the per-image driver testable without docker or trivy on the
//! machine.

use async_trait::async_trait;
use dockwatch_common::Result;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

/// Ceiling for the detached container launch. The launch is an independent
/// side effect; the scan that follows targets the image reference, not this
/// container instance.
const LAUNCH_TIMEOUT: Duration = Duration::from_secs(60);

/// External container/scanner operations used by the per-image driver.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Pull the image into the local cache.
    async fn pull_image(&self, image: &str) -> Result<()>;

    /// Launch a detached container from the image. Fire-and-forget: the
    /// container is not awaited further, only the launch outcome is recorded.
    async fn launch_container(&self, image: &str) -> Result<()>;

    /// Run the vulnerability scanner against the image reference, writing
    /// JSON output to `output_path`.
    async fn scan_image(&self, image: &str, output_path: &Path, timeout: Duration) -> Result<()>;
}

/// Production runtime shelling out to `docker` and `trivy`
pub struct DockerRuntime;

impl DockerRuntime {
    fn check_output(tool: &str, image: &str, output: &Output) -> Result<()> {
        if output.status.success() {
            return Ok(());
        }

        let code = output
            .status
            .code()
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(anyhow::anyhow!("{tool} failed for {image} (exit {code}): {}", stderr.trim()).into())
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn pull_image(&self, image: &str) -> Result<()> {
        let output = Command::new("docker")
            .args(["pull", image])
            .output()
            .await
            .map_err(|e| anyhow::anyhow!("failed to run docker pull: {e}"))?;

        Self::check_output("docker pull", image, &output)
    }

    async fn launch_container(&self, image: &str) -> Result<()> {
        let launch = Command::new("docker").args(["run", "-d", image]).output();

        let output = tokio::time::timeout(LAUNCH_TIMEOUT, launch)
            .await
            .map_err(|_| anyhow::anyhow!("container launch for {image} timed out"))?
            .map_err(|e| anyhow::anyhow!("failed to run docker run: {e}"))?;

        Self::check_output("docker run", image, &output)?;

        let container_id = String::from_utf8_lossy(&output.stdout);
        info!("Launched container {} from image {}", container_id.trim(), image);
        Ok(())
    }

    async fn scan_image(&self, image: &str, output_path: &Path, timeout: Duration) -> Result<()> {
        let scan = Command::new("trivy")
            .args(["image", "--format", "json", "--output"])
            .arg(output_path)
            .arg(image)
            .output();

        let output = tokio::time::timeout(timeout, scan)
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "scan of {image} exceeded the {}s ceiling",
                    timeout.as_secs()
                )
            })?
            .map_err(|e| anyhow::anyhow!("failed to run trivy: {e}"))?;

        Self::check_output("trivy", image, &output)
    }
}
