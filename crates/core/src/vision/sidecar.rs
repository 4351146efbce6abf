use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use super::{FrameSample, LandmarkDetector};
use crate::error::ExtractionError;

/// Landmark detector running as an external process.
///
/// The command receives `--video <path> --every <n>` and must print one JSON
/// [`FrameSample`] per line on stdout.
pub struct SidecarDetector {
    command: Vec<String>,
}

impl SidecarDetector {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

#[async_trait]
impl LandmarkDetector for SidecarDetector {
    async fn detect(
        &self,
        video: &Path,
        sample_every: u32,
    ) -> Result<Vec<FrameSample>, ExtractionError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(ExtractionError::Unavailable {
                what: "landmark detector command".to_string(),
            });
        };

        let output = Command::new(program)
            .args(args)
            .arg("--video")
            .arg(video)
            .arg("--every")
            .arg(sample_every.to_string())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ExtractionError::Unavailable {
                    what: format!("landmark detector `{}`", program),
                },
                _ => ExtractionError::IoError(e),
            })?;

        if !output.status.success() {
            return Err(ExtractionError::ToolFailed {
                tool: "landmark detector",
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let samples = parse_samples(&String::from_utf8_lossy(&output.stdout));
        debug!(samples = samples.len(), "landmark sidecar finished");
        Ok(samples)
    }
}

/// Parse JSON lines, skipping blank or malformed ones.
fn parse_samples(stdout: &str) -> Vec<FrameSample> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<FrameSample>(line) {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!(error = %e, "skipping malformed landmark sample");
                None
            }
        })
        .collect()
}
