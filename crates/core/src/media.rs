//! Input validation and container probing.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::warn;

use crate::error::{ExtractionError, PodiumError, Result};

pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub duration_secs: f64,
    pub width: u32,
    pub height: u32,
    pub frame_rate: f64,
}

pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Reject anything the pipeline cannot start on.
pub fn validate_video_path(path: &Path) -> Result<()> {
    if !is_supported_video(path) {
        return Err(PodiumError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }

    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PodiumError::VideoNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(PodiumError::UnreadableVideo {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    if !metadata.is_file() {
        return Err(PodiumError::UnreadableVideo {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    if metadata.len() == 0 {
        return Err(PodiumError::UnreadableVideo {
            path: path.to_path_buf(),
            reason: "file is empty".to_string(),
        });
    }

    Ok(())
}

#[async_trait]
pub trait VideoProbe: Send + Sync {
    async fn probe(&self, video: &Path) -> Result<VideoInfo>;
}

/// Probes containers with `ffprobe`.
pub struct FfprobeProbe {
    ffprobe_path: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl FfprobeProbe {
    pub fn new(ffprobe_path: impl Into<String>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }
}

#[async_trait]
impl VideoProbe for FfprobeProbe {
    async fn probe(&self, video: &Path) -> Result<VideoInfo> {
        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(video)
            .kill_on_drop(true)
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("ffprobe not found, video duration reported as 0");
                return Ok(VideoInfo::default());
            }
            Err(e) => return Err(e.into()),
        };

        if !output.status.success() {
            return Err(PodiumError::UnreadableVideo {
                path: video.to_path_buf(),
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let json: serde_json::Value = serde_json::from_slice(&output.stdout)?;
        parse_probe_output(&json).ok_or_else(|| PodiumError::UnreadableVideo {
            path: video.to_path_buf(),
            reason: "no video stream found".to_string(),
        })
    }
}

fn parse_probe_output(json: &serde_json::Value) -> Option<VideoInfo> {
    let stream = json["streams"].as_array().and_then(|s| s.first())?;

    let frame_rate = parse_frame_rate(
        stream["r_frame_rate"]
            .as_str()
            .or_else(|| stream["avg_frame_rate"].as_str())
            .unwrap_or("0"),
    );

    let duration_secs = json["format"]["duration"]
        .as_str()
        .or_else(|| stream["duration"].as_str())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    Some(VideoInfo {
        duration_secs,
        width: stream["width"].as_u64().unwrap_or(0) as u32,
        height: stream["height"].as_u64().unwrap_or(0) as u32,
        frame_rate,
    })
}

/// Parse "30000/1001" or "30"
fn parse_frame_rate(fps: &str) -> f64 {
    if let Some((num, den)) = fps.split_once('/') {
        let num: f64 = num.parse().unwrap_or(0.0);
        let den: f64 = den.parse().unwrap_or(0.0);
        return if den != 0.0 { num / den } else { 0.0 };
    }
    fps.parse().unwrap_or(0.0)
}

/// Fails with `ToolMissing` when `tool` cannot be spawned.
pub async fn require_tool(tool: &'static str) -> std::result::Result<(), ExtractionError> {
    match Command::new(tool)
        .arg("-version")
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ExtractionError::ToolMissing { tool })
        }
        Err(e) => Err(e.into()),
    }
}
