use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::ExtractionError;

/// Temporary WAV location that is removed when dropped, whichever way the
/// audio stage ends (success, error or cancellation by timeout).
pub struct ScopedAudio {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScopedAudio {
    pub fn create() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("podium-audio-").tempdir()?;
        let path = dir.path().join("audio.wav");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScopedAudio {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let location = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!(path = %location.display(), error = %e, "failed to remove temporary audio");
            }
        }
    }
}

/// Decode the audio track of `video` to mono 16-bit PCM WAV at `sample_rate`.
pub async fn extract_audio(
    video: &Path,
    audio_path: &Path,
    sample_rate: u32,
) -> Result<(), ExtractionError> {
    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video)
        .arg("-vn")
        .arg("-ar")
        .arg(sample_rate.to_string())
        .arg("-ac")
        .arg("1")
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg(audio_path)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ExtractionError::ToolMissing { tool: "ffmpeg" },
            _ => ExtractionError::IoError(e),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::ToolFailed {
            tool: "ffmpeg",
            reason: stderr.lines().last().unwrap_or("").trim().to_string(),
        });
    }

    debug!(audio = %audio_path.display(), "audio track extracted");
    Ok(())
}

/// Read a 16-bit WAV file into samples in [-1, 1] plus its sample rate.
pub fn read_samples(path: &Path) -> Result<(Vec<f32>, u32), ExtractionError> {
    let mut reader = hound::WavReader::open(path)?;
    let sample_rate = reader.spec().sample_rate;
    let samples = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
        .collect::<Result<Vec<f32>, _>>()?;
    Ok((samples, sample_rate))
}
