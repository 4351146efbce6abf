use std::path::{Path, PathBuf};

use tokio::{fs, io::AsyncWriteExt};
use tracing::info;

use crate::error::{PodiumError, Result};

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("podium")
}

pub fn get_model_dir(cache_dir: &Path) -> PathBuf {
    cache_dir.join("models")
}

/// Get the path of a ggml whisper model inside the cache directory
pub fn get_model_path(cache_dir: &Path, model: &str) -> PathBuf {
    get_model_dir(cache_dir).join(format!("ggml-{}.bin", model))
}

/// Make sure the whisper model is present, downloading it on first use.
pub async fn ensure_model(cache_dir: &Path, model: &str) -> Result<PathBuf> {
    let model_path = get_model_path(cache_dir, model);
    if model_path.exists() {
        return Ok(model_path);
    }

    fs::create_dir_all(get_model_dir(cache_dir)).await?;

    let url = format!("{}/ggml-{}.bin", MODEL_BASE_URL, model);
    info!(%url, "downloading whisper model");

    let mut response = reqwest::get(&url).await?;
    if !response.status().is_success() {
        return Err(PodiumError::ModelDownloadFailed {
            url,
            reason: format!("status {}", response.status()),
        });
    }

    // Download next to the final path so a partial file never looks complete
    let partial = model_path.with_extension("bin.part");
    let mut file = fs::File::create(&partial).await?;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    drop(file);

    fs::rename(&partial, &model_path).await?;
    Ok(model_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_path_lives_under_models_dir() {
        let root = Path::new("/var/cache/podium");
        assert_eq!(
            get_model_path(root, "base"),
            PathBuf::from("/var/cache/podium/models/ggml-base.bin")
        );
    }

    #[tokio::test]
    async fn existing_model_is_not_downloaded_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = get_model_path(dir.path(), "tiny");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"ggml").unwrap();

        let resolved = ensure_model(dir.path(), "tiny").await.unwrap();
        assert_eq!(resolved, path);
    }
}
