use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Request-level failures. These are the only errors an analysis surfaces to
/// the caller; everything else degrades inside the pipeline.
#[derive(Error, Debug)]
pub enum PodiumError {
    #[error("Unsupported video format for {path}: expected one of mp4, avi, mov, mkv")]
    UnsupportedFormat { path: PathBuf },

    #[error("Video file not found: {path}")]
    VideoNotFound { path: PathBuf },

    #[error("Unreadable video {path}: {reason}")]
    UnreadableVideo { path: PathBuf, reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Invalid analysis result: {0}")]
    InvalidResult(#[from] SchemaError),

    #[error("Model download failed for {url}: {reason}")]
    ModelDownloadFailed { url: String, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Recoverable failure of a single extractor. The engine turns these into a
/// degraded summary instead of failing the request.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("{tool} is not installed or not on PATH")]
    ToolMissing { tool: &'static str },

    #[error("{what} is unavailable")]
    Unavailable { what: String },

    #[error("{tool} failed: {reason}")]
    ToolFailed { tool: &'static str, reason: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Audio decoding failed: {0}")]
    Decode(#[from] hound::Error),

    #[error("Speech-to-text failed: {0}")]
    Transcription(String),

    #[error("Language backend failed: {0}")]
    Backend(#[from] BackendError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Failures talking to the generative-text backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Missing API key for {provider_name}: set {env_var}")]
    MissingApiKey {
        provider_name: String,
        env_var: &'static str,
    },

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),
}

/// Violations found while re-hydrating a result document at the boundary.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{field} has {len} entries, at most {max} allowed")]
    TooMany {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("category scores sum to {sum:.2}, total_score is {total:.2}")]
    InconsistentTotal { sum: f64, total: f64 },
}

pub type Result<T> = std::result::Result<T, PodiumError>;
