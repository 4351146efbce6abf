pub mod audio;
pub mod cache;
pub mod config;
pub mod content;
pub mod engine;
pub mod error;
pub mod events;
pub mod format;
pub mod lexicon;
pub mod media;
pub mod outcome;
pub mod provider;
pub mod scoring;
pub mod telemetry;
pub mod types;
pub mod vision;

pub use cache::{ensure_model, get_model_path, get_root_cache_dir};
pub use config::Config;
pub use engine::{AnalysisRequest, Engine};
pub use error::{BackendError, ExtractionError, PodiumError, Result, SchemaError};
pub use events::{Stage, StageEvent, StageStatus};
pub use format::{PerformanceSummary, format_report_readable, format_score, format_timestamp};
pub use outcome::Outcome;
pub use provider::{BackendSettings, Provider, ProviderDefaults};
pub use scoring::PerformanceLevel;
pub use telemetry::init_tracing;
pub use types::{
    CompositeResult, ContentSummary, Degradation, HeatmapSegment, Segment, Transcript,
    VisualSummary, VocalSummary,
};
