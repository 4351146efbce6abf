//! Orchestration of one analysis request: validate, extract vision and audio,
//! analyze content from the transcript, fuse, recommend.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio::{self, AudioExtractor, SpeechAudioExtractor, Transcriber, WhisperTranscriber};
use crate::cache::{ensure_model, get_root_cache_dir};
use crate::config::{AudioConfig, Config, EngineConfig};
use crate::content::{self, ContentAnalyzer, ContentExtractor};
use crate::error::{ExtractionError, PodiumError, Result};
use crate::events::{Stage, StageEvent, StageReporter, StageStatus};
use crate::media::{FfprobeProbe, VideoInfo, VideoProbe, require_tool, validate_video_path};
use crate::outcome::Outcome;
use crate::scoring;
use crate::types::{CompositeResult, ContentSummary, Degradation, MAX_RECOMMENDATIONS, VocalSummary};
use crate::vision::{self, LandmarkVisionExtractor, VisionExtractor};

/// Backend suggestions are only requested below this completeness.
const SUGGESTION_COMPLETENESS_LIMIT: f64 = 90.0;

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub video: PathBuf,
    /// Free-text subject hint passed to the content backend
    pub topic: Option<String>,
}

impl AnalysisRequest {
    pub fn new(video: impl Into<PathBuf>) -> Self {
        Self {
            video: video.into(),
            topic: None,
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }
}

/// Owns the extractor collaborators. Construct once, analyze many videos.
pub struct Engine {
    config: EngineConfig,
    probe: Arc<dyn VideoProbe>,
    vision: Arc<dyn VisionExtractor>,
    audio: Arc<dyn AudioExtractor>,
    content: Arc<dyn ContentExtractor>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        probe: Arc<dyn VideoProbe>,
        vision: Arc<dyn VisionExtractor>,
        audio: Arc<dyn AudioExtractor>,
        content: Arc<dyn ContentExtractor>,
    ) -> Self {
        Self {
            config,
            probe,
            vision,
            audio,
            content,
        }
    }

    /// Build the production collaborators: ffprobe, the landmark sidecar,
    /// ffmpeg + whisper, and the configured language backend. Missing tools
    /// or models are logged here and degrade their stage at analysis time.
    pub async fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        if let Err(e) = require_tool("ffmpeg").await {
            warn!(error = %e, "audio analysis will use neutral defaults");
        }
        if config.vision.detector_command.is_none() {
            warn!("no landmark detector configured, vision analysis will use neutral defaults");
        }

        let transcriber = load_transcriber(&config.audio).await;
        let invalid = |e: regex::Error| PodiumError::InvalidConfig {
            reason: e.to_string(),
        };

        Ok(Self::new(
            config.engine.clone(),
            Arc::new(FfprobeProbe::default()),
            Arc::new(LandmarkVisionExtractor::from_config(&config.vision)),
            Arc::new(SpeechAudioExtractor::new(config.audio.clone(), transcriber).map_err(invalid)?),
            Arc::new(ContentAnalyzer::from_config(&config.content).map_err(invalid)?),
        ))
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<CompositeResult> {
        self.analyze_with_events(request, None).await
    }

    /// Run one analysis, streaming stage transitions to `events` when given.
    ///
    /// Fails only for invalid input; extractor failures and timeouts degrade
    /// their stage and are listed in [`CompositeResult::degradations`].
    pub async fn analyze_with_events(
        &self,
        request: &AnalysisRequest,
        events: Option<mpsc::UnboundedSender<StageEvent>>,
    ) -> Result<CompositeResult> {
        validate_video_path(&request.video)?;
        let info = self.probe_video(&request.video).await?;

        let analysis_id = Uuid::new_v4();
        let reporter = StageReporter::new(analysis_id, events);
        info!(
            %analysis_id,
            video = %request.video.display(),
            duration_secs = info.duration_secs,
            "analysis started"
        );

        let video = request.video.as_path();
        let vision_stage = self.guarded(
            &reporter,
            Stage::ExtractingVision,
            self.vision.extract(video),
            vision::neutral_summary,
        );
        let audio_stage = self.guarded(
            &reporter,
            Stage::ExtractingAudio,
            self.audio.extract(video),
            audio::neutral_summary,
        );
        let (vision, audio) = if self.config.parallel_extraction {
            tokio::join!(vision_stage, audio_stage)
        } else {
            let vision = vision_stage.await;
            (vision, audio_stage.await)
        };

        let content = self
            .content_stage(&reporter, &audio, request.topic.as_deref())
            .await;

        reporter.publish(Stage::Fusing, StageStatus::Started);
        let (vision, vision_reason) = vision.into_parts();
        let (audio, audio_reason) = audio.into_parts();
        let content_ready = !content.is_degraded();
        let (content, content_reason) = content.into_parts();

        let scores = scoring::fuse(&vision, &audio, &content);
        let rules = scoring::rule_recommendations(&vision, &audio, &content);
        let suggestions = if content_ready {
            self.suggestions(&content, &audio.transcript).await
        } else {
            Vec::new()
        };
        let recommendations = scoring::compose_recommendations(
            rules,
            suggestions,
            self.config.max_ai_recommendations,
            self.config.max_recommendations.min(MAX_RECOMMENDATIONS),
        );
        reporter.publish(Stage::Fusing, StageStatus::Completed);

        let degradations: Vec<Degradation> = [
            (Stage::ExtractingVision, vision_reason),
            (Stage::ExtractingAudio, audio_reason),
            (Stage::ExtractingContent, content_reason),
        ]
        .into_iter()
        .filter_map(|(stage, reason)| reason.map(|reason| Degradation { stage, reason }))
        .collect();

        let result = CompositeResult {
            vision_analysis: vision,
            audio_analysis: audio,
            content_analysis: content,
            body_language_score: scores.body_language,
            voice_score: scores.voice,
            content_flow_score: scores.content_flow,
            interaction_score: scores.interaction,
            total_score: scores.total,
            video_duration: info.duration_secs,
            timestamp: Utc::now(),
            recommendations,
            degradations,
        };

        reporter.publish(Stage::Done, StageStatus::Completed);
        info!(
            %analysis_id,
            total_score = result.total_score,
            degraded_stages = result.degradations.len(),
            "analysis finished"
        );
        Ok(result)
    }

    /// Release the collaborators (detector processes, models, HTTP clients).
    pub fn shutdown(self) {
        let Engine {
            probe,
            vision,
            audio,
            content,
            ..
        } = self;
        drop((probe, vision, audio, content));
        info!("engine shut down");
    }

    /// Probing is fatal on failure, and a probe that outlives the extractor
    /// timeout counts as a failure.
    async fn probe_video(&self, video: &Path) -> Result<VideoInfo> {
        let timeout = self.config.extractor_timeout();
        match tokio::time::timeout(timeout, self.probe.probe(video)).await {
            Ok(info) => info,
            Err(_) => Err(PodiumError::UnreadableVideo {
                path: video.to_path_buf(),
                reason: format!("probe timed out after {timeout:?}"),
            }),
        }
    }

    /// Run one extractor call under the timeout; on failure or timeout fall
    /// back to the stage's neutral summary.
    async fn guarded<T, F>(
        &self,
        reporter: &StageReporter,
        stage: Stage,
        extraction: F,
        neutral: fn() -> T,
    ) -> Outcome<T>
    where
        F: Future<Output = std::result::Result<T, ExtractionError>>,
    {
        reporter.publish(stage, StageStatus::Started);
        let timeout = self.config.extractor_timeout();

        let result = tokio::time::timeout(timeout, extraction)
            .await
            .unwrap_or(Err(ExtractionError::Timeout(timeout)));

        match result {
            Ok(value) => {
                debug!(stage = stage.name(), "stage completed");
                reporter.publish(stage, StageStatus::Completed);
                Outcome::Ready(value)
            }
            Err(e) => self.degrade(reporter, stage, neutral(), e.to_string()),
        }
    }

    fn degrade<T>(&self, reporter: &StageReporter, stage: Stage, value: T, reason: String) -> Outcome<T> {
        warn!(stage = stage.name(), %reason, "stage degraded, using neutral summary");
        reporter.publish(
            stage,
            StageStatus::Degraded {
                reason: reason.clone(),
            },
        );
        Outcome::Degraded { value, reason }
    }

    async fn content_stage(
        &self,
        reporter: &StageReporter,
        audio: &Outcome<VocalSummary>,
        topic: Option<&str>,
    ) -> Outcome<ContentSummary> {
        let transcript = &audio.value().transcript;
        if audio.is_degraded() || audio::is_unavailable_transcript(transcript) {
            reporter.publish(Stage::ExtractingContent, StageStatus::Started);
            return self.degrade(
                reporter,
                Stage::ExtractingContent,
                content::neutral_summary(),
                "no transcript: audio analysis was degraded".to_string(),
            );
        }

        self.guarded(
            reporter,
            Stage::ExtractingContent,
            self.content.analyze(transcript, topic),
            content::neutral_summary,
        )
        .await
    }

    /// Backend suggestions; failures are logged and yield none.
    async fn suggestions(&self, summary: &ContentSummary, transcript: &str) -> Vec<String> {
        if !self.content.has_backend() || summary.completeness_score >= SUGGESTION_COMPLETENESS_LIMIT {
            return Vec::new();
        }

        let timeout = self.config.extractor_timeout();
        match tokio::time::timeout(timeout, self.content.suggest_improvements(summary, transcript))
            .await
        {
            Ok(Ok(suggestions)) => suggestions,
            Ok(Err(e)) => {
                warn!(error = %e, "improvement suggestions unavailable");
                Vec::new()
            }
            Err(_) => {
                warn!(?timeout, "improvement suggestions timed out");
                Vec::new()
            }
        }
    }
}

async fn load_transcriber(config: &AudioConfig) -> Option<Arc<dyn Transcriber>> {
    let model_path = match &config.model_path {
        Some(path) => path.clone(),
        None => match ensure_model(&get_root_cache_dir(), &config.whisper_model).await {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "speech-to-text model unavailable, audio analysis will use neutral defaults");
                return None;
            }
        },
    };

    let loaded = tokio::task::spawn_blocking(move || WhisperTranscriber::load(&model_path))
        .await
        .map_err(ExtractionError::from)
        .and_then(|loaded| loaded);

    match loaded {
        Ok(transcriber) => Some(Arc::new(transcriber) as Arc<dyn Transcriber>),
        Err(e) => {
            warn!(error = %e, "speech-to-text model failed to load, audio analysis will use neutral defaults");
            None
        }
    }
}
