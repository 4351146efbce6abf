//! Vocal-delivery analysis: transcript, fillers, rate, pauses, pitch and
//! volume, folded into a [`VocalSummary`].

mod extract;
mod features;
mod transcribe;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::AudioConfig;
use crate::error::ExtractionError;
use crate::lexicon::{self, PhraseMatcher};
use crate::types::{Transcript, VocalSummary};

pub use extract::{ScopedAudio, extract_audio, read_samples};
pub use features::AcousticFeatures;
pub use transcribe::{Transcriber, WhisperTranscriber};

/// Transcript carried by the neutral summary. Content analysis is skipped
/// when it sees this.
pub const UNAVAILABLE_TRANSCRIPT: &str =
    "[audio analysis unavailable: ffmpeg or speech-to-text model missing]";

/// Speech rate band that scores full marks (words per minute).
pub const IDEAL_RATE_WPM: (f64, f64) = (120.0, 180.0);

#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, video: &Path) -> Result<VocalSummary, ExtractionError>;
}

/// Percentage of words that are fillers, 0 for an empty transcript.
pub fn filler_word_ratio(filler_count: usize, word_count: usize) -> f64 {
    if word_count == 0 {
        return 0.0;
    }
    (filler_count as f64 / word_count as f64 * 100.0).clamp(0.0, 100.0)
}

/// Words per minute, 0 when the duration is unknown.
pub fn speech_rate(word_count: usize, duration_secs: f64) -> f64 {
    if duration_secs <= 0.0 {
        return 0.0;
    }
    word_count as f64 / (duration_secs / 60.0)
}

/// Full marks inside the ideal band; 2 points per wpm lost below, 1.5 above.
pub fn rate_component(speech_rate: f64) -> f64 {
    let (low, high) = IDEAL_RATE_WPM;
    if speech_rate < low {
        (100.0 - (low - speech_rate) * 2.0).max(0.0)
    } else if speech_rate > high {
        (100.0 - (speech_rate - high) * 1.5).max(0.0)
    } else {
        100.0
    }
}

pub fn overall_voice_score(
    filler_word_ratio: f64,
    speech_rate: f64,
    monotony_score: f64,
    volume_consistency: f64,
) -> f64 {
    let filler = (100.0 - filler_word_ratio * 5.0).max(0.0);
    let rate = rate_component(speech_rate);
    let expressiveness = (1.0 - monotony_score.clamp(0.0, 1.0)) * 100.0;
    let consistency = volume_consistency.clamp(0.0, 1.0) * 100.0;

    (0.30 * filler + 0.30 * rate + 0.25 * expressiveness + 0.15 * consistency).clamp(0.0, 100.0)
}

pub fn build_summary(
    transcript: String,
    fillers: &PhraseMatcher,
    features: &AcousticFeatures,
) -> VocalSummary {
    let word_count = lexicon::count_words(&transcript);
    let filler_count = fillers.count(&transcript);

    let filler_word_ratio = filler_word_ratio(filler_count, word_count);
    let speech_rate = speech_rate(word_count, features.duration_secs);

    VocalSummary {
        filler_word_count: filler_count as u32,
        filler_word_ratio,
        speech_rate,
        pause_count: features.pauses.len() as u32,
        average_pause_duration: features.average_pause(),
        pitch_variation: features.pitch_variation,
        monotony_score: features.monotony_score,
        volume_consistency: features.volume_consistency,
        overall_voice_score: overall_voice_score(
            filler_word_ratio,
            speech_rate,
            features.monotony_score,
            features.volume_consistency,
        ),
        transcript,
    }
}

/// Neutral summary used when audio cannot be analyzed.
pub fn neutral_summary() -> VocalSummary {
    let (filler_word_ratio, speech_rate, monotony, consistency) = (5.0, 120.0, 0.5, 0.75);
    VocalSummary {
        transcript: UNAVAILABLE_TRANSCRIPT.to_string(),
        filler_word_count: 0,
        filler_word_ratio,
        speech_rate,
        pause_count: 3,
        average_pause_duration: 1.5,
        pitch_variation: 0.25,
        monotony_score: monotony,
        volume_consistency: consistency,
        overall_voice_score: overall_voice_score(
            filler_word_ratio,
            speech_rate,
            monotony,
            consistency,
        ),
    }
}

pub fn is_unavailable_transcript(transcript: &str) -> bool {
    transcript == UNAVAILABLE_TRANSCRIPT
}

/// Audio extractor running ffmpeg, the speech-to-text model and the acoustic
/// feature pass.
pub struct SpeechAudioExtractor {
    config: AudioConfig,
    transcriber: Option<Arc<dyn Transcriber>>,
    fillers: PhraseMatcher,
}

impl SpeechAudioExtractor {
    pub fn new(
        config: AudioConfig,
        transcriber: Option<Arc<dyn Transcriber>>,
    ) -> Result<Self, regex::Error> {
        let fillers = PhraseMatcher::fillers(&config.language)?;
        Ok(Self {
            config,
            transcriber,
            fillers,
        })
    }

    async fn transcribe(
        &self,
        transcriber: Arc<dyn Transcriber>,
        samples: Arc<Vec<f32>>,
    ) -> Result<Transcript, ExtractionError> {
        let language = self.config.language.clone();
        tokio::task::spawn_blocking(move || transcriber.transcribe(&samples, &language)).await?
    }
}

#[async_trait]
impl AudioExtractor for SpeechAudioExtractor {
    async fn extract(&self, video: &Path) -> Result<VocalSummary, ExtractionError> {
        let transcriber = self
            .transcriber
            .clone()
            .ok_or_else(|| ExtractionError::Unavailable {
                what: "speech-to-text model".to_string(),
            })?;

        let scoped = ScopedAudio::create()?;
        extract_audio(video, scoped.path(), self.config.sample_rate).await?;

        let wav = scoped.path().to_path_buf();
        let (samples, sample_rate) =
            tokio::task::spawn_blocking(move || read_samples(&wav)).await??;
        let samples = Arc::new(samples);
        debug!(
            samples = samples.len(),
            sample_rate, "audio decoded, transcribing"
        );

        let transcript = self.transcribe(transcriber, Arc::clone(&samples)).await?;

        let config = self.config.clone();
        let features = tokio::task::spawn_blocking(move || {
            AcousticFeatures::compute(&samples, sample_rate, &config)
        })
        .await?;
        drop(scoped);

        let summary = build_summary(transcript.text, &self.fillers, &features);
        info!(
            words_per_minute = summary.speech_rate,
            fillers = summary.filler_word_count,
            pauses = summary.pause_count,
            "audio analyzed"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(duration_secs: f64, pauses: Vec<f64>) -> AcousticFeatures {
        AcousticFeatures {
            duration_secs,
            pauses,
            pitch_variation: 0.2,
            monotony_score: 0.6,
            volume_consistency: 0.8,
        }
    }

    #[test]
    fn rate_penalties_are_asymmetric() {
        assert_eq!(rate_component(150.0), 100.0);
        assert_eq!(rate_component(120.0), 100.0);
        assert_eq!(rate_component(180.0), 100.0);
        assert!((rate_component(119.0) - 98.0).abs() < 1e-9);
        assert!((rate_component(181.0) - 98.5).abs() < 1e-9);
        assert_eq!(rate_component(0.0), 0.0);
        assert_eq!(rate_component(400.0), 0.0);
    }

    #[test]
    fn weighted_voice_score_matches_reference_scenario() {
        let score = overall_voice_score(3.2, 145.0, 0.45, 0.78);
        assert!((score - 80.65).abs() < 1e-9, "{score}");
    }

    #[test]
    fn heavy_filler_use_bottoms_out() {
        let score = overall_voice_score(50.0, 150.0, 0.0, 1.0);
        assert!((score - 70.0).abs() < 1e-9);
    }

    #[test]
    fn empty_transcript_has_zero_ratio_and_rate() {
        assert_eq!(filler_word_ratio(0, 0), 0.0);
        assert_eq!(speech_rate(100, 0.0), 0.0);
        assert!((speech_rate(300, 120.0) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn summary_counts_fillers_and_pauses() {
        let fillers = PhraseMatcher::fillers("en").unwrap();
        // 20 words, 2 fillers, spoken over 10 seconds
        let transcript = "Um today we will look at how queues work and uh why \
                          they matter for systems we build every day"
            .to_string();
        let summary = build_summary(transcript, &fillers, &features(10.0, vec![0.8, 1.2]));

        assert_eq!(summary.filler_word_count, 2);
        assert!((summary.filler_word_ratio - 10.0).abs() < 1e-9);
        assert!((summary.speech_rate - 120.0).abs() < 1e-9);
        assert_eq!(summary.pause_count, 2);
        assert!((summary.average_pause_duration - 1.0).abs() < 1e-9);
        assert!((0.0..=100.0).contains(&summary.overall_voice_score));
    }

    #[test]
    fn no_pauses_average_to_zero() {
        let fillers = PhraseMatcher::fillers("en").unwrap();
        let summary = build_summary(String::new(), &fillers, &features(0.0, vec![]));
        assert_eq!(summary.pause_count, 0);
        assert_eq!(summary.average_pause_duration, 0.0);
        assert_eq!(summary.speech_rate, 0.0);
    }

    #[test]
    fn neutral_summary_is_self_consistent() {
        let summary = neutral_summary();
        assert!(is_unavailable_transcript(&summary.transcript));
        assert_eq!(summary.filler_word_count, 0);
        // 0.30*75 + 0.30*100 + 0.25*50 + 0.15*75
        assert!((summary.overall_voice_score - 76.25).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_model_is_unavailable() {
        let extractor = SpeechAudioExtractor::new(AudioConfig::default(), None).unwrap();
        let err = extractor.extract(Path::new("talk.mp4")).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unavailable { .. }));
    }
}
